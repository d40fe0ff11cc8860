//! Bitfield map of valid jump destinations.
//!
//! The [`JumpDestMap`] records which byte offsets of a contract hold a `JUMPDEST` opcode that is
//! not part of push data. It is computed once per [`Bytecode`](crate::assembly::Bytecode) and
//! consulted by every `JUMP`/`JUMPI`.

use crate::assembly::{decoder::decode_stream, opcodes};

/// Tracks the offsets of a code buffer that are valid jump targets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JumpDestMap {
    data: Vec<usize>,
    elements: usize,
}

const BITFIELD_SIZE: usize = usize::BITS as usize;

impl JumpDestMap {
    /// Create an empty map able to track `elements` offsets.
    ///
    /// ## Arguments
    /// * 'elements' - The amount of bytes to track
    #[must_use]
    pub fn new(elements: usize) -> JumpDestMap {
        JumpDestMap {
            data: vec![0_usize; elements.div_ceil(BITFIELD_SIZE)],
            elements,
        }
    }

    /// Performs jump destination analysis over `code`.
    ///
    /// Only `JUMPDEST` bytes reached by a linear decode are marked, so `0x5B` values embedded in
    /// `PUSHn` immediates are excluded.
    #[must_use]
    pub fn analyze(code: &[u8]) -> JumpDestMap {
        let mut map = JumpDestMap::new(code.len());

        for instruction in decode_stream(code) {
            if instruction.opcode == opcodes::JUMPDEST {
                map.set(instruction.offset);
            }
        }

        map
    }

    /// Returns the amount of offsets this instance can track
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements
    }

    /// Check if the map tracks no offsets at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements == 0
    }

    /// Check if `offset` is a valid jump destination.
    ///
    /// Offsets outside the tracked range are never valid.
    #[must_use]
    pub fn get(&self, offset: usize) -> bool {
        if offset >= self.elements {
            return false;
        }

        if let Some(bitfield) = self.data.get(offset / BITFIELD_SIZE) {
            let shift_amount = u32::try_from(offset % BITFIELD_SIZE).unwrap_or(0);
            return (bitfield.wrapping_shr(shift_amount) & 1_usize) != 0;
        }

        false
    }

    /// Number of valid jump destinations.
    #[must_use]
    pub fn count(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Iterates the valid jump destinations in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.elements).filter(|offset| self.get(*offset))
    }

    fn set(&mut self, offset: usize) {
        if offset >= self.elements {
            debug_assert!(false, "Invalid element!");
            return;
        }

        if let Some(bitfield) = self.data.get_mut(offset / BITFIELD_SIZE) {
            *bitfield |=
                1_usize.wrapping_shl(u32::try_from(offset % BITFIELD_SIZE).unwrap_or(0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::opcodes::*;

    #[test]
    fn create_empty() {
        let map = JumpDestMap::new(0);

        assert!(map.is_empty());
        assert!(!map.get(0));
    }

    #[test]
    fn marks_real_jumpdests() {
        let code = [JUMPDEST, PUSH1, 0x00, JUMPDEST, STOP];
        let map = JumpDestMap::analyze(&code);

        assert_eq!(map.len(), 5);
        assert!(map.get(0));
        assert!(!map.get(1));
        assert!(map.get(3));
        assert!(!map.get(4));
        assert!(!map.get(400));
        assert_eq!(map.count(), 2);
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn skips_push_data() {
        // PUSH2 0x5b5b: both 0x5b bytes are immediates
        let code = [PUSH2, JUMPDEST, JUMPDEST, JUMPDEST];
        let map = JumpDestMap::analyze(&code);

        assert!(!map.get(1));
        assert!(!map.get(2));
        assert!(map.get(3));
    }

    #[test]
    fn spans_multiple_bitfields() {
        let mut code = vec![STOP; 200];
        code[64] = JUMPDEST;
        code[199] = JUMPDEST;
        let map = JumpDestMap::analyze(&code);

        assert!(map.get(64));
        assert!(map.get(199));
        assert_eq!(map.count(), 2);
    }
}
