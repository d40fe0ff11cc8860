//! Byte-addressable frame memory with per-byte taint tags.
//!
//! [`TaintedMemory`] stores one [`Cell`] per byte, pairing the byte with its tag. Growth always
//! happens in 32-byte words and always extends both halves together, so the memory and its
//! taint side-table have the same length at every point of execution.
//!
//! Callers are expected to grow memory through [`TaintedMemory::resize`] (after charging gas)
//! before reading or writing a range; accessors assume the range is in bounds and ignore the
//! part that is not.

use crate::emulation::{TaintFlags, Word};

/// One memory byte and its tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    /// The stored byte.
    pub byte: u8,
    /// Tag attached to the byte.
    pub taint: TaintFlags,
}

impl Cell {
    /// Creates a cell.
    #[must_use]
    pub const fn new(byte: u8, taint: TaintFlags) -> Self {
        Cell { byte, taint }
    }
}

/// Collects the bytes of a cell slice.
#[must_use]
pub fn cell_bytes(cells: &[Cell]) -> Vec<u8> {
    cells.iter().map(|cell| cell.byte).collect()
}

/// OR of the tags of a cell slice.
#[must_use]
pub fn cell_taint(cells: &[Cell]) -> TaintFlags {
    TaintFlags::merge_all(cells.iter().map(|cell| cell.taint))
}

/// Linear frame memory.
///
/// # Examples
///
/// ```rust
/// use taintscope::emulation::{TaintFlags, TaintedMemory, Word};
///
/// let mut memory = TaintedMemory::new();
/// memory.resize(0, 32);
/// memory.store_word(0, Word::from(0xFFu64), TaintFlags::EXTERNAL);
///
/// let (value, taint) = memory.load_word(0);
/// assert_eq!(value, Word::from(0xFFu64));
/// assert!(taint.is_external());
/// assert_eq!(memory.len(), 32);
/// ```
#[derive(Clone, Debug, Default)]
pub struct TaintedMemory {
    cells: Vec<Cell>,
}

impl TaintedMemory {
    /// Creates empty memory.
    #[must_use]
    pub fn new() -> Self {
        TaintedMemory { cells: Vec::new() }
    }

    /// Current size in bytes, always a multiple of 32.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if memory has never been touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Current size in 32-byte words.
    #[must_use]
    pub fn words(&self) -> usize {
        self.cells.len() / 32
    }

    /// Grows memory so that `[offset, offset + len)` is addressable.
    ///
    /// Zero-length ranges never grow memory. New bytes are zero and untainted. A range whose
    /// word-aligned end does not fit `usize` is ignored; the caller rejects it against the
    /// memory limit first.
    pub fn resize(&mut self, offset: usize, len: usize) {
        if len == 0 {
            return;
        }
        let Some(new_len) = offset
            .checked_add(len)
            .and_then(|end| end.checked_next_multiple_of(32))
        else {
            return;
        };
        if new_len > self.cells.len() {
            self.cells.resize(new_len, Cell::default());
        }
    }

    /// Reads 32 bytes at `offset` as a word; the tag is the OR of the 32 byte tags.
    #[must_use]
    pub fn load_word(&self, offset: usize) -> (Word, TaintFlags) {
        let cells = self.range(offset, 32);
        let mut bytes = [0u8; 32];
        for (byte, cell) in bytes.iter_mut().zip(cells) {
            *byte = cell.byte;
        }
        (Word::from_be_bytes(bytes), cell_taint(cells))
    }

    /// Writes a word big-endian at `offset`; all 32 bytes receive `taint`.
    pub fn store_word(&mut self, offset: usize, value: Word, taint: TaintFlags) {
        let bytes = value.to_be_bytes::<32>();
        for (cell, byte) in self.range_mut(offset, 32).iter_mut().zip(bytes) {
            *cell = Cell::new(byte, taint);
        }
    }

    /// Writes a single byte at `offset`.
    pub fn store_byte(&mut self, offset: usize, byte: u8, taint: TaintFlags) {
        if let Some(cell) = self.cells.get_mut(offset) {
            *cell = Cell::new(byte, taint);
        }
    }

    /// Copies `len` bytes of `source` starting at `source_offset` to `offset`.
    ///
    /// Source bytes past the end read as zero. Every written byte receives `taint`, which is how
    /// `CALLDATACOPY`, `CODECOPY` and `EXTCODECOPY` tag their output.
    pub fn copy_padded(
        &mut self,
        offset: usize,
        source: &[u8],
        source_offset: usize,
        len: usize,
        taint: TaintFlags,
    ) {
        for (index, cell) in self.range_mut(offset, len).iter_mut().enumerate() {
            let byte = source_offset
                .checked_add(index)
                .and_then(|position| source.get(position))
                .copied()
                .unwrap_or(0);
            *cell = Cell::new(byte, taint);
        }
    }

    /// Writes tagged cells at `offset`, keeping each byte's own tag.
    pub fn write_cells(&mut self, offset: usize, cells: &[Cell]) {
        let target = self.range_mut(offset, cells.len());
        let count = target.len();
        target.copy_from_slice(&cells[..count]);
    }

    /// Returns the cells of `[offset, offset + len)`.
    #[must_use]
    pub fn read_cells(&self, offset: usize, len: usize) -> Vec<Cell> {
        self.range(offset, len).to_vec()
    }

    /// Returns the bytes of `[offset, offset + len)`.
    #[must_use]
    pub fn read_bytes(&self, offset: usize, len: usize) -> Vec<u8> {
        cell_bytes(self.range(offset, len))
    }

    /// OR of the tags in `[offset, offset + len)`.
    #[must_use]
    pub fn taint_of(&self, offset: usize, len: usize) -> TaintFlags {
        cell_taint(self.range(offset, len))
    }

    fn bounds(&self, offset: usize, len: usize) -> (usize, usize) {
        let start = offset.min(self.cells.len());
        let end = offset.saturating_add(len).min(self.cells.len());
        (start, end)
    }

    fn range(&self, offset: usize, len: usize) -> &[Cell] {
        let (start, end) = self.bounds(offset, len);
        &self.cells[start..end]
    }

    fn range_mut(&mut self, offset: usize, len: usize) -> &mut [Cell] {
        let (start, end) = self.bounds(offset, len);
        &mut self.cells[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_is_word_aligned() {
        let mut memory = TaintedMemory::new();
        memory.resize(0, 0);
        assert!(memory.is_empty());

        memory.resize(31, 2);
        assert_eq!(memory.len(), 64);
        assert_eq!(memory.words(), 2);

        memory.resize(0, 1);
        assert_eq!(memory.len(), 64);
    }

    #[test]
    fn resize_past_address_space_is_ignored() {
        let mut memory = TaintedMemory::new();
        memory.resize(usize::MAX - 3, 2);
        memory.resize(usize::MAX, 1);
        assert!(memory.is_empty());
    }

    #[test]
    fn word_round_trip_keeps_tag() {
        let mut memory = TaintedMemory::new();
        memory.resize(0, 64);
        memory.store_word(16, Word::MAX, TaintFlags::EXTERNAL);

        let (value, taint) = memory.load_word(16);
        assert_eq!(value, Word::MAX);
        assert_eq!(taint, TaintFlags::EXTERNAL);

        let (_, untouched) = memory.load_word(48);
        assert!(untouched.is_safe());
    }

    #[test]
    fn load_ors_byte_tags() {
        let mut memory = TaintedMemory::new();
        memory.resize(0, 32);
        memory.store_byte(3, 0xAA, TaintFlags::EXTERNAL);
        memory.store_byte(30, 0xBB, TaintFlags::BRANCH);

        let (value, taint) = memory.load_word(0);
        assert_eq!(taint, TaintFlags::EXTERNAL | TaintFlags::BRANCH);
        assert_eq!(value.to_be_bytes::<32>()[3], 0xAA);
        assert_eq!(memory.taint_of(4, 26), TaintFlags::SAFE);
    }

    #[test]
    fn copy_padded_zero_fills() {
        let mut memory = TaintedMemory::new();
        memory.resize(0, 8);
        memory.copy_padded(0, &[1, 2, 3], 1, 4, TaintFlags::EXTERNAL);

        assert_eq!(memory.read_bytes(0, 4), vec![2, 3, 0, 0]);
        assert_eq!(memory.taint_of(0, 4), TaintFlags::EXTERNAL);
        assert_eq!(memory.taint_of(4, 4), TaintFlags::SAFE);
    }

    #[test]
    fn write_cells_keeps_per_byte_tags() {
        let mut memory = TaintedMemory::new();
        memory.resize(0, 32);
        let cells = [
            Cell::new(1, TaintFlags::EXTERNAL),
            Cell::new(2, TaintFlags::SAFE),
        ];
        memory.write_cells(10, &cells);

        assert_eq!(memory.read_cells(10, 2), cells.to_vec());
        assert_eq!(cell_taint(&memory.read_cells(11, 1)), TaintFlags::SAFE);
    }
}
