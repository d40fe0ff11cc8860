//! Horizon-bounded scans over raw bytecode.

use tracing::debug;

use crate::{
    assembly::opcodes::{is_block_boundary, push_width, ISZERO, JUMPI},
    emulation::guard::template::{templates, ArithmeticFamily, GuardTemplate, ScanDirection},
};

/// Returns `true` if the arithmetic instruction `opcode` at `pc` is guarded by a known idiom.
///
/// Opcodes without a template family are never protected.
///
/// # Examples
///
/// ```rust
/// use taintscope::assembly::opcodes::{ADD, ISZERO, LT, POP};
/// use taintscope::emulation::guard::is_protected;
///
/// // if (a + b >= a)
/// assert!(is_protected(ADD, 0, &[ADD, LT, ISZERO]));
/// assert!(!is_protected(ADD, 0, &[ADD, POP]));
/// ```
#[must_use]
pub fn is_protected(opcode: u8, pc: usize, code: &[u8]) -> bool {
    matching_template(opcode, pc, code).is_some()
}

/// Returns the first template that classifies the instruction at `pc` as guarded.
///
/// The forward scan runs first. Each scan starts at `pc` and stops at the first block
/// boundary or at either end of `code`; every position before the stop is tried against the
/// templates of the matching direction.
#[must_use]
pub fn matching_template(opcode: u8, pc: usize, code: &[u8]) -> Option<&'static GuardTemplate> {
    let family = ArithmeticFamily::of(opcode)?;

    let found = scan(family, ScanDirection::Forward, pc, code)
        .or_else(|| scan(family, ScanDirection::Backward, pc, code));

    if let Some(template) = found {
        debug!(pc, guard = template.name, "arithmetic guard recognized");
    }
    found
}

fn scan(
    family: ArithmeticFamily,
    direction: ScanDirection,
    pc: usize,
    code: &[u8],
) -> Option<&'static GuardTemplate> {
    let mut position = pc;
    loop {
        let opcode = *code.get(position)?;
        if is_block_boundary(opcode) {
            return None;
        }

        if let Some(template) =
            templates(family, direction).find(|template| template.matches_at(code, position))
        {
            return Some(template);
        }

        position = match direction {
            ScanDirection::Forward => position.checked_add(1)?,
            ScanDirection::Backward => position.checked_sub(1)?,
        };
    }
}

/// Returns `true` if the comparison at `pc` directly feeds a `JUMPI`.
///
/// Accepted shapes are `cmp PUSHn <dest> JUMPI` and `cmp ISZERO PUSHn <dest> JUMPI`, with
/// `n >= 1`.
#[must_use]
pub fn feeds_conditional_jump(pc: usize, code: &[u8]) -> bool {
    let mut next = pc + 1;
    if code.get(next) == Some(&ISZERO) {
        next += 1;
    }

    let Some(&push) = code.get(next) else {
        return false;
    };
    let width = push_width(push);
    if width == 0 {
        return false;
    }

    code.get(next + 1 + width) == Some(&JUMPI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::opcodes::*;

    /// Pads `code` with `POP` up to `len` bytes.
    fn padded(mut code: Vec<u8>, len: usize) -> Vec<u8> {
        code.resize(len, POP);
        code
    }

    /// Places `bytes` at `offset`, padding the gap with `POP`.
    fn place(code: &mut Vec<u8>, offset: usize, bytes: &[u8]) {
        if code.len() < offset {
            code.resize(offset, POP);
        }
        code.truncate(offset);
        code.extend_from_slice(bytes);
    }

    #[test]
    fn add_assert_ge_forward() {
        let code = [ADD, DUP4, DUP2, LT, ISZERO, PUSH1, 0x20, JUMPI];
        let template = matching_template(ADD, 0, &code).unwrap();
        assert_eq!(template.name, "add-assert-ge");
    }

    #[test]
    fn add_require_ge_at_pc() {
        assert!(is_protected(ADD, 2, &[DUP1, DUP3, ADD, LT, ISZERO]));
    }

    #[test]
    fn add_require_gt_across_jumpdest() {
        assert!(is_protected(ADD, 0, &[ADD, GT, JUMPDEST, ISZERO]));
    }

    #[test]
    fn add_max_minus_backward() {
        let mut code = vec![SUB, DUP4, GT, ISZERO, PUSH1, 0x40, JUMPI];
        place(&mut code, 15, &[ADD]);
        let template = matching_template(ADD, 15, &code).unwrap();
        assert_eq!(template.name, "add-max-minus");
    }

    #[test]
    fn addmod_uses_addition_family() {
        assert!(is_protected(ADDMOD, 0, &[ADDMOD, POP, ADD, LT, ISZERO]));
    }

    #[test]
    fn sub_idioms_backward() {
        let mut assert_le = vec![DUP3, DUP3, GT, ISZERO];
        place(&mut assert_le, 14, &[SUB]);
        assert_eq!(
            matching_template(SUB, 14, &assert_le).unwrap().name,
            "sub-assert-le"
        );

        let mut require_ge = vec![DUP2, DUP4, LT, ISZERO];
        place(&mut require_ge, 11, &[SUB]);
        assert_eq!(
            matching_template(SUB, 11, &require_ge).unwrap().name,
            "sub-require-ge"
        );

        let mut throw_lt = vec![DUP2, DUP4, LT, ISZERO];
        place(&mut throw_lt, 15, &[SUB]);
        assert_eq!(
            matching_template(SUB, 15, &throw_lt).unwrap().name,
            "sub-throw-lt"
        );
    }

    #[test]
    fn sub_has_no_forward_idioms() {
        assert!(!is_protected(SUB, 0, &[SUB, DUP3, DUP3, GT, ISZERO]));
    }

    #[test]
    fn mul_assert_div_forward() {
        let mut code = vec![MUL, PUSH1, 0x00, DUP5, EQ];
        place(&mut code, 23, &[DIV, EQ]);
        let template = matching_template(MUL, 0, &code).unwrap();
        assert_eq!(template.name, "mul-assert-div");
    }

    #[test]
    fn mul_max_div_backward() {
        let mut code = vec![DIV, DUP4, GT, ISZERO];
        place(&mut code, 15, &[MUL]);
        assert!(is_protected(MUL, 15, &code));
    }

    #[test]
    fn unrelated_sequence_is_unprotected() {
        let code = padded(vec![CALLDATALOAD, DUP1, ADD, PUSH1, 0x00, MSTORE], 40);
        assert!(!is_protected(ADD, 2, &code));
    }

    #[test]
    fn scan_stops_at_boundary() {
        // The guard sits behind a JUMPDEST, outside the horizon.
        assert!(!is_protected(ADD, 0, &[ADD, POP, JUMPDEST, ADD, LT, ISZERO]));
        assert!(!is_protected(ADD, 0, &[ADD, JUMP, DUP4, DUP2, LT, ISZERO]));
    }

    #[test]
    fn scan_stops_at_code_edges() {
        assert!(!is_protected(ADD, 0, &[ADD]));
        assert!(!is_protected(MUL, 3, &[POP, POP, POP, MUL]));
        assert!(!is_protected(ADD, 10, &[ADD]));
    }

    #[test]
    fn non_arithmetic_opcode() {
        assert!(!is_protected(DIV, 0, &[ADD, LT, ISZERO]));
    }

    #[test]
    fn conditional_jump_adjacency() {
        assert!(feeds_conditional_jump(0, &[LT, PUSH1, 0x0a, JUMPI]));
        assert!(feeds_conditional_jump(0, &[EQ, ISZERO, PUSH2, 0x00, 0x0a, JUMPI]));
        assert!(feeds_conditional_jump(1, &[DUP1, GT, PUSH1, 0x0a, JUMPI]));

        assert!(!feeds_conditional_jump(0, &[LT, POP]));
        assert!(!feeds_conditional_jump(0, &[LT, PUSH1, 0x0a]));
        assert!(!feeds_conditional_jump(0, &[LT, PUSH0, JUMPI]));
        assert!(!feeds_conditional_jump(0, &[LT, ISZERO, ISZERO, PUSH1, 0x0a, JUMPI]));
        assert!(!feeds_conditional_jump(0, &[LT, PUSH1, 0x0a, JUMP]));
    }
}
