//! 256-bit machine words and their signed interpretations.
//!
//! A [`Word`] is an unsigned 256-bit integer; arithmetic wraps modulo 2^256 unless an opcode says
//! otherwise. The signed opcodes (`SDIV`, `SMOD`, `SLT`, `SGT`, `SAR`, `SIGNEXTEND`) read the same
//! bits as two's complement, which the helpers in this module implement on top of the unsigned
//! type.

use alloy_primitives::{Address, B256, U256};

/// Fixed-width 256-bit unsigned machine word.
pub type Word = U256;

/// Narrows a word to `usize`, saturating at `usize::MAX`.
///
/// Offsets and sizes taken from the stack go through this conversion; a saturated value
/// always fails the subsequent gas or bounds check instead of silently wrapping.
#[must_use]
pub fn as_usize_saturated(value: Word) -> usize {
    let limbs = value.as_limbs();
    if limbs[1] != 0 || limbs[2] != 0 || limbs[3] != 0 {
        return usize::MAX;
    }
    usize::try_from(limbs[0]).unwrap_or(usize::MAX)
}

/// Narrows a word to `u64`, saturating at `u64::MAX`.
#[must_use]
pub fn as_u64_saturated(value: Word) -> u64 {
    let limbs = value.as_limbs();
    if limbs[1] != 0 || limbs[2] != 0 || limbs[3] != 0 {
        return u64::MAX;
    }
    limbs[0]
}

/// Converts a boolean into `0` or `1`.
#[must_use]
pub fn from_bool(value: bool) -> Word {
    if value {
        Word::from(1u64)
    } else {
        Word::ZERO
    }
}

/// Returns `true` if the two's complement reading of `value` is negative.
#[must_use]
pub fn is_negative(value: Word) -> bool {
    value.bit(255)
}

/// Two's complement absolute value. `MIN` maps to itself.
#[must_use]
pub fn abs(value: Word) -> Word {
    if is_negative(value) {
        value.wrapping_neg()
    } else {
        value
    }
}

/// Signed division, truncating toward zero. Division by zero yields zero.
#[must_use]
pub fn sdiv(a: Word, b: Word) -> Word {
    if b.is_zero() {
        return Word::ZERO;
    }
    let quotient = abs(a) / abs(b);
    if is_negative(a) != is_negative(b) {
        quotient.wrapping_neg()
    } else {
        quotient
    }
}

/// Signed remainder; the result takes the sign of the dividend. Modulo zero yields zero.
#[must_use]
pub fn smod(a: Word, b: Word) -> Word {
    if b.is_zero() {
        return Word::ZERO;
    }
    let remainder = abs(a) % abs(b);
    if is_negative(a) {
        remainder.wrapping_neg()
    } else {
        remainder
    }
}

/// Signed less-than.
#[must_use]
pub fn slt(a: Word, b: Word) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

/// Signed greater-than.
#[must_use]
pub fn sgt(a: Word, b: Word) -> bool {
    slt(b, a)
}

/// Extends the sign bit of the low `byte_index + 1` bytes of `value` across the word.
#[must_use]
pub fn signextend(byte_index: Word, value: Word) -> Word {
    if byte_index >= Word::from(31u64) {
        return value;
    }
    let sign_bit = as_usize_saturated(byte_index) * 8 + 7;
    let mask = (Word::from(1u64) << sign_bit) - Word::from(1u64);
    if value.bit(sign_bit) {
        value | !mask
    } else {
        value & mask
    }
}

/// Extracts byte `index` of `value`, counting from the most significant byte.
#[must_use]
pub fn byte(index: Word, value: Word) -> Word {
    if index >= Word::from(32u64) {
        return Word::ZERO;
    }
    let bytes = value.to_be_bytes::<32>();
    Word::from(bytes[as_usize_saturated(index)])
}

/// Logical shift left; shifts of 256 or more clear the word.
#[must_use]
pub fn shl(shift: Word, value: Word) -> Word {
    if shift >= Word::from(256u64) {
        Word::ZERO
    } else {
        value << as_usize_saturated(shift)
    }
}

/// Logical shift right; shifts of 256 or more clear the word.
#[must_use]
pub fn shr(shift: Word, value: Word) -> Word {
    if shift >= Word::from(256u64) {
        Word::ZERO
    } else {
        value >> as_usize_saturated(shift)
    }
}

/// Arithmetic shift right, filling with the sign bit.
#[must_use]
pub fn sar(shift: Word, value: Word) -> Word {
    let negative = is_negative(value);
    if shift >= Word::from(256u64) {
        return if negative { Word::MAX } else { Word::ZERO };
    }
    let shift = as_usize_saturated(shift);
    if negative {
        !((!value) >> shift)
    } else {
        value >> shift
    }
}

/// Interprets the low 20 bytes of a word as an address.
#[must_use]
pub fn to_address(value: Word) -> Address {
    let bytes = value.to_be_bytes::<32>();
    Address::from_slice(&bytes[12..])
}

/// Zero-extends an address into a word.
#[must_use]
pub fn from_address(address: Address) -> Word {
    Word::from_be_slice(address.as_slice())
}

/// Reinterprets a word as 32 big-endian bytes.
#[must_use]
pub fn to_b256(value: Word) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}
