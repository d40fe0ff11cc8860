//! Overflow predicates and branch distances.
//!
//! These are pure functions over [`Word`]s, independent of stacks and tags. The interpreter
//! handlers call them with operands in stack order: the first argument is always the value that
//! was on top of the stack.
//!
//! # Overflow predicates
//!
//! | Opcode   | Wraps when                                              |
//! |----------|---------------------------------------------------------|
//! | `ADD`    | wrapped sum < `a` or wrapped sum < `b`                  |
//! | `SUB`    | minuend < subtrahend                                    |
//! | `MUL`    | `a != 0` and wrapped product / `a` != `b`               |
//! | `ADDMOD` | modular result < `a` or modular result < `b`            |
//!
//! # Branch distances
//!
//! For the comparisons that drive conditional jumps, [`BranchDistance`] measures how far the
//! operands are from producing each outcome. The outcome that was actually produced always has
//! distance zero.

use serde::Serialize;

use crate::emulation::Word;

/// Returns `true` if `a + b` wraps modulo 2^256.
#[must_use]
pub fn add_overflows(a: Word, b: Word) -> bool {
    let sum = a.wrapping_add(b);
    sum < a || sum < b
}

/// Returns `true` if `minuend - subtrahend` wraps below zero.
#[must_use]
pub fn sub_underflows(minuend: Word, subtrahend: Word) -> bool {
    minuend < subtrahend
}

/// Returns `true` if `a * b` wraps modulo 2^256.
#[must_use]
pub fn mul_overflows(a: Word, b: Word) -> bool {
    if a.is_zero() {
        return false;
    }
    a.wrapping_mul(b) / a != b
}

/// Returns `true` if the `ADDMOD` result is smaller than one of its raw operands.
///
/// This is a wraparound heuristic, not an exact overflow test: `ADDMOD` itself computes in
/// 512-bit precision and never loses bits.
#[must_use]
pub fn addmod_wraps(a: Word, b: Word, result: Word) -> bool {
    result < a || result < b
}

/// Distances from a comparison's operands to each of its outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BranchDistance {
    /// How far the operands are from making the comparison false.
    pub if_false: Word,
    /// How far the operands are from making the comparison true.
    pub if_true: Word,
}

impl BranchDistance {
    const fn taken_true(if_false: Word) -> Self {
        BranchDistance {
            if_false,
            if_true: Word::ZERO,
        }
    }

    const fn taken_false(if_true: Word) -> Self {
        BranchDistance {
            if_false: Word::ZERO,
            if_true,
        }
    }

    /// Distance for `LT` with `x` on top of the stack and `y` below it (`x < y`).
    #[must_use]
    pub fn lt(x: Word, y: Word) -> Self {
        if x < y {
            Self::taken_true(y - x)
        } else {
            Self::taken_false((x - y).saturating_add(Word::from(1u64)))
        }
    }

    /// Distance for `GT` with `x` on top of the stack and `y` below it (`x > y`).
    #[must_use]
    pub fn gt(x: Word, y: Word) -> Self {
        if x > y {
            Self::taken_true(x - y)
        } else {
            Self::taken_false((y - x).saturating_add(Word::from(1u64)))
        }
    }

    /// Distance for `EQ`: one step away from inequality, or the absolute difference away from
    /// equality.
    #[must_use]
    pub fn eq(x: Word, y: Word) -> Self {
        if x == y {
            Self::taken_true(Word::from(1u64))
        } else {
            Self::taken_false(abs_diff(x, y))
        }
    }
}

fn abs_diff(x: Word, y: Word) -> Word {
    if x > y {
        x - y
    } else {
        y - x
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn word(value: u64) -> Word {
        Word::from(value)
    }

    fn any_word() -> impl Strategy<Value = Word> {
        any::<[u64; 4]>().prop_map(Word::from_limbs)
    }

    #[test]
    fn add_edges() {
        assert!(add_overflows(Word::MAX, word(1)));
        assert!(add_overflows(word(1), Word::MAX));
        assert!(!add_overflows(Word::MAX, Word::ZERO));
        assert!(!add_overflows(word(2), word(3)));
    }

    #[test]
    fn sub_edges() {
        assert!(sub_underflows(word(1), word(2)));
        assert!(!sub_underflows(word(2), word(2)));
        assert!(!sub_underflows(Word::MAX, Word::ZERO));
    }

    #[test]
    fn mul_edges() {
        assert!(!mul_overflows(Word::ZERO, Word::MAX));
        assert!(!mul_overflows(Word::MAX, word(1)));
        assert!(mul_overflows(Word::MAX, word(2)));
        assert!(mul_overflows(word(1) << 128, word(1) << 128));
        assert!(!mul_overflows(word(1) << 127, word(1) << 128));
    }

    #[test]
    fn addmod_heuristic() {
        // (10 + 10) % 7 = 6 is below both operands
        assert!(addmod_wraps(word(10), word(10), word(6)));
        assert!(!addmod_wraps(word(1), word(2), word(3)));
    }

    #[test]
    fn lt_distances() {
        // 5 < 10: five steps from false, already true
        assert_eq!(
            BranchDistance::lt(word(5), word(10)),
            BranchDistance {
                if_false: word(5),
                if_true: Word::ZERO
            }
        );
        // 10 < 5 is false: six steps from true
        assert_eq!(
            BranchDistance::lt(word(10), word(5)),
            BranchDistance {
                if_false: Word::ZERO,
                if_true: word(6)
            }
        );
        // equal operands: one step from true
        assert_eq!(BranchDistance::lt(word(3), word(3)).if_true, word(1));
    }

    #[test]
    fn gt_distances() {
        assert_eq!(
            BranchDistance::gt(word(10), word(5)),
            BranchDistance {
                if_false: word(5),
                if_true: Word::ZERO
            }
        );
        assert_eq!(
            BranchDistance::gt(word(5), word(10)),
            BranchDistance {
                if_false: Word::ZERO,
                if_true: word(6)
            }
        );
    }

    #[test]
    fn eq_distances() {
        assert_eq!(
            BranchDistance::eq(word(4), word(4)),
            BranchDistance {
                if_false: word(1),
                if_true: Word::ZERO
            }
        );
        assert_eq!(BranchDistance::eq(word(4), word(9)).if_true, word(5));
        assert_eq!(BranchDistance::eq(word(9), word(4)).if_true, word(5));
    }

    #[test]
    fn distance_saturates() {
        let distance = BranchDistance::lt(Word::MAX, Word::ZERO);
        assert_eq!(distance.if_true, Word::MAX);
    }

    proptest! {
        #[test]
        fn add_matches_checked(a in any_word(), b in any_word()) {
            prop_assert_eq!(add_overflows(a, b), a.checked_add(b).is_none());
        }

        #[test]
        fn mul_matches_checked(a in any_word(), b in any_word()) {
            prop_assume!(!a.is_zero());
            prop_assert_eq!(mul_overflows(a, b), a.checked_mul(b).is_none());
        }

        #[test]
        fn sub_matches_checked(a in any_word(), b in any_word()) {
            prop_assert_eq!(sub_underflows(a, b), a.checked_sub(b).is_none());
        }

        #[test]
        fn taken_side_is_zero(x in any_word(), y in any_word()) {
            let lt = BranchDistance::lt(x, y);
            if x < y {
                prop_assert!(lt.if_true.is_zero());
            } else {
                prop_assert!(lt.if_false.is_zero());
            }

            let gt = BranchDistance::gt(x, y);
            if x > y {
                prop_assert!(gt.if_true.is_zero());
            } else {
                prop_assert!(gt.if_false.is_zero());
            }
        }
    }
}
