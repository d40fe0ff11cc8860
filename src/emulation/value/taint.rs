//! Taint tags attached to stack words and memory bytes.
//!
//! A [`TaintFlags`] value travels with every word on the stack and every byte in memory. Flags
//! only ever accumulate: every propagation step combines tags with bitwise OR, and no handler
//! clears a bit it received.
//!
//! | Flag                   | Bit      | Meaning                                             |
//! |------------------------|----------|-----------------------------------------------------|
//! | `SAFE`                 | (none)   | Value not derived from external input               |
//! | `EXTERNAL`             | `1 << 0` | Derived from call data or call value                |
//! | `POTENTIAL_OVERFLOW`   | `1 << 1` | External arithmetic that wrapped around             |
//! | `PROTECTED_OVERFLOW`   | `1 << 2` | The wrap is guarded by a recognized idiom           |
//! | `OVERFLOW`             | `1 << 3` | The wrap is not guarded                             |
//! | `POTENTIAL_TRUNCATION` | `1 << 4` | Reserved for narrowing conversions                  |
//! | `TRUNCATION`           | `1 << 5` | Reserved for narrowing conversions                  |
//! | `SIGN`                 | `1 << 6` | Reserved for signedness confusion                   |
//! | `STORAGE`              | `1 << 7` | Reserved for storage-borne taint                    |
//! | `BRANCH`               | `1 << 8` | Drove a conditional jump through a comparison       |

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Bitset of taint and finding flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct TaintFlags: u16 {
        /// Derived, directly or indirectly, from externally supplied call data
        const EXTERNAL = 1;
        /// Result of arithmetic with an external operand that wrapped around
        const POTENTIAL_OVERFLOW = 1 << 1;
        /// Wrapping arithmetic that is guarded by a known check idiom
        const PROTECTED_OVERFLOW = 1 << 2;
        /// Wrapping arithmetic without a recognizable guard
        const OVERFLOW = 1 << 3;
        /// Narrowing that may lose bits
        const POTENTIAL_TRUNCATION = 1 << 4;
        /// Narrowing that lost bits
        const TRUNCATION = 1 << 5;
        /// Signed/unsigned confusion
        const SIGN = 1 << 6;
        /// Loaded from contract storage
        const STORAGE = 1 << 7;
        /// Comparison result that feeds a conditional jump
        const BRANCH = 1 << 8;
    }
}

impl TaintFlags {
    /// The untainted tag.
    pub const SAFE: TaintFlags = TaintFlags::empty();

    /// Every bit that denotes an arithmetic finding.
    pub const OVERFLOW_CLASS: TaintFlags = TaintFlags::POTENTIAL_OVERFLOW
        .union(TaintFlags::PROTECTED_OVERFLOW)
        .union(TaintFlags::OVERFLOW);

    /// Returns `true` if the value derives from external input.
    #[must_use]
    pub const fn is_external(self) -> bool {
        self.contains(TaintFlags::EXTERNAL)
    }

    /// Returns `true` if no flag is set.
    #[must_use]
    pub const fn is_safe(self) -> bool {
        self.is_empty()
    }

    /// Returns `true` if any overflow-class bit is set.
    #[must_use]
    pub const fn has_overflow_finding(self) -> bool {
        self.intersects(TaintFlags::OVERFLOW_CLASS)
    }

    /// Combines a sequence of tags into one.
    pub fn merge_all<I>(tags: I) -> TaintFlags
    where
        I: IntoIterator<Item = TaintFlags>,
    {
        tags.into_iter().fold(TaintFlags::SAFE, |acc, tag| acc | tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_layout() {
        assert_eq!(TaintFlags::SAFE.bits(), 0);
        assert_eq!(TaintFlags::EXTERNAL.bits(), 1);
        assert_eq!(TaintFlags::OVERFLOW.bits(), 8);
        assert_eq!(TaintFlags::BRANCH.bits(), 256);
    }

    #[test]
    fn merge_is_or() {
        let merged = TaintFlags::merge_all([
            TaintFlags::EXTERNAL,
            TaintFlags::SAFE,
            TaintFlags::OVERFLOW | TaintFlags::POTENTIAL_OVERFLOW,
        ]);

        assert!(merged.is_external());
        assert!(merged.has_overflow_finding());
        assert!(!merged.contains(TaintFlags::PROTECTED_OVERFLOW));
        assert!(TaintFlags::merge_all(std::iter::empty()).is_safe());
    }

    #[test]
    fn overflow_class() {
        assert!(!TaintFlags::EXTERNAL.has_overflow_finding());
        assert!(!TaintFlags::BRANCH.has_overflow_finding());
        assert!(TaintFlags::PROTECTED_OVERFLOW.has_overflow_finding());
    }
}
