//! Run-wide OR-accumulation of taint flags.

use serde::Serialize;

use crate::emulation::TaintFlags;

/// Summary bitset of every finding observed during a run.
///
/// Bits are only ever added; within one run the state is monotonically non-decreasing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AggregationState {
    flags: TaintFlags,
}

impl AggregationState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ORs `flags` into the state.
    pub fn merge(&mut self, flags: TaintFlags) {
        self.flags |= flags;
    }

    /// The accumulated flags.
    #[must_use]
    pub fn flags(&self) -> TaintFlags {
        self.flags
    }

    /// Returns `true` if every bit of `flags` has been observed.
    #[must_use]
    pub fn contains(&self, flags: TaintFlags) -> bool {
        self.flags.contains(flags)
    }

    /// Returns `true` if an unguarded overflow was observed.
    #[must_use]
    pub fn has_unprotected_overflow(&self) -> bool {
        self.flags.contains(TaintFlags::OVERFLOW)
    }

    pub(crate) fn clear(&mut self) {
        self.flags = TaintFlags::SAFE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_monotonic() {
        let mut state = AggregationState::new();
        state.merge(TaintFlags::EXTERNAL | TaintFlags::OVERFLOW);
        state.merge(TaintFlags::SAFE);
        state.merge(TaintFlags::BRANCH);

        assert!(state.contains(TaintFlags::EXTERNAL | TaintFlags::BRANCH));
        assert!(state.has_unprotected_overflow());

        state.clear();
        assert!(state.flags().is_safe());
    }
}
