//! Record of branch distances at tainted comparisons.

use std::fmt;

use serde::Serialize;

use crate::emulation::{engine::arithmetic::BranchDistance, Word};

/// One distance entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CostEntry {
    /// Offset of the comparison.
    pub pc: usize,
    /// Distance to one of its outcomes.
    pub distance: Word,
}

/// Both distances of one comparison, regrouped from a [`CostRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BranchCost {
    /// Offset of the comparison.
    pub pc: usize,
    /// Distance to making the comparison false.
    pub if_false: Word,
    /// Distance to making the comparison true.
    pub if_true: Word,
}

impl BranchCost {
    /// The non-zero distance: how far the operands are from flipping the branch.
    #[must_use]
    pub fn flip_distance(&self) -> Word {
        self.if_false.max(self.if_true)
    }
}

/// Append-only sequence of branch distances.
///
/// Every recorded comparison contributes exactly two consecutive entries with the same pc:
/// first the distance to a false result, then the distance to a true result. The outcome that
/// was actually produced has distance zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CostRecord {
    entries: Vec<CostEntry>,
}

impl CostRecord {
    /// Creates an empty record with room for `capacity` comparisons.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        CostRecord {
            entries: Vec::with_capacity(capacity.saturating_mul(2)),
        }
    }

    pub(crate) fn push(&mut self, pc: usize, distance: BranchDistance) {
        self.entries.push(CostEntry {
            pc,
            distance: distance.if_false,
        });
        self.entries.push(CostEntry {
            pc,
            distance: distance.if_true,
        });
    }

    /// Number of entries (twice the number of recorded comparisons).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no tainted comparison fed a conditional jump.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The flat entries.
    #[must_use]
    pub fn entries(&self) -> &[CostEntry] {
        &self.entries
    }

    /// Entries recorded for the comparison at `pc`, across all its executions.
    pub fn at(&self, pc: usize) -> impl Iterator<Item = &CostEntry> {
        self.entries.iter().filter(move |entry| entry.pc == pc)
    }

    /// Regroups the entries per executed comparison.
    pub fn branches(&self) -> impl Iterator<Item = BranchCost> + '_ {
        self.entries.chunks_exact(2).map(|pair| BranchCost {
            pc: pair[0].pc,
            if_false: pair[0].distance,
            if_true: pair[1].distance,
        })
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Display for CostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>8}  {:>20}  {:>20}", "pc", "if_false", "if_true")?;
        for branch in self.branches() {
            writeln!(
                f,
                "{:>8}  {:>20}  {:>20}",
                branch.pc,
                branch.if_false.to_string(),
                branch.if_true.to_string()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(value: u64) -> Word {
        Word::from(value)
    }

    #[test]
    fn two_entries_per_comparison() {
        let mut record = CostRecord::with_capacity(4);
        record.push(12, BranchDistance::lt(word(5), word(10)));

        assert_eq!(record.len(), 2);
        assert_eq!(record.entries()[0].distance, word(5));
        assert_eq!(record.entries()[1].distance, Word::ZERO);
        assert!(record.at(12).all(|entry| entry.pc == 12));
    }

    #[test]
    fn regroups_branches() {
        let mut record = CostRecord::default();
        record.push(3, BranchDistance::eq(word(7), word(7)));
        record.push(9, BranchDistance::gt(word(1), word(4)));

        let branches: Vec<_> = record.branches().collect();
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].if_false, word(1));
        assert_eq!(branches[1].pc, 9);
        assert_eq!(branches[1].if_true, word(4));
        assert_eq!(branches[1].flip_distance(), word(4));

        let table = record.to_string();
        assert_eq!(table.lines().count(), 3);
    }
}
