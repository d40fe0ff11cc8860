//! Record of taken conditional jumps.

use std::fmt;

use serde::Serialize;

/// One taken `JUMPI`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct PathEntry {
    /// Offset of the `JUMPI`.
    pub source: usize,
    /// Offset of the `JUMPDEST` it jumped to.
    pub destination: usize,
}

/// Append-only sequence of taken conditional jumps, in execution order.
///
/// Untaken branches append nothing. Capacity is advisory; the record grows as needed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PathRecord {
    entries: Vec<PathEntry>,
}

impl PathRecord {
    /// Creates an empty record with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        PathRecord {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, source: usize, destination: usize) {
        self.entries.push(PathEntry {
            source,
            destination,
        });
    }

    /// Number of recorded jumps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no conditional jump was taken.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The recorded jumps.
    #[must_use]
    pub fn entries(&self) -> &[PathEntry] {
        &self.entries
    }

    /// Iterates the recorded jumps.
    pub fn iter(&self) -> std::slice::Iter<'_, PathEntry> {
        self.entries.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> IntoIterator for &'a PathRecord {
    type Item = &'a PathEntry;
    type IntoIter = std::slice::Iter<'a, PathEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for PathRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>6}  {:>8}  {:>8}", "#", "pc", "dest")?;
        for (index, entry) in self.entries.iter().enumerate() {
            writeln!(
                f,
                "{index:>6}  {:>8}  {:>8}",
                entry.source, entry.destination
            )?;
        }
        Ok(())
    }
}
