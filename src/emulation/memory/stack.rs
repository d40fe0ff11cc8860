//! Operand stack with paired taint tags.
//!
//! Every entry of a [`TaintedStack`] is a [`Slot`] holding a word together with its tag, so a
//! push, pop, `DUPn` or `SWAPn` always moves both halves at once and the value/taint pairing
//! cannot drift apart.

use crate::{
    emulation::{EmulationError, TaintFlags, Word},
    Result,
};

/// Maximum number of entries on the operand stack.
pub const STACK_LIMIT: usize = 1024;

/// One stack entry: a word and its taint tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Slot {
    /// The machine word.
    pub value: Word,
    /// Tag attached to the word.
    pub taint: TaintFlags,
}

impl Slot {
    /// Creates a slot from a value and tag.
    #[must_use]
    pub const fn new(value: Word, taint: TaintFlags) -> Self {
        Slot { value, taint }
    }

    /// Creates an untainted slot.
    #[must_use]
    pub const fn safe(value: Word) -> Self {
        Slot {
            value,
            taint: TaintFlags::SAFE,
        }
    }
}

/// EVM operand stack of [`Slot`]s, bounded at [`STACK_LIMIT`].
///
/// # Examples
///
/// ```rust
/// use taintscope::emulation::{TaintFlags, TaintedStack, Word};
///
/// let mut stack = TaintedStack::new();
/// stack.push(Word::from(1u64), TaintFlags::EXTERNAL)?;
/// stack.push(Word::from(2u64), TaintFlags::SAFE)?;
/// stack.swap(1)?;
///
/// let top = stack.pop()?;
/// assert_eq!(top.value, Word::from(1u64));
/// assert!(top.taint.is_external());
/// # Ok::<(), taintscope::Error>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct TaintedStack {
    slots: Vec<Slot>,
}

impl TaintedStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        TaintedStack {
            slots: Vec::with_capacity(32),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the stack holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Pushes a word with its tag.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackOverflow`] when the stack is full.
    pub fn push(&mut self, value: Word, taint: TaintFlags) -> Result<()> {
        self.push_slot(Slot::new(value, taint))
    }

    /// Pushes an untainted word.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackOverflow`] when the stack is full.
    pub fn push_safe(&mut self, value: Word) -> Result<()> {
        self.push_slot(Slot::safe(value))
    }

    /// Pushes a prepared slot.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackOverflow`] when the stack is full.
    pub fn push_slot(&mut self, slot: Slot) -> Result<()> {
        if self.slots.len() >= STACK_LIMIT {
            return Err(EmulationError::StackOverflow.into());
        }
        self.slots.push(slot);
        Ok(())
    }

    /// Pops the top entry.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackUnderflow`] on an empty stack.
    pub fn pop(&mut self) -> Result<Slot> {
        self.slots
            .pop()
            .ok_or_else(|| EmulationError::StackUnderflow.into())
    }

    /// Pops `N` entries, top first.
    ///
    /// Nothing is removed if fewer than `N` entries are present.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackUnderflow`] if the stack is too shallow.
    pub fn pop_n<const N: usize>(&mut self) -> Result<[Slot; N]> {
        self.require(N)?;
        let mut popped = [Slot::default(); N];
        for slot in &mut popped {
            if let Some(top) = self.slots.pop() {
                *slot = top;
            }
        }
        Ok(popped)
    }

    /// Returns the entry `depth` positions below the top (0 is the top).
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackUnderflow`] if the stack is too shallow.
    pub fn peek(&self, depth: usize) -> Result<&Slot> {
        self.slots
            .len()
            .checked_sub(depth + 1)
            .and_then(|index| self.slots.get(index))
            .ok_or_else(|| EmulationError::StackUnderflow.into())
    }

    /// Duplicates the `n`-th entry (1-based) onto the top, as `DUPn` does.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackUnderflow`] or [`EmulationError::StackOverflow`].
    pub fn dup(&mut self, n: usize) -> Result<()> {
        let slot = *self.peek(n.saturating_sub(1))?;
        self.push_slot(slot)
    }

    /// Exchanges the top with the entry `n` positions below it, as `SWAPn` does.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackUnderflow`] if the stack is too shallow.
    pub fn swap(&mut self, n: usize) -> Result<()> {
        self.require(n + 1)?;
        let top = self.slots.len() - 1;
        self.slots.swap(top, top - n);
        Ok(())
    }

    /// Verifies that at least `count` entries are present.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::StackUnderflow`] if the stack is too shallow.
    pub fn require(&self, count: usize) -> Result<()> {
        if self.slots.len() < count {
            return Err(EmulationError::StackUnderflow.into());
        }
        Ok(())
    }

    /// Iterates the entries from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn word(value: u64) -> Word {
        Word::from(value)
    }

    #[test]
    fn push_pop_pairs_taint() {
        let mut stack = TaintedStack::new();
        stack.push(word(7), TaintFlags::EXTERNAL).unwrap();
        stack.push_safe(word(9)).unwrap();

        let top = stack.pop().unwrap();
        assert_eq!(top, Slot::safe(word(9)));
        let next = stack.pop().unwrap();
        assert_eq!(next, Slot::new(word(7), TaintFlags::EXTERNAL));
        assert!(stack.is_empty());
    }

    #[test]
    fn underflow() {
        let mut stack = TaintedStack::new();
        assert!(matches!(
            stack.pop(),
            Err(Error::Emulation(EmulationError::StackUnderflow))
        ));
        assert!(stack.peek(0).is_err());
        assert!(stack.swap(1).is_err());
        assert!(stack.dup(1).is_err());
    }

    #[test]
    fn overflow() {
        let mut stack = TaintedStack::new();
        for i in 0..STACK_LIMIT {
            stack.push_safe(word(i as u64)).unwrap();
        }
        assert!(matches!(
            stack.push_safe(word(0)),
            Err(Error::Emulation(EmulationError::StackOverflow))
        ));
        assert_eq!(stack.len(), STACK_LIMIT);
    }

    #[test]
    fn dup_copies_tag() {
        let mut stack = TaintedStack::new();
        stack.push(word(1), TaintFlags::EXTERNAL).unwrap();
        stack.push_safe(word(2)).unwrap();
        stack.dup(2).unwrap();

        assert_eq!(stack.len(), 3);
        assert_eq!(*stack.peek(0).unwrap(), Slot::new(word(1), TaintFlags::EXTERNAL));
    }

    #[test]
    fn swap_moves_tags_with_values() {
        let mut stack = TaintedStack::new();
        stack.push(word(1), TaintFlags::EXTERNAL).unwrap();
        stack.push_safe(word(2)).unwrap();
        stack.push_safe(word(3)).unwrap();
        stack.swap(2).unwrap();

        assert_eq!(*stack.peek(0).unwrap(), Slot::new(word(1), TaintFlags::EXTERNAL));
        assert_eq!(*stack.peek(2).unwrap(), Slot::safe(word(3)));
    }

    #[test]
    fn pop_n_is_all_or_nothing() {
        let mut stack = TaintedStack::new();
        stack.push_safe(word(1)).unwrap();
        stack.push_safe(word(2)).unwrap();

        assert!(stack.pop_n::<3>().is_err());
        assert_eq!(stack.len(), 2);

        let [a, b] = stack.pop_n::<2>().unwrap();
        assert_eq!(a.value, word(2));
        assert_eq!(b.value, word(1));
    }
}
