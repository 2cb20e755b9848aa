// Fixed-capacity command storage backing the shell history.
use crate::error::{HistoryError, Result};

/// Circular buffer of commands, oldest at `start`, next write slot at `end`.
///
/// One slot is always left unused so that `start == end` unambiguously means
/// empty. A buffer of capacity `n` therefore retains at most `n - 1` commands,
/// and a capacity of 1 never retains anything.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Vec<String>,
    start: usize,
    end: usize,
}

impl RingBuffer {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be at least 1");
        Self {
            slots: vec![String::new(); capacity],
            start: 0,
            end: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        (self.end + self.capacity() - self.start) % self.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Most recently added command, if any.
    pub fn last(&self) -> Option<&str> {
        if self.is_empty() {
            return None;
        }
        let idx = if self.end == 0 { self.capacity() - 1 } else { self.end - 1 };
        Some(&self.slots[idx])
    }

    /// Records `command`, evicting the oldest entry when full.
    ///
    /// Blank commands and exact repeats of the previous command are ignored.
    /// Returns `true` if the command was stored.
    pub fn add(&mut self, command: &str) -> bool {
        if command.trim().is_empty() {
            return false;
        }
        if self.last() == Some(command) {
            return false;
        }

        let cap = self.capacity();
        let slot = &mut self.slots[self.end];
        slot.clear();
        slot.push_str(command);
        self.end = (self.end + 1) % cap;

        if self.end == self.start {
            self.start = (self.start + 1) % cap;
        }
        true
    }

    /// Forgets every entry. Slots are not wiped, only made unreachable.
    pub fn clear(&mut self) {
        self.start = 0;
        self.end = 0;
    }

    pub fn iter(&self) -> HistoryIterator<'_> {
        HistoryIterator {
            ring: self,
            index: self.start,
        }
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_owned).collect()
    }
}

impl<'a> IntoIterator for &'a RingBuffer {
    type Item = &'a str;
    type IntoIter = HistoryIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Forward cursor over a [`RingBuffer`], oldest entry first.
///
/// The cursor borrows the buffer, so the buffer cannot change while it is alive.
#[derive(Debug, Clone)]
pub struct HistoryIterator<'a> {
    ring: &'a RingBuffer,
    index: usize,
}

impl<'a> HistoryIterator<'a> {
    pub fn has_next(&self) -> bool {
        self.index != self.ring.end
    }

    /// Like [`Iterator::next`], but reports exhaustion as an error.
    pub fn try_next(&mut self) -> Result<&'a str> {
        if !self.has_next() {
            return Err(HistoryError::NoMoreElements);
        }
        let ring = self.ring;
        let value = ring.slots[self.index].as_str();
        self.index = (self.index + 1) % ring.capacity();
        Ok(value)
    }

    /// History entries cannot be removed individually.
    pub fn remove(&mut self) -> Result<()> {
        Err(HistoryError::UnsupportedOperation(
            "removing entries through a history iterator",
        ))
    }

    fn remaining(&self) -> usize {
        let cap = self.ring.capacity();
        (self.ring.end + cap - self.index) % cap
    }
}

impl<'a> Iterator for HistoryIterator<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.try_next().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl ExactSizeIterator for HistoryIterator<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn filled(capacity: usize, commands: &[&str]) -> RingBuffer {
        let mut ring = RingBuffer::new(capacity);
        for c in commands {
            ring.add(c);
        }
        ring
    }

    #[test]
    fn evicts_oldest_when_full() {
        let ring = filled(3, &["a", "b", "c"]);
        assert_eq!(ring.to_vec(), vec!["b", "c"]);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn collapses_consecutive_duplicates() {
        let ring = filled(5, &["ls", "ls", "cd .."]);
        assert_eq!(ring.to_vec(), vec!["ls", "cd .."]);
    }

    #[test]
    fn only_compares_against_previous_entry() {
        let ring = filled(5, &["ls", "pwd", "ls"]);
        assert_eq!(ring.to_vec(), vec!["ls", "pwd", "ls"]);
    }

    #[test]
    fn duplicate_check_is_untrimmed() {
        let ring = filled(5, &["ls", "ls "]);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn blank_commands_are_ignored() {
        let mut ring = RingBuffer::new(4);
        assert!(!ring.add(""));
        assert!(!ring.add("   "));
        assert!(!ring.add("\t\n"));
        assert!(ring.is_empty());
    }

    #[test]
    fn keeps_surrounding_whitespace_of_stored_command() {
        let ring = filled(4, &["  echo hi "]);
        assert_eq!(ring.last(), Some("  echo hi "));
    }

    #[test]
    fn capacity_one_never_retains() {
        let mut ring = RingBuffer::new(1);
        assert!(ring.add("ls"));
        assert!(ring.is_empty());
        assert!(!ring.iter().has_next());
    }

    #[test]
    #[should_panic]
    fn zero_capacity_panics() {
        let _ = RingBuffer::new(0);
    }

    #[test]
    fn clear_resets_cursors() {
        let mut ring = filled(4, &["a", "b", "c", "d"]);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.last(), None);
        assert!(!ring.iter().has_next());

        // Stale slot contents must not leak into new entries.
        ring.add("e");
        assert_eq!(ring.to_vec(), vec!["e"]);
    }

    #[test]
    fn last_wraps_around() {
        let ring = filled(3, &["a", "b", "c", "d"]);
        assert_eq!(ring.last(), Some("d"));
        assert_eq!(ring.to_vec(), vec!["c", "d"]);
    }

    #[test]
    fn try_next_reports_exhaustion() {
        let ring = filled(3, &["a"]);
        let mut it = ring.iter();
        assert!(it.has_next());
        assert_eq!(it.try_next().unwrap(), "a");
        assert!(!it.has_next());
        assert!(matches!(it.try_next(), Err(HistoryError::NoMoreElements)));
    }

    #[test]
    fn empty_iterator_has_nothing() {
        let ring = RingBuffer::new(8);
        let mut it = ring.iter();
        assert!(!it.has_next());
        assert_eq!(it.next(), None);
        assert_eq!(it.len(), 0);
    }

    #[test]
    fn remove_is_unsupported() {
        let ring = filled(3, &["a"]);
        let mut it = ring.iter();
        assert!(matches!(
            it.remove(),
            Err(HistoryError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn size_hint_tracks_progress() {
        let ring = filled(4, &["a", "b", "c", "d", "e"]);
        let mut it = ring.iter();
        assert_eq!(it.len(), 3);
        it.next();
        assert_eq!(it.len(), 2);
    }

    proptest! {
        #[test]
        fn distinct_adds_below_capacity_are_kept_in_order(
            capacity in 2usize..32,
            count in 0usize..32,
        ) {
            let count = count.min(capacity - 1);
            let commands: Vec<String> = (0..count).map(|i| format!("cmd {i}")).collect();
            let mut ring = RingBuffer::new(capacity);
            for c in &commands {
                ring.add(c);
            }
            prop_assert_eq!(ring.len(), count);
            prop_assert_eq!(ring.to_vec(), commands);
        }

        #[test]
        fn overflow_evicts_fifo(capacity in 1usize..16, count in 0usize..64) {
            let commands: Vec<String> = (0..count).map(|i| format!("cmd {i}")).collect();
            let mut ring = RingBuffer::new(capacity);
            for c in &commands {
                ring.add(c);
                prop_assert!(ring.len() <= capacity - 1);
            }
            let kept = count.min(capacity - 1);
            prop_assert_eq!(ring.to_vec(), commands[count - kept..].to_vec());
        }
    }
}
