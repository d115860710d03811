// Reorders out-of-order completions back into submission order

use std::collections::BTreeMap;

/// Buffer that releases items strictly in sequence-number order
///
/// Items may be pushed in any order. `pop_ready` only yields the item whose
/// sequence number is next in line, so a gap holds back everything after it.
#[derive(Debug)]
pub struct Resequencer<T> {
    next: u64,
    pending: BTreeMap<u64, T>,
}

impl<T> Resequencer<T> {
    /// Create a buffer expecting `first` as the first sequence number
    pub fn new(first: u64) -> Self {
        Self {
            next: first,
            pending: BTreeMap::new(),
        }
    }

    /// Buffer a completed item
    ///
    /// Sequence numbers already released or already buffered are ignored and
    /// returned as `false`.
    pub fn push(&mut self, seq: u64, item: T) -> bool {
        if seq < self.next || self.pending.contains_key(&seq) {
            return false;
        }
        self.pending.insert(seq, item);
        true
    }

    /// Release the next item if it has arrived
    pub fn pop_ready(&mut self) -> Option<(u64, T)> {
        let item = self.pending.remove(&self.next)?;
        let seq = self.next;
        self.next += 1;
        Some((seq, item))
    }

    /// Sequence number that will be released next
    pub fn next_seq(&self) -> u64 {
        self.next
    }

    /// Number of completed items waiting on an earlier one
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_in_order_passthrough() {
        let mut reseq = Resequencer::new(0);
        reseq.push(0, "a");
        assert_eq!(reseq.pop_ready(), Some((0, "a")));
        assert_eq!(reseq.pop_ready(), None);
    }

    #[test]
    fn test_gap_holds_back_later_items() {
        let mut reseq = Resequencer::new(0);
        reseq.push(2, "c");
        reseq.push(1, "b");
        assert_eq!(reseq.pop_ready(), None);
        assert_eq!(reseq.buffered(), 2);

        reseq.push(0, "a");
        assert_eq!(reseq.pop_ready(), Some((0, "a")));
        assert_eq!(reseq.pop_ready(), Some((1, "b")));
        assert_eq!(reseq.pop_ready(), Some((2, "c")));
        assert!(reseq.is_empty());
        assert_eq!(reseq.next_seq(), 3);
    }

    #[test]
    fn test_stale_and_duplicate_pushes_are_rejected() {
        let mut reseq = Resequencer::new(5);
        assert!(!reseq.push(4, "old"));
        assert!(reseq.push(6, "x"));
        assert!(!reseq.push(6, "y"));
        assert!(reseq.push(5, "w"));
        assert_eq!(reseq.pop_ready(), Some((5, "w")));
        assert_eq!(reseq.pop_ready(), Some((6, "x")));
    }

    proptest! {
        #[test]
        fn prop_any_permutation_is_released_in_order(
            order in Just((0u64..64).collect::<Vec<_>>()).prop_shuffle()
        ) {
            let mut reseq = Resequencer::new(0);
            let mut released = Vec::new();
            for seq in order {
                reseq.push(seq, seq);
                while let Some((_, item)) = reseq.pop_ready() {
                    released.push(item);
                }
            }
            prop_assert_eq!(released, (0u64..64).collect::<Vec<_>>());
        }
    }
}
