//! Bounded buffers with batch compaction.
//!
//! History entries and request samples are append-only. When a buffer grows
//! past its capacity the oldest half is discarded in one step instead of
//! evicting a single element per push.

use std::collections::VecDeque;

/// Helper trait for compacting pushes on a `VecDeque`.
pub(crate) trait CompactingPush<T> {
    /// Push a value; once the length exceeds `capacity`, keep only the newest
    /// `capacity / 2` values, and never fewer than one. Returns the number of discarded values.
    fn push_compacting(&mut self, value: T, capacity: usize) -> usize;
}

impl<T> CompactingPush<T> for VecDeque<T> {
    #[inline]
    fn push_compacting(&mut self, value: T, capacity: usize) -> usize {
        self.push_back(value);
        if self.len() <= capacity {
            return 0;
        }
        let keep = (capacity / 2).max(1);
        let discard = self.len() - keep;
        self.drain(..discard);
        discard
    }
}
