//! Bounded history of completed recovery attempts.

use std::collections::VecDeque;

use revive_core::RecoveryAttempt;

/// Maximum number of completed attempts retained across all components.
pub const HISTORY_CAPACITY: usize = 1000;

/// How many of the most recent entries a status lookup searches.
pub const STATUS_LOOKBACK: usize = 50;

/// FIFO of completed attempts; the oldest entry is evicted first.
#[derive(Debug)]
pub struct AttemptHistory {
    entries: VecDeque<RecoveryAttempt>,
    capacity: usize,
}

impl Default for AttemptHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl AttemptHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(HISTORY_CAPACITY)),
            capacity,
        }
    }

    /// Append an attempt, returning the evicted entry if the history was full.
    pub fn push(&mut self, attempt: RecoveryAttempt) -> Option<RecoveryAttempt> {
        if self.capacity == 0 {
            return Some(attempt);
        }
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(attempt);
        evicted
    }

    /// Latest attempt for `component_id` among the last `lookback` entries.
    pub fn latest_for(&self, component_id: &str, lookback: usize) -> Option<&RecoveryAttempt> {
        self.entries
            .iter()
            .rev()
            .take(lookback)
            .find(|a| a.component_id == component_id)
    }

    /// Newest-first iterator over at most `limit` entries.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &RecoveryAttempt> {
        self.entries.iter().rev().take(limit)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
