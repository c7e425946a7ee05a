//! Delayed tasks keyed by wall-clock time
//!
//! A min-heap ordered by due time; equal due times run in scheduling order.
//! The frame loop drains it once per frame, so a task runs on the first frame
//! at or after its due time.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Scheduled<T> {
    due_ms: f64,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    // Reversed: BinaryHeap is a max-heap, we want the earliest task on top
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_ms
            .total_cmp(&self.due_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Queue of tasks waiting for a wall-clock deadline
pub struct DelayedTasks<T> {
    heap: BinaryHeap<Scheduled<T>>,
    next_seq: u64,
}

impl<T> Default for DelayedTasks<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T> DelayedTasks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to become due at `due_ms`
    pub fn schedule(&mut self, due_ms: f64, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { due_ms, seq, task });
    }

    /// Pop the earliest task if it is due at `now_ms`
    pub fn pop_due(&mut self, now_ms: f64) -> Option<T> {
        if self.heap.peek()?.due_ms > now_ms {
            return None;
        }
        self.heap.pop().map(|s| s.task)
    }

    /// Due time of the earliest pending task
    pub fn next_due(&self) -> Option<f64> {
        self.heap.peek().map(|s| s.due_ms)
    }

    /// Drop every pending task
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
