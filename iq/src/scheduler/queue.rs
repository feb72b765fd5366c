//! Priority queue of pending batches

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::debug;

/// A pending batch, ordered for dispatch
///
/// Does not own the batch; it only carries what ordering needs.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub priority_rank: u8,
    pub created_at: i64,
    pub batch_id: String,
    /// Insertion sequence, breaks exact (rank, created_at) ties
    seq: u64,
}

impl Eq for QueueEntry {}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: the entry that should run first compares greatest.
        // Lower rank first, then earlier submission, then earlier insertion.
        other
            .priority_rank
            .cmp(&self.priority_rank)
            .then_with(|| other.created_at.cmp(&self.created_at))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending-work queue over batches
///
/// `push` and `pop` are O(log n). `pop` never blocks; callers decide how to wait.
#[derive(Debug, Default)]
pub struct BatchQueue {
    heap: BinaryHeap<QueueEntry>,
    next_seq: u64,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a batch
    pub fn push(&mut self, priority_rank: u8, created_at: i64, batch_id: impl Into<String>) {
        let entry = QueueEntry {
            priority_rank,
            created_at,
            batch_id: batch_id.into(),
            seq: self.next_seq,
        };
        debug!(batch_id = %entry.batch_id, priority_rank, created_at, seq = entry.seq, "BatchQueue::push: called");
        self.next_seq += 1;
        self.heap.push(entry);
    }

    /// Remove and return the entry that should run next, if any
    pub fn pop(&mut self) -> Option<QueueEntry> {
        let entry = self.heap.pop();
        debug!(batch_id = ?entry.as_ref().map(|e| &e.batch_id), remaining = self.heap.len(), "BatchQueue::pop: called");
        entry
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
