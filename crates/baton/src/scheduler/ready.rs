//! Ready queue ordered by priority, then arrival

use crate::scheduler::task::{Priority, TaskId};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Entry in the ready heap
#[derive(Debug, Clone, Copy)]
struct ReadyEntry {
    priority: Priority,
    /// Arrival sequence number; earlier arrivals win ties
    seq: u64,
    task: TaskId,
}

// Max-heap: higher priority first, then lower sequence number
impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ReadyEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for ReadyEntry {}

/// Runnable tasks, highest priority first and FIFO within a priority level
#[derive(Debug, Default)]
pub(crate) struct ReadyQueue {
    heap: BinaryHeap<ReadyEntry>,
    next_seq: u64,
}

impl ReadyQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a task behind every ready task of equal or higher priority
    pub(crate) fn push(&mut self, task: TaskId, priority: Priority) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ReadyEntry {
            priority,
            seq,
            task,
        });
    }

    pub(crate) fn pop(&mut self) -> Option<TaskId> {
        self.heap.pop().map(|entry| entry.task)
    }

    /// Head of the queue with its priority
    pub(crate) fn peek(&self) -> Option<(TaskId, Priority)> {
        self.heap.peek().map(|entry| (entry.task, entry.priority))
    }

    pub(crate) fn peek_priority(&self) -> Option<Priority> {
        self.heap.peek().map(|entry| entry.priority)
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Remove every task, in dispatch order
    pub(crate) fn drain_ordered(&mut self) -> Vec<TaskId> {
        let mut entries = std::mem::take(&mut self.heap).into_sorted_vec();
        entries.reverse();
        entries.into_iter().map(|entry| entry.task).collect()
    }
}
