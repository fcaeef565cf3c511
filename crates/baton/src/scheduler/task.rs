//! Task control block and task identity

use crate::scheduler::gate::Gate;
use std::fmt;
use std::sync::Arc;

/// Task priority; higher runs first
pub type Priority = u32;

/// I/O device identifier
pub type DeviceId = usize;

/// Unique identifier for a Task
///
/// Ids are handed out by the scheduler in creation order starting at 1.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Create a TaskId from a u64 value
    pub fn from_u64(id: u64) -> Self {
        TaskId(id)
    }

    /// Get the numeric ID value
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Position of this task in the scheduler's task table
    pub(crate) fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State of a Task
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Runnable, queued for the CPU
    Ready,
    /// Holding the CPU
    Running,
    /// Blocked on an I/O device
    Waiting,
    /// Entry function returned
    Terminated,
}

impl TaskState {
    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Ready, Running)
                | (Running, Ready)
                | (Running, Waiting)
                | (Running, Terminated)
                | (Waiting, Ready)
        )
    }
}

/// Per-task scheduling state
///
/// Only the dispatcher mutates a control block, and only while the owning
/// task sits in exactly one of: the ready queue, a wait set, the running slot.
pub(crate) struct TaskControlBlock {
    id: TaskId,
    priority: Priority,
    quantum_remaining: u32,
    state: TaskState,
    /// Private suspension primitive, used for handoff only
    gate: Arc<Gate>,
}

impl TaskControlBlock {
    pub(crate) fn new(id: TaskId, priority: Priority, quantum: u32, gate: Arc<Gate>) -> Self {
        Self {
            id,
            priority,
            quantum_remaining: quantum,
            state: TaskState::Ready,
            gate,
        }
    }

    pub(crate) fn priority(&self) -> Priority {
        self.priority
    }

    pub(crate) fn state(&self) -> TaskState {
        self.state
    }

    pub(crate) fn quantum_remaining(&self) -> u32 {
        self.quantum_remaining
    }

    pub(crate) fn gate(&self) -> &Arc<Gate> {
        &self.gate
    }

    pub(crate) fn set_state(&mut self, next: TaskState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "task {} cannot go from {:?} to {:?}",
            self.id,
            self.state,
            next
        );
        self.state = next;
    }

    pub(crate) fn refill(&mut self, quantum: u32) {
        self.quantum_remaining = quantum;
    }

    /// Consume one tick; returns true once the quantum is used up
    pub(crate) fn charge(&mut self) -> bool {
        self.quantum_remaining = self.quantum_remaining.saturating_sub(1);
        self.quantum_remaining == 0
    }
}
