//! Gates and the handoff protocol
//!
//! A [`Gate`] is a binary suspension point owned by one task. It carries a
//! [`Wake`] message so a parked task learns whether it was given the CPU or
//! released for teardown. A [`Handoff`] is the dispatcher's decision for a
//! single scheduling point; performing it always opens the next gate before
//! the caller parks on its own.

use crate::scheduler::task::TaskId;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Message delivered through a gate
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Wake {
    /// The task now holds the CPU
    Run,
    /// The scheduler is tearing down; the task must wind down without blocking
    Drain,
}

/// Binary suspension primitive used exclusively for handoff
pub(crate) struct Gate {
    slot: Mutex<Option<Wake>>,
    cond: Condvar,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    /// Deposit a message, waking the owner if it is parked
    pub(crate) fn open(&self, wake: Wake) {
        let mut slot = self.slot.lock();
        debug_assert!(slot.is_none(), "gate opened twice without being passed");
        *slot = Some(wake);
        self.cond.notify_one();
    }

    /// Park until a message arrives, then consume it
    pub(crate) fn pass(&self) -> Wake {
        let mut slot = self.slot.lock();
        loop {
            if let Some(wake) = slot.take() {
                return wake;
            }
            self.cond.wait(&mut slot);
        }
    }

    /// Whether a message is waiting to be consumed
    #[cfg(test)]
    pub(crate) fn is_open(&self) -> bool {
        self.slot.lock().is_some()
    }
}

/// The task chosen to take the CPU
pub(crate) struct Pass {
    pub(crate) task: TaskId,
    gate: Arc<Gate>,
}

impl Pass {
    pub(crate) fn new(task: TaskId, gate: Arc<Gate>) -> Self {
        Self { task, gate }
    }
}

/// Outcome of one scheduling point
///
/// | variant  | opens       | caller parks |
/// |----------|-------------|--------------|
/// | `Stay`   | nothing     | no           |
/// | `Admit`  | `next`      | no           |
/// | `Switch` | `next`      | yes          |
/// | `Park`   | nothing     | yes          |
#[must_use]
pub(crate) enum Handoff {
    /// The caller keeps the CPU (or was never holding it and nothing changes)
    Stay,
    /// Another task takes the CPU; the caller does not hold it afterwards
    Admit(Pass),
    /// The caller gives the CPU to `next` and parks until resumed
    Switch {
        /// Task taking over
        next: Pass,
        /// Caller's own gate
        own: Arc<Gate>,
    },
    /// The caller gives up the CPU with no successor and parks
    Park {
        /// Caller's own gate
        own: Arc<Gate>,
    },
}

impl Handoff {
    /// Task receiving the CPU, if any
    #[cfg(test)]
    pub(crate) fn next(&self) -> Option<TaskId> {
        match self {
            Handoff::Admit(next) | Handoff::Switch { next, .. } => Some(next.task),
            Handoff::Stay | Handoff::Park { .. } => None,
        }
    }

    /// Whether the caller parks
    #[cfg(test)]
    pub(crate) fn parks(&self) -> bool {
        matches!(self, Handoff::Switch { .. } | Handoff::Park { .. })
    }

    /// Carry out the transition. Must be called without holding scheduler state.
    ///
    /// Returns the message that resumed the caller, or `Wake::Run` when the
    /// caller does not park.
    pub(crate) fn perform(self) -> Wake {
        match self {
            Handoff::Stay => Wake::Run,
            Handoff::Admit(next) => {
                log::trace!("handoff to task {}", next.task);
                next.gate.open(Wake::Run);
                Wake::Run
            }
            Handoff::Switch { next, own } => {
                log::trace!("handoff to task {}", next.task);
                next.gate.open(Wake::Run);
                own.pass()
            }
            Handoff::Park { own } => own.pass(),
        }
    }
}
