//! Scheduler errors

use crate::config::ConfigError;
use crate::scheduler::{DeviceId, Priority};

/// Errors reported by scheduler operations
///
/// Every error is detected before any queue is touched, so a failed call
/// leaves the scheduler exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum SchedError {
    /// Operation called before `initialize` or after `shutdown`
    #[error("no scheduler: call initialize first")]
    NoScheduler,

    /// `initialize` called while a scheduler already exists
    #[error("scheduler already initialized")]
    AlreadyInitialized,

    /// Rejected configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Priority above `MAX_PRIORITY`
    #[error("invalid priority {priority} (maximum {max})")]
    InvalidPriority {
        /// Requested priority
        priority: Priority,
        /// Accepted maximum
        max: Priority,
    },

    /// Device identifier outside `0..device_count`
    #[error("invalid device {device} (scheduler has {count} devices)")]
    InvalidDevice {
        /// Requested device
        device: DeviceId,
        /// Configured device count
        count: usize,
    },

    /// Task capacity exhausted
    #[error("task capacity of {max} reached")]
    CapacityExceeded {
        /// Configured capacity
        max: usize,
    },

    /// Operation needs the calling thread to be the running task
    #[error("calling thread is not the running task")]
    NotATask,

    /// Scheduler is draining its tasks during shutdown
    #[error("scheduler is shutting down")]
    ShuttingDown,

    /// Backing OS thread could not be created
    #[error("failed to start task thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// Scheduler operation result
pub type SchedResult<T> = Result<T, SchedError>;
