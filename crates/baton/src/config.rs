//! Scheduler configuration and its hard bounds

use serde::Deserialize;

/// Highest task priority; priorities range over `0..=MAX_PRIORITY`
pub const MAX_PRIORITY: u32 = 5;

/// Largest accepted time quantum
pub const MAX_TIME_QUANTUM: u32 = 32;

/// Largest accepted number of I/O devices
pub const MAX_DEVICES: usize = 256;

/// Upper bound for the configurable task capacity
pub const MAX_TASKS: usize = 4096;

/// Task capacity used when none is configured
pub const DEFAULT_MAX_TASKS: usize = 64;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Quantum of zero would never let a task run
    #[error("time quantum must be positive")]
    ZeroQuantum,

    /// Quantum above `MAX_TIME_QUANTUM`
    #[error("time quantum {quantum} exceeds maximum {max}")]
    QuantumTooLarge {
        /// Requested quantum
        quantum: u32,
        /// Accepted maximum
        max: u32,
    },

    /// Device count above `MAX_DEVICES`
    #[error("device count {count} exceeds maximum {max}")]
    TooManyDevices {
        /// Requested device count
        count: usize,
        /// Accepted maximum
        max: usize,
    },

    /// Task capacity of zero or above `MAX_TASKS`
    #[error("task capacity {capacity} outside 1..={max}")]
    TaskCapacity {
        /// Requested capacity
        capacity: usize,
        /// Accepted maximum
        max: usize,
    },
}

/// Scheduler configuration, fixed for the scheduler's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Scheduling ticks a task may consume before round robin considers rotating it
    pub time_quantum: u32,

    /// Valid device identifiers are `0..device_count`
    pub device_count: usize,

    /// Maximum number of tasks ever created by one scheduler instance
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,
}

fn default_max_tasks() -> usize {
    DEFAULT_MAX_TASKS
}

impl SchedulerConfig {
    /// Create a configuration with the default task capacity
    pub fn new(time_quantum: u32, device_count: usize) -> Self {
        Self {
            time_quantum,
            device_count,
            max_tasks: DEFAULT_MAX_TASKS,
        }
    }

    /// Override the task capacity
    pub fn with_max_tasks(self, max_tasks: usize) -> Self {
        Self { max_tasks, ..self }
    }

    /// Check every field against its bound
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_quantum == 0 {
            return Err(ConfigError::ZeroQuantum);
        }
        if self.time_quantum > MAX_TIME_QUANTUM {
            return Err(ConfigError::QuantumTooLarge {
                quantum: self.time_quantum,
                max: MAX_TIME_QUANTUM,
            });
        }
        if self.device_count > MAX_DEVICES {
            return Err(ConfigError::TooManyDevices {
                count: self.device_count,
                max: MAX_DEVICES,
            });
        }
        if self.max_tasks == 0 || self.max_tasks > MAX_TASKS {
            return Err(ConfigError::TaskCapacity {
                capacity: self.max_tasks,
                max: MAX_TASKS,
            });
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(4, 1)
    }
}
