//! Baton - Cooperative Priority Scheduler
//!
//! This crate multiplexes tasks onto backing OS threads while letting exactly
//! one task execute at a time:
//! - Strict priority, round robin within a priority level
//! - Quantum accounting driven by the tasks' own `yield_quantum` calls
//! - Blocking and waking on abstract I/O devices
//! - Explicit initialize/shutdown lifecycle with full thread teardown
//!
//! The CPU is the "baton": every scheduling point decides who holds it next
//! and hands it over through the holder's private gate.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod scheduler;

pub use config::{
    ConfigError, SchedulerConfig, DEFAULT_MAX_TASKS, MAX_DEVICES, MAX_PRIORITY, MAX_TASKS,
    MAX_TIME_QUANTUM,
};
pub use error::{SchedError, SchedResult};
pub use scheduler::{DeviceId, Priority, Scheduler, SchedulerStats, TaskId, TaskState};
