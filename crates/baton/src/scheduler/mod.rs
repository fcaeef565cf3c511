//! Task Scheduler - One Baton, Many Threads
//!
//! Every task owns a backing OS thread parked on a private gate. The
//! dispatcher decides at each scheduling point which task holds the CPU and
//! hands it over through a `Handoff`: the next gate opens
//! before the caller parks on its own.

mod dispatch;
mod gate;
mod ready;
#[allow(clippy::module_inception)]
mod scheduler;
mod task;
mod wait;

pub use dispatch::SchedulerStats;
pub use scheduler::Scheduler;
pub use task::{DeviceId, Priority, TaskId, TaskState};
