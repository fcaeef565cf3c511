//! CLI subcommands

pub mod check;
pub mod demo;
pub mod io;
pub mod round_robin;

use baton::SchedResult;
use parking_lot::Mutex;
use std::sync::Arc;

/// Ordered record of what tasks did; with one task active at a time the
/// order of entries is the dispatch order
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    /// Record a failed scheduling call from inside a task
    pub fn check<T>(&self, what: &str, result: SchedResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                log::error!("{} failed: {}", what, err);
                self.push(format!("{} failed: {}", what, err));
                None
            }
        }
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}

fn print_trace(out: &mut crate::output::StyledOutput, steps: &[String]) {
    for (index, step) in steps.iter().enumerate() {
        out.step(index + 1, step);
    }
}
