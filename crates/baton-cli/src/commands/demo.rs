//! `baton demo`: two peers at priority 5 and a lower task at priority 3.
//!
//! A runs first, B queues behind it, the peers alternate every quantum and
//! C only runs once both have finished.

use super::{print_trace, Trace};
use crate::output::StyledOutput;
use baton::{Scheduler, SchedulerConfig};

const PEER_PRIORITY: u32 = 5;
const LOW_PRIORITY: u32 = 3;

fn peer(
    name: &'static str,
    sched: Scheduler,
    trace: Trace,
    units: u32,
) -> impl FnOnce(u32) + Send + 'static {
    move |_| {
        for unit in 1..=units {
            trace.push(format!("{} unit {}", name, unit));
            if trace.check("yield", sched.yield_quantum()).is_none() {
                return;
            }
        }
        trace.push(format!("{} done", name));
    }
}

/// Run the workload and return its trace
pub fn run(config: SchedulerConfig) -> anyhow::Result<Vec<String>> {
    let sched = Scheduler::with_config(config)?;
    let trace = Trace::default();
    let units = config.time_quantum * 2;

    let (s, t) = (sched.clone(), trace.clone());
    sched.spawn(
        move |priority| {
            t.push("A start");
            let b = peer("B", s.clone(), t.clone(), units);
            t.check("spawn B", s.spawn(b, PEER_PRIORITY));
            let low = t.clone();
            t.check("spawn C", s.spawn(move |_| low.push("C runs"), LOW_PRIORITY));
            peer("A", s.clone(), t.clone(), units)(priority);
        },
        PEER_PRIORITY,
    )?;

    sched.shutdown();
    Ok(trace.take())
}

pub fn execute(out: &mut StyledOutput, config: SchedulerConfig) -> anyhow::Result<()> {
    out.heading("Priority and round-robin demo");
    out.field("quantum", config.time_quantum);
    out.field("tasks", "A(5) B(5) C(3)");

    let steps = run(config)?;
    print_trace(out, &steps);
    out.success("all tasks joined");
    Ok(())
}
