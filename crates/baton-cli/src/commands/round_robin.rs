//! `baton round-robin`: equal-priority tasks sharing the CPU in turn.

use super::{print_trace, Trace};
use crate::output::StyledOutput;
use baton::{Scheduler, SchedulerConfig, MAX_PRIORITY};

/// Run `tasks` workers at `priority` for `rounds` quanta each and return
/// the order in which they held the CPU
pub fn run(
    config: SchedulerConfig,
    tasks: usize,
    rounds: usize,
    priority: u32,
) -> anyhow::Result<Vec<String>> {
    anyhow::ensure!(
        priority < MAX_PRIORITY,
        "worker priority must be below {} so the spawner is never preempted",
        MAX_PRIORITY
    );

    let sched = Scheduler::with_config(config)?;
    let trace = Trace::default();
    let quantum = config.time_quantum;

    // The spawner outranks the workers, so all of them are queued before
    // the first one runs
    let (s, t) = (sched.clone(), trace.clone());
    sched.spawn(
        move |_| {
            for worker in 1..=tasks {
                let (s2, t2) = (s.clone(), t.clone());
                let spawned = s.spawn(
                    move |_| {
                        for round in 1..=rounds {
                            t2.push(format!("task {} round {}", worker, round));
                            for _ in 0..quantum {
                                if t2.check("yield", s2.yield_quantum()).is_none() {
                                    return;
                                }
                            }
                        }
                    },
                    priority,
                );
                if t.check("spawn", spawned).is_none() {
                    return;
                }
            }
        },
        MAX_PRIORITY,
    )?;

    sched.shutdown();
    Ok(trace.take())
}

pub fn execute(
    out: &mut StyledOutput,
    config: SchedulerConfig,
    tasks: usize,
    rounds: usize,
    priority: u32,
) -> anyhow::Result<()> {
    out.heading("Round robin");
    out.field("quantum", config.time_quantum);
    out.field("tasks", tasks);
    out.field("rounds", rounds);
    out.field("priority", priority);

    let steps = run(config, tasks, rounds, priority)?;
    print_trace(out, &steps);
    out.success("all tasks joined");
    Ok(())
}
