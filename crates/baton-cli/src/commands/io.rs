//! `baton io`: tasks block on a device until a lower-priority task signals it.

use super::{print_trace, Trace};
use crate::output::StyledOutput;
use baton::{Scheduler, SchedulerConfig};

const WAITER_PRIORITY: u32 = 2;
const SIGNALLER_PRIORITY: u32 = 1;

/// Run the workload and return its trace
pub fn run(config: SchedulerConfig, waiters: usize, device: usize) -> anyhow::Result<Vec<String>> {
    anyhow::ensure!(
        device < config.device_count,
        "device {} out of range (config has {} devices)",
        device,
        config.device_count
    );

    let sched = Scheduler::with_config(config)?;
    let trace = Trace::default();

    // Each waiter outranks the signaller, so it runs as soon as it is
    // spawned and blocks before the next one is created
    let (s, t) = (sched.clone(), trace.clone());
    sched.spawn(
        move |_| {
            for waiter in 1..=waiters {
                let (s2, t2) = (s.clone(), t.clone());
                let spawned = s.spawn(
                    move |_| {
                        t2.push(format!("waiter {} blocks on device {}", waiter, device));
                        if t2.check("wait", s2.wait(device)).is_some() {
                            t2.push(format!("waiter {} woken", waiter));
                        }
                    },
                    WAITER_PRIORITY,
                );
                if t.check("spawn", spawned).is_none() {
                    return;
                }
            }

            t.push(format!("signalling device {}", device));
            if let Some(woken) = t.check("signal", s.signal(device)) {
                t.push(format!("signal woke {} task(s)", woken));
            }
        },
        SIGNALLER_PRIORITY,
    )?;

    sched.shutdown();
    Ok(trace.take())
}

pub fn execute(
    out: &mut StyledOutput,
    config: SchedulerConfig,
    waiters: usize,
    device: usize,
) -> anyhow::Result<()> {
    out.heading("Device wait/signal");
    out.field("devices", config.device_count);
    out.field("waiters", waiters);

    let steps = run(config, waiters, device)?;
    print_trace(out, &steps);
    out.success("all tasks joined");
    Ok(())
}
