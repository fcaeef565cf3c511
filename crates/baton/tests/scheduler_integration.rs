//! Integration tests for the cooperative scheduler
//!
//! Task bodies append to a shared trace; since only one task runs at a time
//! the trace order is the dispatch order.

use baton::{SchedError, Scheduler, SchedulerConfig, TaskState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Clone, Default)]
struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}

fn scheduler(quantum: u32, devices: usize) -> Scheduler {
    let scheduler = Scheduler::new();
    scheduler.initialize(quantum, devices).unwrap();
    scheduler
}

#[test]
fn test_first_task_runs_and_completes() {
    let sched = scheduler(2, 1);
    let trace = Trace::default();

    let t = trace.clone();
    sched.spawn(move |p| t.push(format!("ran at {}", p)), 3).unwrap();

    sched.shutdown();
    assert_eq!(trace.take(), vec!["ran at 3"]);
    assert!(!sched.is_initialized());
}

#[test]
fn test_higher_priority_spawn_runs_before_spawner_resumes() {
    let sched = scheduler(4, 1);
    let trace = Trace::default();

    let (s, t) = (sched.clone(), trace.clone());
    sched
        .spawn(
            move |_| {
                t.push("low:start");
                let t2 = t.clone();
                s.spawn(move |_| t2.push("high:run"), 4).unwrap();
                t.push("low:resumed");
            },
            1,
        )
        .unwrap();

    sched.shutdown();
    assert_eq!(trace.take(), vec!["low:start", "high:run", "low:resumed"]);
}

#[test]
fn test_equal_priority_spawn_is_queued() {
    let sched = scheduler(4, 1);
    let trace = Trace::default();

    let (s, t) = (sched.clone(), trace.clone());
    sched
        .spawn(
            move |_| {
                t.push("a:start");
                let t2 = t.clone();
                let b = s.spawn(move |_| t2.push("b:run"), 2).unwrap();
                t.push("a:after-spawn");
                t.push(format!("b is {:?}", s.task_state(b).unwrap()));
            },
            2,
        )
        .unwrap();

    sched.shutdown();
    assert_eq!(
        trace.take(),
        vec!["a:start", "a:after-spawn", "b is Ready", "b:run"]
    );
}

#[test]
fn test_round_robin_circular_order() {
    const QUANTUM: u32 = 2;
    const ROUNDS: usize = 3;

    let sched = scheduler(QUANTUM, 1);
    let trace = Trace::default();

    let (s, t) = (sched.clone(), trace.clone());
    sched
        .spawn(
            move |_| {
                for name in ["w1", "w2", "w3"] {
                    let (s2, t2) = (s.clone(), t.clone());
                    s.spawn(
                        move |_| {
                            for _ in 0..ROUNDS {
                                t2.push(name);
                                for _ in 0..QUANTUM {
                                    s2.yield_quantum().unwrap();
                                }
                            }
                        },
                        3,
                    )
                    .unwrap();
                }
            },
            5,
        )
        .unwrap();

    sched.shutdown();
    assert_eq!(
        trace.take(),
        vec!["w1", "w2", "w3", "w1", "w2", "w3", "w1", "w2", "w3"]
    );
}

#[test]
fn test_end_to_end_two_peers_and_a_lower_task() {
    let sched = scheduler(2, 1);
    let trace = Trace::default();

    let worker = |name: &'static str, s: Scheduler, t: Trace| {
        move |_: u32| {
            for _ in 0..4 {
                t.push(name);
                s.yield_quantum().unwrap();
            }
        }
    };

    let (s, t) = (sched.clone(), trace.clone());
    sched
        .spawn(
            move |_| {
                t.push("A:start");
                s.spawn(worker("B", s.clone(), t.clone()), 5).unwrap();
                let t3 = t.clone();
                s.spawn(move |_| t3.push("C"), 3).unwrap();
                worker("A", s.clone(), t.clone())(5);
            },
            5,
        )
        .unwrap();

    sched.shutdown();
    assert_eq!(
        trace.take(),
        vec!["A:start", "B", "B", "A", "A", "B", "B", "A", "A", "C"]
    );
}

#[test]
fn test_wait_and_signal_wake_in_blocking_order() {
    let sched = scheduler(2, 2);
    let trace = Trace::default();

    let (s, t) = (sched.clone(), trace.clone());
    sched
        .spawn(
            move |_| {
                let mut waiters = Vec::new();
                for name in ["w1", "w2"] {
                    let (s2, t2) = (s.clone(), t.clone());
                    let id = s
                        .spawn(
                            move |_| {
                                t2.push(format!("{}:wait", name));
                                s2.wait(0).unwrap();
                                t2.push(format!("{}:woken", name));
                            },
                            3,
                        )
                        .unwrap();
                    waiters.push(id);
                }

                // Ticking never wakes a waiter
                for _ in 0..5 {
                    s.yield_quantum().unwrap();
                }
                for id in &waiters {
                    assert_eq!(s.task_state(*id), Some(TaskState::Waiting));
                }

                t.push(format!("other device woke {}", s.signal(1).unwrap()));
                let woken = s.signal(0).unwrap();
                t.push(format!("device 0 woke {}", woken));
                t.push(format!("again woke {}", s.signal(0).unwrap()));
            },
            2,
        )
        .unwrap();

    sched.shutdown();
    assert_eq!(
        trace.take(),
        vec![
            "w1:wait",
            "w2:wait",
            "other device woke 0",
            "w1:woken",
            "w2:woken",
            "device 0 woke 2",
            "again woke 0",
        ]
    );
}

#[test]
fn test_signal_of_lower_priority_waiter_keeps_signaller_running() {
    let sched = scheduler(8, 2);
    let trace = Trace::default();

    let (s, t) = (sched.clone(), trace.clone());
    sched
        .spawn(
            move |_| {
                let (s2, t2) = (s.clone(), t.clone());
                s.spawn(
                    move |_| {
                        t2.push("low:wait");
                        s2.wait(0).unwrap();
                        t2.push("low:woken");
                    },
                    1,
                )
                .unwrap();

                // Give the CPU to the low task until an outside event arrives
                s.wait(1).unwrap();
                let woken = s.signal(0).unwrap();
                t.push(format!("high:signalled {}", woken));
            },
            3,
        )
        .unwrap();

    wait_until(|| sched.stats().is_some_and(|s| s.waiting == 2));
    assert_eq!(sched.signal(1).unwrap(), 1);

    sched.shutdown();
    assert_eq!(
        trace.take(),
        vec!["low:wait", "high:signalled 1", "low:woken"]
    );
}

#[test]
fn test_external_signal_admits_waiter_on_idle_cpu() {
    let sched = scheduler(2, 1);
    let trace = Trace::default();

    let (s, t) = (sched.clone(), trace.clone());
    let task = sched
        .spawn(
            move |_| {
                t.push("waiting");
                s.wait(0).unwrap();
                t.push("woken");
            },
            1,
        )
        .unwrap();

    wait_until(|| sched.task_state(task) == Some(TaskState::Waiting));
    assert_eq!(sched.stats().unwrap().running, None);
    assert_eq!(sched.signal(0).unwrap(), 1);

    sched.shutdown();
    assert_eq!(trace.take(), vec!["waiting", "woken"]);
}

#[test]
fn test_external_spawn_preempts_at_next_tick() {
    let sched = scheduler(4, 1);
    let trace = Trace::default();
    let spawned = Arc::new(AtomicBool::new(false));

    let (s, t, flag) = (sched.clone(), trace.clone(), Arc::clone(&spawned));
    sched
        .spawn(
            move |_| {
                t.push("low:start");
                while !flag.load(Ordering::Acquire) {
                    thread::yield_now();
                }
                t.push("low:tick");
                s.yield_quantum().unwrap();
                t.push("low:resumed");
            },
            1,
        )
        .unwrap();

    let t = trace.clone();
    sched.spawn(move |_| t.push("high:run"), 4).unwrap();
    spawned.store(true, Ordering::Release);

    sched.shutdown();
    assert_eq!(
        trace.take(),
        vec!["low:start", "low:tick", "high:run", "low:resumed"]
    );
}

/// Low task blocks on `released`, then runs `point` once `main` has queued
/// a higher-priority task behind it
fn external_spawn_then(point: fn(&Scheduler)) -> Vec<String> {
    let sched = scheduler(4, 1);
    let trace = Trace::default();
    let released = Arc::new(AtomicBool::new(false));

    let (s, t, flag) = (sched.clone(), trace.clone(), Arc::clone(&released));
    sched
        .spawn(
            move |_| {
                t.push("low:start");
                while !flag.load(Ordering::Acquire) {
                    thread::yield_now();
                }
                point(&s);
                t.push("low:resumed");
            },
            1,
        )
        .unwrap();

    let t = trace.clone();
    sched.spawn(move |_| t.push("high:run"), 4).unwrap();
    released.store(true, Ordering::Release);

    sched.shutdown();
    trace.take()
}

#[test]
fn test_external_spawn_preempts_at_next_signal() {
    let trace = external_spawn_then(|s| {
        assert_eq!(s.signal(0).unwrap(), 0);
    });
    assert_eq!(trace, vec!["low:start", "high:run", "low:resumed"]);
}

#[test]
fn test_external_spawn_preempts_at_next_spawn() {
    let trace = external_spawn_then(|s| {
        s.spawn(|_| {}, 0).unwrap();
    });
    assert_eq!(trace, vec!["low:start", "high:run", "low:resumed"]);
}

#[test]
fn test_mutual_exclusion_under_mixed_load() {
    let sched = scheduler(3, 2);
    let inside = Arc::new(AtomicBool::new(false));
    let violations = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));

    let enter = {
        let (inside, violations) = (Arc::clone(&inside), Arc::clone(&violations));
        move || {
            if inside.swap(true, Ordering::SeqCst) {
                violations.fetch_add(1, Ordering::SeqCst);
            }
            thread::sleep(Duration::from_micros(50));
        }
    };
    let leave = {
        let inside = Arc::clone(&inside);
        move || inside.store(false, Ordering::SeqCst)
    };

    let s = sched.clone();
    let (root_enter, root_leave, root_finished) = (enter.clone(), leave.clone(), Arc::clone(&finished));
    sched
        .spawn(
            move |_| {
                root_enter();
                for i in 0..8u32 {
                    let (s2, e, l, f) = (s.clone(), enter.clone(), leave.clone(), Arc::clone(&root_finished));
                    root_leave();
                    s.spawn(
                        move |_| {
                            e();
                            for step in 0..10 {
                                l();
                                if i % 4 == 0 && step == 3 {
                                    let _ = s2.signal(0);
                                } else {
                                    s2.yield_quantum().unwrap();
                                }
                                e();
                            }
                            l();
                            f.fetch_add(1, Ordering::SeqCst);
                        },
                        1 + i % 3,
                    )
                    .unwrap();
                    root_enter();
                }
                root_leave();
                root_finished.fetch_add(1, Ordering::SeqCst);
            },
            2,
        )
        .unwrap();

    sched.shutdown();
    assert_eq!(violations.load(Ordering::SeqCst), 0);
    assert_eq!(finished.load(Ordering::SeqCst), 9);
}

#[test]
fn test_spawn_rejections_leave_state_unchanged() {
    let sched = Scheduler::with_config(SchedulerConfig::new(2, 1).with_max_tasks(2)).unwrap();

    assert!(matches!(
        sched.spawn(|_| {}, baton::MAX_PRIORITY + 1),
        Err(SchedError::InvalidPriority { .. })
    ));
    assert_eq!(sched.stats().unwrap().tasks_spawned, 0);

    sched.spawn(|_| {}, 0).unwrap();
    sched.spawn(|_| {}, baton::MAX_PRIORITY).unwrap();
    assert!(matches!(
        sched.spawn(|_| {}, 0),
        Err(SchedError::CapacityExceeded { max: 2 })
    ));
    assert_eq!(sched.stats().unwrap().tasks_spawned, 2);

    sched.shutdown();
}

#[test]
fn test_invalid_device_from_task() {
    let sched = scheduler(2, 1);
    let result = Arc::new(Mutex::new(None));

    let (s, r) = (sched.clone(), Arc::clone(&result));
    sched
        .spawn(
            move |_| {
                let wait = s.wait(1).map_err(|e| e.to_string());
                let signal = s.signal(7).map_err(|e| e.to_string());
                *r.lock() = Some((wait, signal));
            },
            1,
        )
        .unwrap();

    sched.shutdown();
    let (wait, signal) = result.lock().take().unwrap();
    assert_eq!(wait, Err("invalid device 1 (scheduler has 1 devices)".to_string()));
    assert_eq!(signal, Err("invalid device 7 (scheduler has 1 devices)".to_string()));
}

#[test]
fn test_panicking_task_hands_cpu_on() {
    let sched = scheduler(2, 1);
    let trace = Trace::default();

    let (s, t) = (sched.clone(), trace.clone());
    sched
        .spawn(
            move |_| {
                s.spawn(|_| panic!("task failure"), 1).unwrap();
                let t2 = t.clone();
                s.spawn(move |_| t2.push("survivor"), 1).unwrap();
            },
            5,
        )
        .unwrap();

    sched.shutdown();
    assert_eq!(trace.take(), vec!["survivor"]);
}

#[test]
fn test_stats_after_run() {
    let sched = scheduler(1, 1);
    let stats = Arc::new(Mutex::new(None));

    let (s, out) = (sched.clone(), Arc::clone(&stats));
    sched
        .spawn(
            move |_| {
                s.spawn(|_| {}, 0).unwrap();
                s.spawn(|_| {}, 0).unwrap();
                *out.lock() = s.stats();
            },
            3,
        )
        .unwrap();

    sched.shutdown();
    let stats = stats.lock().take().unwrap();
    assert_eq!(stats.tasks_spawned, 3);
    assert_eq!(stats.tasks_completed, 0);
    assert_eq!(stats.ready, 2);
    assert_eq!(stats.running, Some(baton::TaskId::from_u64(1)));
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..2000 {
        if condition() {
            return;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("condition not reached");
}
