//! Scheduler handle: lifecycle, task threads and scheduling points

use crate::config::SchedulerConfig;
use crate::error::{SchedError, SchedResult};
use crate::scheduler::dispatch::{SchedState, SchedulerStats};
use crate::scheduler::gate::{Gate, Handoff, Wake};
use crate::scheduler::task::{DeviceId, Priority, TaskId, TaskState};
use parking_lot::{Condvar, Mutex};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};

/// Backing OS thread of a task together with its gate
///
/// Consumed exactly once during teardown, which guarantees the gate is
/// opened at most once for draining and the thread is joined exactly once.
struct TaskThread {
    task: TaskId,
    gate: Arc<Gate>,
    handle: JoinHandle<()>,
}

impl TaskThread {
    /// Release a task still parked on its gate, then wait for its thread
    fn drain(self) {
        self.gate.open(Wake::Drain);
        self.join();
    }

    fn join(self) {
        if self.handle.join().is_err() {
            log::warn!("task {} panicked", self.task);
        }
    }
}

/// Scheduler state that exists between `initialize` and `shutdown`
struct Runtime {
    sched: SchedState,
    /// Indexed like the task table; emptied when teardown starts
    threads: Vec<TaskThread>,
    /// Backing thread ids, indexed like the task table and kept until teardown ends
    thread_ids: Vec<ThreadId>,
    /// Set once teardown has started releasing blocked tasks
    draining: bool,
}

impl Runtime {
    fn new(config: SchedulerConfig) -> Self {
        Self {
            sched: SchedState::new(config),
            threads: Vec::new(),
            thread_ids: Vec::new(),
            draining: false,
        }
    }

    /// Reject calls once teardown has begun
    fn live(&mut self) -> SchedResult<&mut SchedState> {
        if self.draining {
            return Err(SchedError::ShuttingDown);
        }
        Ok(&mut self.sched)
    }

    /// Task id of the calling thread, if it is the running task
    fn caller(&self) -> Option<TaskId> {
        let running = self.sched.running()?;
        let thread = self.thread_ids.get(running.index())?;
        (*thread == thread::current().id()).then_some(running)
    }

    fn is_task_thread(&self) -> bool {
        self.thread_ids.contains(&thread::current().id())
    }
}

struct Inner {
    state: Mutex<Option<Runtime>>,
    /// Signalled whenever the CPU goes idle or the state is torn down
    idle: Condvar,
}

impl Inner {
    /// Completion path of a task whose entry returned (or panicked)
    fn complete(&self, task: TaskId) {
        let handoff = {
            let mut guard = self.state.lock();
            let Some(rt) = guard.as_mut() else {
                return;
            };
            if rt.draining {
                return;
            }
            let handoff = rt.sched.finish(task);
            if rt.sched.is_idle() {
                self.idle.notify_all();
            }
            handoff
        };
        let _ = handoff.perform();
    }
}

/// Runs the completion path when the task's entry returns or unwinds
struct Completion {
    inner: Weak<Inner>,
    task: TaskId,
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.complete(self.task);
        }
    }
}

/// Cooperative priority scheduler
///
/// A cheap, cloneable handle; task bodies capture a clone to reach the
/// scheduling points (`spawn`, `yield_quantum`, `wait`, `signal`). Exactly
/// one task executes application code at a time.
///
/// ```ignore
/// let sched = Scheduler::new();
/// sched.initialize(2, 1)?;
/// let handle = sched.clone();
/// sched.spawn(move |_| {
///     handle.yield_quantum().ok();
/// }, 3)?;
/// sched.shutdown();
/// ```
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Create a handle with no scheduler state; call `initialize` next
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(None),
                idle: Condvar::new(),
            }),
        }
    }

    /// Create and initialize a scheduler
    pub fn with_config(config: SchedulerConfig) -> SchedResult<Self> {
        let scheduler = Self::new();
        scheduler.initialize_with(config)?;
        Ok(scheduler)
    }

    /// Initialize with the default task capacity
    pub fn initialize(&self, time_quantum: u32, device_count: usize) -> SchedResult<()> {
        self.initialize_with(SchedulerConfig::new(time_quantum, device_count))
    }

    /// Initialize from a full configuration
    pub fn initialize_with(&self, config: SchedulerConfig) -> SchedResult<()> {
        let mut guard = self.inner.state.lock();
        if guard.is_some() {
            return Err(SchedError::AlreadyInitialized);
        }
        config.validate()?;

        *guard = Some(Runtime::new(config));
        log::debug!(
            "scheduler initialized: quantum={}, devices={}, max_tasks={}",
            config.time_quantum,
            config.device_count,
            config.max_tasks
        );
        Ok(())
    }

    /// Whether scheduler state currently exists
    pub fn is_initialized(&self) -> bool {
        self.inner.state.lock().is_some()
    }

    /// Active configuration
    pub fn config(&self) -> Option<SchedulerConfig> {
        self.inner.state.lock().as_ref().map(|rt| *rt.sched.config())
    }

    /// Create a task running `entry(priority)` on its own thread.
    ///
    /// The task executes only once the dispatcher admits it. When the caller
    /// is the running task and the new task has strictly higher priority, the
    /// caller is suspended here until it is scheduled again.
    pub fn spawn<F>(&self, entry: F, priority: Priority) -> SchedResult<TaskId>
    where
        F: FnOnce(Priority) + Send + 'static,
    {
        let (task, handoff) = {
            let mut guard = self.inner.state.lock();
            let rt = guard.as_mut().ok_or(SchedError::NoScheduler)?;
            let from_running = rt.caller().is_some();
            let sched = rt.live()?;
            sched.check_spawn(priority)?;

            let id = sched.next_id();
            let gate = Arc::new(Gate::new());
            let handle = self.start_thread(id, priority, Arc::clone(&gate), entry)?;

            let (task, handoff) = sched.spawn(priority, Arc::clone(&gate), from_running);
            debug_assert_eq!(task, id);
            rt.thread_ids.push(handle.thread().id());
            rt.threads.push(TaskThread { task, gate, handle });
            (task, handoff)
        };

        // Drained while suspended: the task exists, the caller learns of
        // shutdown at its next scheduling point
        let _ = handoff.perform();
        Ok(task)
    }

    /// Consume one unit of the running task's quantum, rotating to an equal
    /// or higher priority peer when the quantum runs out
    pub fn yield_quantum(&self) -> SchedResult<()> {
        let handoff = {
            let mut guard = self.inner.state.lock();
            let rt = guard.as_mut().ok_or(SchedError::NoScheduler)?;
            if rt.caller().is_none() {
                rt.live()?;
                return Err(SchedError::NotATask);
            }
            rt.live()?.tick()
        };
        Self::resume(handoff)
    }

    /// Block the running task until `device` is signalled
    pub fn wait(&self, device: DeviceId) -> SchedResult<()> {
        let handoff = {
            let mut guard = self.inner.state.lock();
            let rt = guard.as_mut().ok_or(SchedError::NoScheduler)?;
            let is_running = rt.caller().is_some();
            let sched = rt.live()?;
            sched.check_device(device)?;
            if !is_running {
                return Err(SchedError::NotATask);
            }

            let handoff = sched.block(device);
            if sched.is_idle() {
                self.inner.idle.notify_all();
            }
            handoff
        };
        Self::resume(handoff)
    }

    /// Wake every task waiting on `device`, returning how many were woken.
    ///
    /// May be called from outside any task (an event source). A running
    /// caller is preempted when a woken task has strictly higher priority.
    pub fn signal(&self, device: DeviceId) -> SchedResult<usize> {
        let (count, handoff) = {
            let mut guard = self.inner.state.lock();
            let rt = guard.as_mut().ok_or(SchedError::NoScheduler)?;
            let from_running = rt.caller().is_some();
            let sched = rt.live()?;
            sched.check_device(device)?;
            sched.signal(device, from_running)
        };

        let _ = handoff.perform();
        Ok(count)
    }

    /// Tear the scheduler down and join every task thread.
    ///
    /// Waits until no task holds the CPU, then releases every task still
    /// blocked (ready order, then wait-set order) one at a time, joining each
    /// before releasing the next. Idempotent; a no-op without scheduler state.
    pub fn shutdown(&self) {
        let (order, threads) = {
            let mut guard = self.inner.state.lock();
            loop {
                match guard.as_ref() {
                    None => return,
                    Some(rt) if rt.is_task_thread() => {
                        log::error!("shutdown called from a task thread; ignored");
                        return;
                    }
                    Some(rt) if rt.draining || !rt.sched.is_idle() => {
                        self.inner.idle.wait(&mut guard);
                    }
                    Some(_) => break,
                }
            }

            let Some(rt) = guard.as_mut() else {
                return;
            };
            rt.draining = true;
            let order = rt.sched.drain_blocked();
            let threads = std::mem::take(&mut rt.threads);
            (order, threads)
        };

        log::debug!(
            "draining {} blocked task(s), joining {} thread(s)",
            order.len(),
            threads.len()
        );

        let mut threads: Vec<Option<TaskThread>> = threads.into_iter().map(Some).collect();
        for task in order {
            if let Some(thread) = threads.get_mut(task.index()).and_then(Option::take) {
                thread.drain();
            }
        }
        for thread in threads.into_iter().flatten() {
            thread.join();
        }

        let mut guard = self.inner.state.lock();
        *guard = None;
        self.inner.idle.notify_all();
        log::debug!("scheduler shut down");
    }

    /// State of a task, while scheduler state exists
    pub fn task_state(&self, task: TaskId) -> Option<TaskState> {
        self.inner
            .state
            .lock()
            .as_ref()
            .and_then(|rt| rt.sched.task_state(task))
    }

    /// Id of the calling task, when called from the running task
    pub fn current_task(&self) -> Option<TaskId> {
        self.inner.state.lock().as_ref().and_then(Runtime::caller)
    }

    /// Snapshot of scheduler counters
    pub fn stats(&self) -> Option<SchedulerStats> {
        self.inner.state.lock().as_ref().map(|rt| rt.sched.stats())
    }

    fn start_thread<F>(
        &self,
        task: TaskId,
        priority: Priority,
        gate: Arc<Gate>,
        entry: F,
    ) -> SchedResult<JoinHandle<()>>
    where
        F: FnOnce(Priority) + Send + 'static,
    {
        let inner = Arc::downgrade(&self.inner);
        let handle = thread::Builder::new()
            .name(format!("baton-task-{}", task.as_u64()))
            .spawn(move || {
                if gate.pass() == Wake::Drain {
                    return;
                }
                let _completion = Completion { inner, task };
                entry(priority);
            })?;
        Ok(handle)
    }

    /// Perform a handoff on behalf of the calling task
    fn resume(handoff: Handoff) -> SchedResult<()> {
        match handoff.perform() {
            Wake::Run => Ok(()),
            Wake::Drain => Err(SchedError::ShuttingDown),
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
