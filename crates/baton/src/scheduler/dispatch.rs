//! Dispatcher: scheduling decisions over the ready queue, wait sets and running slot
//!
//! Every entry point mutates [`SchedState`] and returns the [`Handoff`] the
//! calling thread must perform once it has released the state lock. Nothing
//! here blocks or touches threads, so each decision is testable in isolation.

use crate::config::{SchedulerConfig, MAX_PRIORITY};
use crate::error::{SchedError, SchedResult};
use crate::scheduler::gate::{Gate, Handoff, Pass};
use crate::scheduler::ready::ReadyQueue;
use crate::scheduler::task::{DeviceId, Priority, TaskControlBlock, TaskId, TaskState};
use crate::scheduler::wait::WaitSets;
use std::sync::Arc;

/// Scheduler statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Total tasks spawned
    pub tasks_spawned: u64,

    /// Tasks whose entry function returned
    pub tasks_completed: u64,

    /// Times a task was put onto the running slot
    pub dispatches: u64,

    /// Tasks in the ready queue
    pub ready: usize,

    /// Tasks blocked on a device
    pub waiting: usize,

    /// Task holding the CPU
    pub running: Option<TaskId>,
}

/// Queues, running slot and task table of one scheduler instance
pub(crate) struct SchedState {
    config: SchedulerConfig,
    /// Control blocks indexed by `TaskId::index`
    tasks: Vec<TaskControlBlock>,
    ready: ReadyQueue,
    waits: WaitSets,
    running: Option<TaskId>,
    completed: u64,
    dispatches: u64,
}

impl SchedState {
    pub(crate) fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            tasks: Vec::new(),
            ready: ReadyQueue::new(),
            waits: WaitSets::new(config.device_count),
            running: None,
            completed: 0,
            dispatches: 0,
        }
    }

    pub(crate) fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub(crate) fn running(&self) -> Option<TaskId> {
        self.running
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.running.is_none()
    }

    pub(crate) fn task_state(&self, id: TaskId) -> Option<TaskState> {
        self.task(id).map(TaskControlBlock::state)
    }

    pub(crate) fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            tasks_spawned: self.tasks.len() as u64,
            tasks_completed: self.completed,
            dispatches: self.dispatches,
            ready: self.ready.len(),
            waiting: self.waits.waiting_count(),
            running: self.running,
        }
    }

    /// Validate a spawn request without changing anything
    pub(crate) fn check_spawn(&self, priority: Priority) -> SchedResult<()> {
        if priority > MAX_PRIORITY {
            return Err(SchedError::InvalidPriority {
                priority,
                max: MAX_PRIORITY,
            });
        }
        if self.tasks.len() >= self.config.max_tasks {
            return Err(SchedError::CapacityExceeded {
                max: self.config.max_tasks,
            });
        }
        Ok(())
    }

    pub(crate) fn check_device(&self, device: DeviceId) -> SchedResult<()> {
        if self.waits.is_valid(device) {
            Ok(())
        } else {
            Err(SchedError::InvalidDevice {
                device,
                count: self.waits.device_count(),
            })
        }
    }

    /// Id the next spawned task receives
    pub(crate) fn next_id(&self) -> TaskId {
        TaskId::from_u64(self.tasks.len() as u64 + 1)
    }

    /// Admit a freshly created task.
    ///
    /// `from_running` tells whether the caller is the running task; only then
    /// can it be preempted or charged for the creation.
    pub(crate) fn spawn(
        &mut self,
        priority: Priority,
        gate: Arc<Gate>,
        from_running: bool,
    ) -> (TaskId, Handoff) {
        let id = self.next_id();
        self.tasks.push(TaskControlBlock::new(
            id,
            priority,
            self.config.time_quantum,
            gate,
        ));

        let Some(current) = self.running else {
            log::trace!("task {} admitted onto idle CPU", id);
            return (id, Handoff::Admit(self.run(id)));
        };

        if from_running && priority > self.priority_of(current) {
            log::trace!("task {} preempts {}", id, current);
            self.demote_running();
            let handoff = Handoff::Switch {
                next: self.run(id),
                own: self.gate_of(current),
            };
            return (id, handoff);
        }

        self.enqueue(id);
        if !from_running {
            return (id, Handoff::Stay);
        }
        let exhausted = self.charge_running(current);
        if self.head_outranks(current) {
            log::trace!("deferred preemption of {}", current);
            return (id, self.rotate(current));
        }
        if exhausted {
            return (id, self.expire(current));
        }
        (id, Handoff::Stay)
    }

    /// One unit of work by the running task
    pub(crate) fn tick(&mut self) -> Handoff {
        let Some(current) = self.running else {
            return Handoff::Stay;
        };

        let exhausted = self.charge_running(current);

        // A strictly higher task queued by a non-task caller takes over here
        if self.head_outranks(current) {
            log::trace!("deferred preemption of {}", current);
            return self.rotate(current);
        }

        if exhausted {
            return self.expire(current);
        }
        Handoff::Stay
    }

    /// Move the running task into `device`'s wait set. The device must be valid.
    pub(crate) fn block(&mut self, device: DeviceId) -> Handoff {
        let Some(current) = self.running.take() else {
            return Handoff::Stay;
        };

        self.task_mut(current).set_state(TaskState::Waiting);
        self.waits.block(device, current);
        log::trace!("task {} waits on device {}", current, device);

        let own = self.gate_of(current);
        match self.promote_head() {
            Some(next) => Handoff::Switch { next, own },
            None => Handoff::Park { own },
        }
    }

    /// Wake every task waiting on `device`. The device must be valid.
    pub(crate) fn signal(&mut self, device: DeviceId, from_running: bool) -> (usize, Handoff) {
        let woken = self.waits.take(device);
        let count = woken.len();

        for id in woken {
            self.task_mut(id).set_state(TaskState::Ready);
            self.enqueue(id);
        }
        if count > 0 {
            log::trace!("device {} woke {} task(s)", device, count);
        }

        let running = self.running;
        let handoff = match running {
            None => self.promote_head().map_or(Handoff::Stay, Handoff::Admit),
            Some(current) if from_running && self.head_outranks(current) => {
                log::trace!("ready head preempts {}", current);
                self.rotate(current)
            }
            Some(_) => Handoff::Stay,
        };
        (count, handoff)
    }

    /// The running task's entry function returned
    pub(crate) fn finish(&mut self, id: TaskId) -> Handoff {
        if self.running != Some(id) {
            return Handoff::Stay;
        }

        self.running = None;
        self.task_mut(id).set_state(TaskState::Terminated);
        self.completed += 1;
        log::trace!("task {} terminated", id);

        self.promote_head().map_or(Handoff::Stay, Handoff::Admit)
    }

    /// Empty every queue, returning the blocked tasks in release order:
    /// ready order first, then each device's wait set in blocking order
    pub(crate) fn drain_blocked(&mut self) -> Vec<TaskId> {
        let mut order = self.ready.drain_ordered();
        order.extend(self.waits.drain_all());
        order
    }

    /// Quantum expired: rotate only if the queue head ties or beats the caller
    fn expire(&mut self, current: TaskId) -> Handoff {
        match self.ready.peek() {
            Some((_, head)) if head >= self.priority_of(current) => self.rotate(current),
            _ => {
                let quantum = self.config.time_quantum;
                self.task_mut(current).refill(quantum);
                Handoff::Stay
            }
        }
    }

    /// Whether the ready queue holds a task strictly above `current`
    fn head_outranks(&self, current: TaskId) -> bool {
        self.ready
            .peek_priority()
            .is_some_and(|head| head > self.priority_of(current))
    }

    /// Demote the running task behind its peers and hand the CPU to the queue head
    fn rotate(&mut self, current: TaskId) -> Handoff {
        self.demote_running();
        let own = self.gate_of(current);
        match self.promote_head() {
            Some(next) => Handoff::Switch { next, own },
            None => Handoff::Park { own },
        }
    }

    fn demote_running(&mut self) {
        if let Some(current) = self.running.take() {
            self.task_mut(current).set_state(TaskState::Ready);
            self.enqueue(current);
        }
    }

    fn promote_head(&mut self) -> Option<Pass> {
        let next = self.ready.pop()?;
        Some(self.run(next))
    }

    /// Put a ready task onto the running slot with a full quantum
    fn run(&mut self, id: TaskId) -> Pass {
        let quantum = self.config.time_quantum;
        let task = self.task_mut(id);
        task.set_state(TaskState::Running);
        task.refill(quantum);
        let gate = Arc::clone(task.gate());

        self.running = Some(id);
        self.dispatches += 1;
        Pass::new(id, gate)
    }

    /// Insert into the ready queue with a fresh quantum
    fn enqueue(&mut self, id: TaskId) {
        let quantum = self.config.time_quantum;
        let task = self.task_mut(id);
        task.refill(quantum);
        let priority = task.priority();
        self.ready.push(id, priority);
    }

    fn charge_running(&mut self, current: TaskId) -> bool {
        self.task_mut(current).charge()
    }

    fn task(&self, id: TaskId) -> Option<&TaskControlBlock> {
        if id.as_u64() == 0 {
            return None;
        }
        self.tasks.get(id.index())
    }

    fn task_mut(&mut self, id: TaskId) -> &mut TaskControlBlock {
        &mut self.tasks[id.index()]
    }

    fn priority_of(&self, id: TaskId) -> Priority {
        self.tasks[id.index()].priority()
    }

    fn gate_of(&self, id: TaskId) -> Arc<Gate> {
        Arc::clone(self.tasks[id.index()].gate())
    }
}
