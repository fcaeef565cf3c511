//! Per-device wait sets

use crate::scheduler::task::{DeviceId, TaskId};
use std::collections::VecDeque;

/// FIFO of blocked tasks for each device
#[derive(Debug)]
pub(crate) struct WaitSets {
    sets: Vec<VecDeque<TaskId>>,
}

impl WaitSets {
    pub(crate) fn new(device_count: usize) -> Self {
        Self {
            sets: (0..device_count).map(|_| VecDeque::new()).collect(),
        }
    }

    pub(crate) fn device_count(&self) -> usize {
        self.sets.len()
    }

    pub(crate) fn is_valid(&self, device: DeviceId) -> bool {
        device < self.sets.len()
    }

    /// Append a task to a device's wait set. The device must be valid.
    pub(crate) fn block(&mut self, device: DeviceId, task: TaskId) {
        self.sets[device].push_back(task);
    }

    /// Empty a device's wait set, returning its tasks in blocking order
    pub(crate) fn take(&mut self, device: DeviceId) -> VecDeque<TaskId> {
        std::mem::take(&mut self.sets[device])
    }

    /// Tasks blocked on any device
    pub(crate) fn waiting_count(&self) -> usize {
        self.sets.iter().map(VecDeque::len).sum()
    }

    /// Remove every blocked task, device by device in blocking order
    pub(crate) fn drain_all(&mut self) -> Vec<TaskId> {
        self.sets.iter_mut().flat_map(std::mem::take).collect()
    }
}
