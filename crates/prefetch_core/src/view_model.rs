use crate::{Phase, Query, WorkerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolUsage {
    pub finished: usize,
    pub working: usize,
    pub free: usize,
}

impl PoolUsage {
    pub fn new(finished: usize, working: usize, free: usize) -> Self {
        Self {
            finished,
            working,
            free,
        }
    }

    pub fn total(&self) -> usize {
        self.finished + self.working + self.free
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PoolView {
    pub usage: PoolUsage,
    pub active: Option<WorkerId>,
    pub backlog: Vec<Query>,
    pub pending_delay: Option<Query>,
    pub workers: Vec<WorkerRowView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRowView {
    pub worker: WorkerId,
    pub phase: Phase,
    pub progress: u8,
    pub query: Option<Query>,
    pub active: bool,
    pub has_page: bool,
}
