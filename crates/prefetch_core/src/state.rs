use std::collections::VecDeque;

use crate::view_model::{PoolUsage, PoolView, WorkerRowView};
use crate::{ConfigError, Query, SchedulerConfig};

pub type WorkerId = u64;

/// Generation number handed out on every `start`; resource events carry it.
pub type Ticket = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Free,
    Working,
    Finished,
}

/// What a finished fetch left behind for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub final_url: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WorkerSlot {
    pub(crate) id: WorkerId,
    pub(crate) query: Option<Query>,
    pub(crate) phase: Phase,
    pub(crate) progress: u8,
    pub(crate) ticket: Ticket,
    /// Set by an explicit stop; the next completion for this ticket skips extraction.
    pub(crate) forced_stop: bool,
    /// The worker timeout fired and stopped the load; extraction still runs.
    pub(crate) timed_out: bool,
    pub(crate) started_seq: u64,
    pub(crate) page: Option<PageSnapshot>,
}

impl WorkerSlot {
    fn new(id: WorkerId) -> Self {
        Self {
            id,
            query: None,
            phase: Phase::Free,
            progress: 0,
            ticket: 0,
            forced_stop: false,
            timed_out: false,
            started_seq: 0,
            page: None,
        }
    }

    pub(crate) fn is_free(&self) -> bool {
        self.phase == Phase::Free
    }

    pub(crate) fn clear(&mut self) {
        self.query = None;
        self.phase = Phase::Free;
        self.progress = 0;
        self.forced_stop = false;
        self.timed_out = false;
        self.page = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolState {
    pub(crate) config: SchedulerConfig,
    pub(crate) workers: Vec<WorkerSlot>,
    pub(crate) active: Option<WorkerId>,
    pub(crate) backlog: VecDeque<Query>,
    pub(crate) pending_delay: Option<Query>,
    pub(crate) debounce_generation: u64,
    next_worker_id: WorkerId,
    next_ticket: Ticket,
    next_start_seq: u64,
    pub(crate) last_usage: PoolUsage,
}

impl PoolState {
    /// Builds a pool holding `baseline_size` free workers.
    pub fn new(config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut state = Self {
            workers: Vec::with_capacity(config.baseline_size),
            config,
            active: None,
            backlog: VecDeque::new(),
            pending_delay: None,
            debounce_generation: 0,
            next_worker_id: 1,
            next_ticket: 1,
            next_start_seq: 1,
            last_usage: PoolUsage::default(),
        };
        for _ in 0..state.config.baseline_size {
            state.allocate_worker();
        }
        state.last_usage = state.usage();
        Ok(state)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn usage(&self) -> PoolUsage {
        let mut usage = PoolUsage::default();
        for worker in &self.workers {
            match worker.phase {
                Phase::Free => usage.free += 1,
                Phase::Working => usage.working += 1,
                Phase::Finished => usage.finished += 1,
            }
        }
        usage
    }

    pub fn active_worker(&self) -> Option<WorkerId> {
        self.active
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Whether some worker is loading or has loaded exactly this query.
    pub fn has_prefetched(&self, query: &Query) -> bool {
        self.worker_holding(query).is_some()
    }

    pub fn view(&self) -> PoolView {
        PoolView {
            usage: self.usage(),
            active: self.active,
            backlog: self.backlog.iter().cloned().collect(),
            pending_delay: self.pending_delay.clone(),
            workers: self
                .workers
                .iter()
                .map(|w| WorkerRowView {
                    worker: w.id,
                    phase: w.phase,
                    progress: w.progress,
                    query: w.query.clone(),
                    active: self.active == Some(w.id),
                    has_page: w.page.is_some(),
                })
                .collect(),
        }
    }

    pub(crate) fn worker_holding(&self, query: &Query) -> Option<WorkerId> {
        self.workers
            .iter()
            .find(|w| w.query.as_ref() == Some(query))
            .map(|w| w.id)
    }

    pub(crate) fn slot(&self, id: WorkerId) -> Option<&WorkerSlot> {
        self.workers.iter().find(|w| w.id == id)
    }

    pub(crate) fn slot_mut(&mut self, id: WorkerId) -> Option<&mut WorkerSlot> {
        self.workers.iter_mut().find(|w| w.id == id)
    }

    pub(crate) fn allocate_worker(&mut self) -> WorkerId {
        let id = self.next_worker_id;
        self.next_worker_id += 1;
        self.workers.push(WorkerSlot::new(id));
        id
    }

    pub(crate) fn issue_ticket(&mut self) -> (Ticket, u64) {
        let ticket = self.next_ticket;
        let seq = self.next_start_seq;
        self.next_ticket += 1;
        self.next_start_seq += 1;
        (ticket, seq)
    }
}
