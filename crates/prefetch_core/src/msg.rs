use std::time::Duration;

use crate::{CorrelationId, PageSnapshot, Query, QuerySettings, Ticket, WorkerId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Append to the backlog; started later by the prefetch tick.
    PrefetchQueued(Query),
    /// Start now on a free (or new) worker unless already held.
    PrefetchImmediately(Query),
    /// Start if needed and make the worker the active one.
    Request(Query),
    /// Debounced request; only the last one before the timer fires wins.
    DelayRequest(Query),
    DiscardByCorrelationId(CorrelationId),
    /// User cancel of the visible fetch.
    ForceStopActive,
    /// Drop everything and return to a baseline pool of free workers.
    Reset,
    /// Language switch; affects URLs of queries started from now on.
    ApplySettings(QuerySettings),
    /// Periodic prefetch timer.
    PrefetchTick,
    /// Debounce timer armed with `generation` expired.
    DebounceElapsed { generation: u64 },
    /// Resource load progress, 0..=100.
    FetchProgress {
        worker: WorkerId,
        ticket: Ticket,
        percent: u8,
    },
    /// The fetch timeout armed at start expired.
    FetchTimedOut { worker: WorkerId, ticket: Ticket },
    /// Terminal event for one start.
    FetchFinished {
        worker: WorkerId,
        ticket: Ticket,
        report: FetchReport,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub outcome: FetchOutcome,
    /// Frequency marker found on a LOOKUP page (or the reason it was not).
    pub frequency: Option<Frequency>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded(PageSnapshot),
    Failed(String),
    Aborted,
}

impl FetchOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, FetchOutcome::Loaded(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frequency {
    pub band: u32,
    pub label: String,
}

impl Frequency {
    pub fn new(band: u32, label: impl Into<String>) -> Self {
        Self {
            band,
            label: label.into(),
        }
    }

    /// Band 0 with a diagnostic; used whenever the marker cannot be read.
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self::new(0, reason)
    }

    /// Band 0 for a load stopped by the worker timeout before a page arrived.
    pub fn timed_out(after: Duration) -> Self {
        Self::unknown(format!("timed out after {} ms", after.as_millis()))
    }
}
