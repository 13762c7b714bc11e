use std::time::Duration;

use crate::{CorrelationId, PageSnapshot, PoolUsage, Query, Ticket, WorkerId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Load `url` on the worker's resource and arm its timeout.
    StartFetch {
        worker: WorkerId,
        ticket: Ticket,
        query: Query,
        url: String,
        timeout: Duration,
    },
    /// Abort whatever the worker's resource is loading. A completion may still follow.
    StopFetch { worker: WorkerId },
    /// Release the worker's resource for good.
    DestroyWorker { worker: WorkerId },
    /// (Re)arm the debounce timer; earlier generations are stale.
    ArmDebounce { generation: u64, after: Duration },
    Notify(Notification),
}

/// Events for the caller's UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    UsageChanged(PoolUsage),
    ActiveWorkerChanged(Option<WorkerId>),
    /// Progress of the active worker; `None` when there is no active worker.
    ActiveProgressChanged(Option<u8>),
    ActivePageReady {
        worker: WorkerId,
        query: Query,
        page: PageSnapshot,
    },
    SuggestionFound {
        correlation_id: CorrelationId,
        suggestion: String,
    },
    FrequencyFound {
        correlation_id: CorrelationId,
        band: u32,
        label: String,
    },
    DelayedRequestActivated(Query),
}
