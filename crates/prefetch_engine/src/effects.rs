use std::collections::HashMap;
use std::sync::{mpsc as std_mpsc, Arc};
use std::time::Duration;

use prefetch_core::{
    Effect, FetchOutcome, FetchReport, Frequency, Msg, Notification, Query, QueryKind, Ticket,
    WorkerId,
};
use prefetch_logging::{prefetch_debug, prefetch_trace};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fetch::{PageFetcher, ProgressSink};
use crate::report::build_report;

/// Executes core effects on the runtime. Lives inside the actor task.
pub(crate) struct EffectRunner {
    fetcher: Arc<dyn PageFetcher>,
    msg_tx: mpsc::UnboundedSender<Msg>,
    event_tx: std_mpsc::Sender<Notification>,
    fetches: HashMap<WorkerId, CancellationToken>,
    debounce: Option<JoinHandle<()>>,
}

impl EffectRunner {
    pub(crate) fn new(
        fetcher: Arc<dyn PageFetcher>,
        msg_tx: mpsc::UnboundedSender<Msg>,
        event_tx: std_mpsc::Sender<Notification>,
    ) -> Self {
        Self {
            fetcher,
            msg_tx,
            event_tx,
            fetches: HashMap::new(),
            debounce: None,
        }
    }

    pub(crate) fn notify(&self, notification: Notification) {
        let _ = self.event_tx.send(notification);
    }

    pub(crate) fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartFetch {
                    worker,
                    ticket,
                    query,
                    url,
                    timeout,
                } => {
                    let cancel = CancellationToken::new();
                    if let Some(previous) = self.fetches.insert(worker, cancel.clone()) {
                        previous.cancel();
                    }
                    tokio::spawn(run_fetch(
                        self.fetcher.clone(),
                        FetchJob {
                            worker,
                            ticket,
                            query,
                            url,
                            timeout,
                        },
                        cancel,
                        self.msg_tx.clone(),
                    ));
                }
                Effect::StopFetch { worker } => {
                    if let Some(cancel) = self.fetches.remove(&worker) {
                        prefetch_trace!("Cancelling fetch on worker {}", worker);
                        cancel.cancel();
                    }
                }
                Effect::DestroyWorker { worker } => {
                    if let Some(cancel) = self.fetches.remove(&worker) {
                        cancel.cancel();
                    }
                    prefetch_debug!("Released worker {}", worker);
                }
                Effect::ArmDebounce { generation, after } => {
                    if let Some(previous) = self.debounce.take() {
                        previous.abort();
                    }
                    let msg_tx = self.msg_tx.clone();
                    self.debounce = Some(tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = msg_tx.send(Msg::DebounceElapsed { generation });
                    }));
                }
                Effect::Notify(notification) => self.notify(notification),
            }
        }
    }

    pub(crate) fn shutdown(&mut self) {
        for (_, cancel) in self.fetches.drain() {
            cancel.cancel();
        }
        if let Some(debounce) = self.debounce.take() {
            debounce.abort();
        }
    }
}

struct FetchJob {
    worker: WorkerId,
    ticket: Ticket,
    query: Query,
    url: String,
    timeout: Duration,
}

/// Relays fetch progress into the actor, tagged with the assignment it belongs to.
struct ChannelProgressSink {
    worker: WorkerId,
    ticket: Ticket,
    tx: mpsc::UnboundedSender<Msg>,
}

impl ProgressSink for ChannelProgressSink {
    fn progress(&self, percent: u8) {
        let _ = self.tx.send(Msg::FetchProgress {
            worker: self.worker,
            ticket: self.ticket,
            percent,
        });
    }
}

async fn run_fetch(
    fetcher: Arc<dyn PageFetcher>,
    job: FetchJob,
    cancel: CancellationToken,
    msg_tx: mpsc::UnboundedSender<Msg>,
) {
    let FetchJob {
        worker,
        ticket,
        query,
        url,
        timeout,
    } = job;
    let sink = ChannelProgressSink {
        worker,
        ticket,
        tx: msg_tx.clone(),
    };

    let fetch = fetcher.fetch(&url, &sink);
    tokio::pin!(fetch);
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    let mut timed_out = false;

    // The timeout only tells the scheduler; it decides whether to stop us.
    let result = loop {
        tokio::select! {
            result = &mut fetch => break Some(result),
            _ = cancel.cancelled() => break None,
            _ = &mut deadline, if !timed_out => {
                timed_out = true;
                let _ = msg_tx.send(Msg::FetchTimedOut { worker, ticket });
            }
        }
    };

    let report = match result {
        Some(result) => build_report(query.kind(), result),
        // Stopped after the deadline: the page never arrived, which LOOKUP reports as band 0.
        None => FetchReport {
            outcome: FetchOutcome::Aborted,
            frequency: (timed_out && query.kind() == QueryKind::Lookup)
                .then(|| Frequency::timed_out(timeout)),
        },
    };
    let _ = msg_tx.send(Msg::FetchFinished {
        worker,
        ticket,
        report,
    });
}
