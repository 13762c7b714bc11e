use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use std::time::Duration;

use prefetch_core::{
    update, ConfigError, CorrelationId, Msg, Notification, PoolState, PoolView, Query,
    QuerySettings, SchedulerConfig,
};
use prefetch_logging::{prefetch_debug, prefetch_info};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::effects::EffectRunner;
use crate::fetch::{FetchSettings, PageFetcher, ReqwestFetcher};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid scheduler configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

enum Command {
    Apply(Msg),
    HasPrefetched {
        query: Query,
        reply: std_mpsc::Sender<bool>,
    },
    Snapshot {
        reply: std_mpsc::Sender<PoolView>,
    },
    Shutdown,
}

/// Caller side of the scheduler actor.
///
/// All pool state lives on one task; every method only sends a command, so
/// the handle can be used from any thread (typically the UI thread).
/// Notifications are polled with [`SchedulerHandle::try_recv`].
pub struct SchedulerHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    event_rx: std_mpsc::Receiver<Notification>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn new(config: SchedulerConfig, settings: FetchSettings) -> Result<Self, EngineError> {
        Self::with_fetcher(config, Arc::new(ReqwestFetcher::new(settings)))
    }

    pub fn with_fetcher(
        config: SchedulerConfig,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Result<Self, EngineError> {
        let pool = PoolState::new(config)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("prefetch-worker")
            .enable_all()
            .build()?;
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = std_mpsc::channel();

        let thread = thread::Builder::new()
            .name("prefetch-scheduler".to_string())
            .spawn(move || runtime.block_on(run_actor(pool, fetcher, cmd_rx, event_tx)))?;

        Ok(Self {
            cmd_tx,
            event_rx,
            thread: Some(thread),
        })
    }

    pub fn prefetch_queued(&self, query: Query) {
        self.send(Msg::PrefetchQueued(query));
    }

    pub fn prefetch_immediately(&self, query: Query) {
        self.send(Msg::PrefetchImmediately(query));
    }

    pub fn request(&self, query: Query) {
        self.send(Msg::Request(query));
    }

    pub fn delay_request(&self, query: Query) {
        self.send(Msg::DelayRequest(query));
    }

    pub fn discard_by_correlation_id(&self, correlation_id: CorrelationId) {
        self.send(Msg::DiscardByCorrelationId(correlation_id));
    }

    pub fn force_stop_active(&self) {
        self.send(Msg::ForceStopActive);
    }

    pub fn reset(&self) {
        self.send(Msg::Reset);
    }

    pub fn apply_settings(&self, settings: QuerySettings) {
        self.send(Msg::ApplySettings(settings));
    }

    /// Asks the actor whether a worker holds `query`. Blocks until it answers.
    pub fn has_prefetched(&self, query: &Query) -> bool {
        let (reply, rx) = std_mpsc::channel();
        let command = Command::HasPrefetched {
            query: query.clone(),
            reply,
        };
        if self.cmd_tx.send(command).is_err() {
            return false;
        }
        rx.recv().unwrap_or(false)
    }

    /// Current pool layout, or `None` if the actor has stopped.
    pub fn snapshot(&self) -> Option<PoolView> {
        let (reply, rx) = std_mpsc::channel();
        self.cmd_tx.send(Command::Snapshot { reply }).ok()?;
        rx.recv().ok()
    }

    pub fn try_recv(&self) -> Option<Notification> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Notification> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, msg: Msg) {
        let _ = self.cmd_tx.send(Command::Apply(msg));
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn run_actor(
    mut pool: PoolState,
    fetcher: Arc<dyn PageFetcher>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: std_mpsc::Sender<Notification>,
) {
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<Msg>();
    let mut runner = EffectRunner::new(fetcher, msg_tx, event_tx);

    let interval = pool.config().prefetch_interval;
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    prefetch_info!(
        "Scheduler started with {} workers (prefetch every {:?})",
        pool.worker_count(),
        interval
    );
    runner.notify(Notification::UsageChanged(pool.usage()));

    loop {
        let msg = tokio::select! {
            command = cmd_rx.recv() => match command {
                Some(Command::Apply(msg)) => msg,
                Some(Command::HasPrefetched { query, reply }) => {
                    let _ = reply.send(pool.has_prefetched(&query));
                    continue;
                }
                Some(Command::Snapshot { reply }) => {
                    let _ = reply.send(pool.view());
                    continue;
                }
                Some(Command::Shutdown) | None => break,
            },
            Some(msg) = msg_rx.recv() => msg,
            _ = ticker.tick() => Msg::PrefetchTick,
        };

        let (next, effects) = update(pool, msg);
        pool = next;
        runner.apply(effects);
    }

    runner.shutdown();
    prefetch_debug!("Scheduler stopped");
}
