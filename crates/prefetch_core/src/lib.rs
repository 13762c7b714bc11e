//! Prefetch core: pure look-ahead scheduler state machine and view-model helpers.
mod config;
mod effect;
mod msg;
mod query;
mod state;
mod update;
mod view_model;

pub use config::{ConfigError, SchedulerConfig};
pub use effect::{Effect, Notification};
pub use msg::{FetchOutcome, FetchReport, Frequency, Msg};
pub use query::{CorrelationId, LanguageMode, Query, QueryKind, QuerySettings};
pub use state::{PageSnapshot, Phase, PoolState, Ticket, WorkerId};
pub use update::update;
pub use view_model::{PoolUsage, PoolView, WorkerRowView};
