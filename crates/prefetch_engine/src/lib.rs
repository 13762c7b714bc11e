//! Prefetch engine: fetch resource, page extraction and the scheduler actor.
mod decode;
mod effects;
mod engine;
mod extract;
mod fetch;
mod report;
mod types;

pub use decode::{decode_body, DecodedBody};
pub use engine::{EngineError, SchedulerHandle};
pub use extract::{extract_frequency, readable_text};
pub use fetch::{FetchSettings, PageFetcher, ProgressSink, ReqwestFetcher};
pub use report::build_report;
pub use types::{FailureKind, FetchError, FetchMetadata, FetchedPage};
