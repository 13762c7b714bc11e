use prefetch_core::{FetchOutcome, FetchReport, Frequency, PageSnapshot, QueryKind};
use prefetch_logging::prefetch_debug;

use crate::decode::decode_body;
use crate::extract::{extract_frequency, readable_text};
use crate::{FetchError, FetchedPage};

/// Turns a naturally completed fetch into what the scheduler consumes.
///
/// LOOKUP pages are parsed for the frequency marker; a failed LOOKUP still
/// reports a band-0 frequency carrying the failure.
pub fn build_report(kind: QueryKind, result: Result<FetchedPage, FetchError>) -> FetchReport {
    let is_lookup = kind == QueryKind::Lookup;
    match result {
        Ok(page) => {
            if page.metadata.redirect_count > 0 {
                prefetch_debug!(
                    "{} reached {} after {} redirect(s)",
                    page.metadata.original_url,
                    page.metadata.final_url,
                    page.metadata.redirect_count
                );
            }
            let decoded = decode_body(&page.bytes, page.metadata.content_type.as_deref());
            if decoded.had_errors {
                prefetch_debug!(
                    "Lossy {} decode of {}",
                    decoded.encoding_label,
                    page.metadata.final_url
                );
            }
            let frequency = is_lookup.then(|| extract_frequency(&decoded.text));
            FetchReport {
                outcome: FetchOutcome::Loaded(PageSnapshot {
                    final_url: page.metadata.final_url,
                    text: readable_text(&decoded.text),
                }),
                frequency,
            }
        }
        Err(err) => {
            let reason = err.to_string();
            FetchReport {
                frequency: is_lookup.then(|| Frequency::unknown(reason.clone())),
                outcome: FetchOutcome::Failed(reason),
            }
        }
    }
}
