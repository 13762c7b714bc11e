use std::collections::BTreeMap;

use prefetch_core::{CorrelationId, Notification, Query, QueryKind};

/// What was learned about one word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Finding {
    pub loaded: bool,
    pub suggestion: Option<String>,
    pub frequency: Option<(u32, String)>,
}

/// Walks the word list one active request at a time.
///
/// The current word is requested; the rest sit in the prefetch backlog. When
/// the current word's load finishes the next one is requested, which usually
/// promotes a worker that already holds it.
#[derive(Debug)]
pub struct Session {
    queries: Vec<Query>,
    cursor: usize,
    findings: BTreeMap<CorrelationId, Finding>,
    /// Words the cursor moved past that the scheduler may still hold.
    passed: Vec<Query>,
}

impl Session {
    pub fn new(queries: Vec<Query>) -> Self {
        Self {
            queries,
            cursor: 0,
            findings: BTreeMap::new(),
            passed: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<&Query> {
        self.queries.get(self.cursor)
    }

    /// Everything after the current word, in list order.
    pub fn upcoming(&self) -> &[Query] {
        self.queries.get(self.cursor + 1..).unwrap_or(&[])
    }

    /// True once every word has been shown.
    pub fn all_visited(&self) -> bool {
        self.cursor >= self.queries.len()
    }

    /// Folds one notification in. Returns the query to request next, if any.
    pub fn observe(&mut self, notification: &Notification) -> Option<Query> {
        match notification {
            Notification::ActivePageReady { query, .. } => {
                self.findings.entry(query.correlation_id()).or_default().loaded = true;
                None
            }
            Notification::SuggestionFound {
                correlation_id,
                suggestion,
            } => {
                self.findings.entry(*correlation_id).or_default().suggestion =
                    Some(suggestion.clone());
                None
            }
            Notification::FrequencyFound {
                correlation_id,
                band,
                label,
            } => {
                self.findings.entry(*correlation_id).or_default().frequency =
                    Some((*band, label.clone()));
                None
            }
            Notification::ActiveProgressChanged(Some(100)) if !self.all_visited() => {
                if let Some(done) = self.current().cloned() {
                    self.passed.push(done);
                }
                self.cursor += 1;
                self.current().cloned()
            }
            _ => None,
        }
    }

    /// Drains passed words whose results are all in, so their pages can be discarded.
    ///
    /// A LOOKUP is settled once its frequency arrived; other kinds as soon as they are passed.
    pub fn take_settled(&mut self) -> Vec<CorrelationId> {
        let findings = &self.findings;
        let (settled, pending): (Vec<Query>, Vec<Query>) =
            self.passed.drain(..).partition(|query| {
                query.kind() != QueryKind::Lookup
                    || findings
                        .get(&query.correlation_id())
                        .is_some_and(|finding| finding.frequency.is_some())
            });
        self.passed = pending;
        settled.iter().map(Query::correlation_id).collect()
    }

    fn subject_of(&self, correlation_id: CorrelationId) -> &str {
        self.queries
            .iter()
            .find(|q| q.correlation_id() == correlation_id)
            .map(Query::subject)
            .unwrap_or("?")
    }

    /// Human-readable line for a notification; usage updates only when `verbose`.
    pub fn describe(&self, notification: &Notification, verbose: bool) -> Option<String> {
        match notification {
            Notification::ActivePageReady { query, page, .. } => {
                let excerpt = page
                    .text
                    .lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .unwrap_or("");
                Some(format!("{query} ready at {}: {excerpt}", page.final_url))
            }
            Notification::SuggestionFound {
                correlation_id,
                suggestion,
            } => Some(format!(
                "'{}': did you mean '{suggestion}'?",
                self.subject_of(*correlation_id)
            )),
            Notification::FrequencyFound {
                correlation_id,
                band,
                label,
            } => Some(format!(
                "'{}': frequency band {band} ({label})",
                self.subject_of(*correlation_id)
            )),
            Notification::DelayedRequestActivated(query) => {
                Some(format!("{query} activated after delay"))
            }
            Notification::UsageChanged(usage) if verbose => Some(format!(
                "workers: {} finished, {} working, {} free",
                usage.finished, usage.working, usage.free
            )),
            Notification::ActiveWorkerChanged(worker) if verbose => {
                Some(format!("active worker: {worker:?}"))
            }
            _ => None,
        }
    }

    /// Final table, one line per word in list order.
    pub fn summary(&self) -> Vec<String> {
        self.queries
            .iter()
            .map(|query| {
                let finding = self
                    .findings
                    .get(&query.correlation_id())
                    .cloned()
                    .unwrap_or_default();
                let mut line = format!(
                    "{:<24} {}",
                    query.subject(),
                    if finding.loaded { "loaded" } else { "not loaded" }
                );
                if query.kind() == QueryKind::Lookup {
                    match &finding.frequency {
                        Some((band, label)) => line.push_str(&format!(", band {band} ({label})")),
                        None => line.push_str(", band ?"),
                    }
                }
                if let Some(suggestion) = &finding.suggestion {
                    line.push_str(&format!(", suggests '{suggestion}'"));
                }
                line
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use prefetch_core::PageSnapshot;

    fn words() -> Vec<Query> {
        ["run", "gve up", "walk"]
            .into_iter()
            .enumerate()
            .map(|(i, w)| Query::lookup(w, i as u64 + 1))
            .collect()
    }

    fn ready(query: &Query) -> Notification {
        Notification::ActivePageReady {
            worker: 1,
            query: query.clone(),
            page: PageSnapshot {
                final_url: "https://example.test/page".to_string(),
                text: "\n  first line\nsecond".to_string(),
            },
        }
    }

    #[test]
    fn completion_of_current_word_requests_the_next() {
        let queries = words();
        let mut session = Session::new(queries.clone());
        assert_eq!(session.current(), Some(&queries[0]));
        assert_eq!(session.upcoming(), &queries[1..]);

        assert_eq!(session.observe(&Notification::ActiveProgressChanged(Some(40))), None);
        assert_eq!(
            session.observe(&Notification::ActiveProgressChanged(Some(100))),
            Some(queries[1].clone())
        );
        assert_eq!(
            session.observe(&Notification::ActiveProgressChanged(Some(100))),
            Some(queries[2].clone())
        );
        assert_eq!(session.observe(&Notification::ActiveProgressChanged(Some(100))), None);
        assert!(session.all_visited());
        assert_eq!(session.observe(&Notification::ActiveProgressChanged(Some(100))), None);
    }

    #[test]
    fn findings_are_summarised_in_list_order() {
        let queries = words();
        let mut session = Session::new(queries.clone());
        session.observe(&ready(&queries[0]));
        session.observe(&Notification::FrequencyFound {
            correlation_id: 1,
            band: 5,
            label: "Extremely Common".to_string(),
        });
        session.observe(&Notification::SuggestionFound {
            correlation_id: 2,
            suggestion: "give up".to_string(),
        });

        let summary = session.summary();
        assert_eq!(summary.len(), 3);
        assert!(summary[0].starts_with("run"));
        assert!(summary[0].ends_with("loaded, band 5 (Extremely Common)"));
        assert!(summary[1].ends_with("not loaded, band ?, suggests 'give up'"));
        assert!(summary[2].ends_with("not loaded, band ?"));
    }

    #[test]
    fn passed_words_settle_once_their_frequency_arrives() {
        let queries = words();
        let mut session = Session::new(queries.clone());
        assert!(session.take_settled().is_empty());

        session.observe(&Notification::ActiveProgressChanged(Some(100)));
        // Word 1 is passed but its frequency is still on the way.
        assert!(session.take_settled().is_empty());

        session.observe(&Notification::FrequencyFound {
            correlation_id: 1,
            band: 0,
            label: "timed out after 100 ms".to_string(),
        });
        assert_eq!(session.take_settled(), vec![1]);
        assert!(session.take_settled().is_empty());

        // The current word is never settled, even with its frequency in.
        session.observe(&Notification::FrequencyFound {
            correlation_id: 2,
            band: 3,
            label: "Common".to_string(),
        });
        assert!(session.take_settled().is_empty());
        session.observe(&Notification::ActiveProgressChanged(Some(100)));
        assert_eq!(session.take_settled(), vec![2]);
    }

    #[test]
    fn passed_translations_settle_immediately() {
        let queries = vec![
            Query::new("hund", QueryKind::Translate, 1),
            Query::new("katt", QueryKind::Translate, 2),
        ];
        let mut session = Session::new(queries.clone());
        assert_eq!(
            session.observe(&Notification::ActiveProgressChanged(Some(100))),
            Some(queries[1].clone())
        );
        assert_eq!(session.take_settled(), vec![1]);
    }

    #[test]
    fn describe_uses_subjects_and_hides_usage_unless_verbose() {
        let session = Session::new(words());
        let frequency = Notification::FrequencyFound {
            correlation_id: 3,
            band: 2,
            label: "Common".to_string(),
        };
        assert_eq!(
            session.describe(&frequency, false),
            Some("'walk': frequency band 2 (Common)".to_string())
        );
        assert_eq!(
            session.describe(&ready(&words()[0]), false),
            Some("lookup 'run' (#1) ready at https://example.test/page: first line".to_string())
        );

        let usage = Notification::UsageChanged(prefetch_core::PoolUsage::new(1, 2, 3));
        assert_eq!(session.describe(&usage, false), None);
        assert_eq!(
            session.describe(&usage, true),
            Some("workers: 1 finished, 2 working, 3 free".to_string())
        );
    }
}
