use pretty_assertions::assert_eq;
use prefetch_core::{FetchOutcome, Frequency, QueryKind};
use prefetch_engine::{
    build_report, decode_body, extract_frequency, readable_text, FailureKind, FetchError,
    FetchMetadata, FetchedPage,
};

const RUN_PAGE: &str = r#"<html><head><title>run</title></head><body>
<nav>Menu</nav>
<main>
  <h1>run</h1>
  <span class="word-frequency-img" data-band="5" title="Extremely Common"></span>
  <p>to move quickly on foot</p>
</main>
</body></html>"#;

fn page(html: &[u8], content_type: &str) -> FetchedPage {
    FetchedPage {
        bytes: html.to_vec(),
        metadata: FetchMetadata {
            original_url: "https://www.collinsdictionary.com/dictionary/english/run".to_string(),
            final_url: "https://www.collinsdictionary.com/dictionary/english/run".to_string(),
            redirect_count: 0,
            content_type: Some(content_type.to_string()),
            byte_len: html.len() as u64,
        },
    }
}

#[test]
fn frequency_band_and_label_are_read_from_marker() {
    assert_eq!(extract_frequency(RUN_PAGE), Frequency::new(5, "Extremely Common"));
}

#[test]
fn missing_marker_yields_band_zero() {
    let frequency = extract_frequency("<html><body><p>nothing here</p></body></html>");
    assert_eq!(frequency, Frequency::unknown("Fail to find the word"));
}

#[test]
fn marker_without_band_yields_band_zero() {
    let frequency = extract_frequency(r#"<span class="word-frequency-img" title="Rare"></span>"#);
    assert_eq!(frequency.band, 0);
    assert_eq!(frequency.label, "Fail to find the word");
}

#[test]
fn malformed_band_reports_the_parse_failure() {
    let frequency =
        extract_frequency(r#"<span class="word-frequency-img" data-band="high"></span>"#);
    assert_eq!(frequency.band, 0);
    assert!(frequency.label.starts_with("invalid frequency band 'high'"));
}

#[test]
fn readable_text_prefers_main_content() {
    let text = readable_text(RUN_PAGE);
    assert!(text.contains("to move quickly on foot"));
    assert!(!text.contains("Menu"));
}

#[test]
fn decode_honours_declared_charset() {
    let decoded = decode_body(b"Stra\xdfe", Some("text/html; charset=ISO-8859-1"));
    assert_eq!(decoded.text, "Straße");
    assert_eq!(decoded.encoding_label, "windows-1252");
    assert!(!decoded.had_errors);
}

#[test]
fn decode_bom_wins_over_header() {
    let decoded = decode_body(b"\xef\xbb\xbfcaf\xc3\xa9", Some("text/html; charset=ISO-8859-1"));
    assert_eq!(decoded.text, "café");
    assert_eq!(decoded.encoding_label, "UTF-8");
}

#[test]
fn decode_is_lossy_on_malformed_input() {
    let decoded = decode_body(b"ok \xff\xfe", Some("text/html; charset=utf-8"));
    assert!(decoded.had_errors);
    assert!(decoded.text.starts_with("ok "));
}

#[test]
fn lookup_report_carries_page_and_frequency() {
    let report = build_report(
        QueryKind::Lookup,
        Ok(page(RUN_PAGE.as_bytes(), "text/html; charset=utf-8")),
    );
    assert_eq!(report.frequency, Some(Frequency::new(5, "Extremely Common")));
    match report.outcome {
        FetchOutcome::Loaded(snapshot) => {
            assert_eq!(
                snapshot.final_url,
                "https://www.collinsdictionary.com/dictionary/english/run"
            );
            assert!(snapshot.text.contains("to move quickly on foot"));
        }
        other => panic!("expected loaded page, got {other:?}"),
    }
}

#[test]
fn non_lookup_report_skips_frequency() {
    let report = build_report(QueryKind::WebSearch, Ok(page(RUN_PAGE.as_bytes(), "text/html")));
    assert_eq!(report.frequency, None);
    assert!(report.outcome.is_ok());
}

#[test]
fn failed_lookup_reports_band_zero_with_reason() {
    let report = build_report(
        QueryKind::Lookup,
        Err(FetchError::new(FailureKind::HttpStatus(503), "503 Service Unavailable")),
    );
    assert_eq!(report.outcome, FetchOutcome::Failed("http status 503".to_string()));
    assert_eq!(report.frequency, Some(Frequency::unknown("http status 503")));
}

#[test]
fn failed_translate_has_no_frequency() {
    let report = build_report(
        QueryKind::Translate,
        Err(FetchError::new(FailureKind::Timeout, "deadline")),
    );
    assert!(!report.outcome.is_ok());
    assert_eq!(report.frequency, None);
}
