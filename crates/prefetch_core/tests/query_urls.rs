use pretty_assertions::assert_eq;
use prefetch_core::{
    ConfigError, LanguageMode, PoolState, Query, QueryKind, QuerySettings, SchedulerConfig,
};

fn url(settings: &QuerySettings, subject: &str, kind: QueryKind) -> String {
    settings
        .url_for(&Query::new(subject, kind, 1))
        .unwrap()
        .to_string()
}

#[test]
fn default_templates_match_each_kind() {
    let settings = QuerySettings::default();
    assert_eq!(
        url(&settings, "run", QueryKind::Lookup),
        "https://www.collinsdictionary.com/dictionary/english/run"
    );
    assert_eq!(
        url(&settings, "run", QueryKind::ImageSearch),
        "https://www.google.com/search?tbm=isch&q=run"
    );
    assert_eq!(
        url(&settings, "run", QueryKind::Translate),
        "https://translate.google.com/?sl=en&tl=zh-CN&text=run"
    );
    assert_eq!(
        url(&settings, "run", QueryKind::WebSearch),
        "https://www.google.com/search?q=run"
    );
}

#[test]
fn subjects_are_percent_encoded() {
    let settings = QuerySettings::default();
    assert_eq!(
        url(&settings, "give up", QueryKind::Lookup),
        "https://www.collinsdictionary.com/dictionary/english/give%20up"
    );
    assert_eq!(
        url(&settings, "a&b=c", QueryKind::WebSearch),
        "https://www.google.com/search?q=a%26b%3Dc"
    );
    assert_eq!(
        url(&settings, "Straße", QueryKind::Lookup),
        "https://www.collinsdictionary.com/dictionary/english/Stra%C3%9Fe"
    );
}

#[test]
fn german_mode_switches_directory_and_pair() {
    let settings = QuerySettings::default().with_language(LanguageMode::German);
    assert_eq!(
        url(&settings, "Haus", QueryKind::Lookup),
        "https://www.collinsdictionary.com/dictionary/german-english/Haus"
    );
    assert_eq!(
        url(&settings, "Haus", QueryKind::Translate),
        "https://translate.google.com/?sl=de&tl=en&text=Haus"
    );
}

#[test]
fn custom_bases_are_honoured() {
    let settings = QuerySettings {
        dictionary_base: "http://127.0.0.1:8080".to_string(),
        ..QuerySettings::default()
    };
    assert_eq!(
        url(&settings, "run", QueryKind::Lookup),
        "http://127.0.0.1:8080/dictionary/english/run"
    );
    assert_eq!(
        settings.suggestion_from_final_url("runing", "http://127.0.0.1:8080/dictionary/english/running"),
        Some("running".to_string())
    );
}

#[test]
fn suggestion_rules() {
    let settings = QuerySettings::default();
    let base = "https://www.collinsdictionary.com/dictionary/english";

    assert_eq!(
        settings.suggestion_from_final_url("runing", &format!("{base}/running")),
        Some("running".to_string())
    );
    assert_eq!(
        settings.suggestion_from_final_url("run", &format!("{base}/run?showCookiePolicy=true")),
        None
    );
    assert_eq!(
        settings.suggestion_from_final_url("give up", &format!("{base}/give-up")),
        None
    );
    assert_eq!(
        settings.suggestion_from_final_url("well-known", &format!("{base}/well-known")),
        None
    );
    assert_eq!(
        settings.suggestion_from_final_url("cafe", &format!("{base}/caf%C3%A9")),
        Some("café".to_string())
    );
    // Landing on a search page or another host is not a suggestion.
    assert_eq!(
        settings.suggestion_from_final_url(
            "xyzzy",
            "https://www.collinsdictionary.com/spellcheck/english?q=xyzzy"
        ),
        None
    );
    assert_eq!(
        settings.suggestion_from_final_url("run", "https://example.com/dictionary/english/ran"),
        None
    );
}

#[test]
fn queries_compare_by_value() {
    let a = Query::lookup("run", 1);
    assert_eq!(a, Query::new("run", QueryKind::Lookup, 1));
    assert_ne!(a, Query::lookup("run", 2));
    assert_ne!(a, Query::new("run", QueryKind::WebSearch, 1));
    assert_eq!(a.to_string(), "lookup 'run' (#1)");
}

#[test]
fn config_validation_rejects_bad_values() {
    assert_eq!(
        PoolState::new(SchedulerConfig {
            baseline_size: 0,
            ..SchedulerConfig::default()
        })
        .unwrap_err(),
        ConfigError::ZeroBaseline
    );
    assert_eq!(
        SchedulerConfig {
            baseline_size: 5,
            max_workers: Some(3),
            ..SchedulerConfig::default()
        }
        .validate()
        .unwrap_err(),
        ConfigError::CapTooSmall {
            cap: 3,
            baseline: 5,
            minimum: 5,
        }
    );
    assert_eq!(
        SchedulerConfig {
            baseline_size: 1,
            max_workers: Some(1),
            ..SchedulerConfig::default()
        }
        .validate()
        .unwrap_err(),
        ConfigError::CapTooSmall {
            cap: 1,
            baseline: 1,
            minimum: 2,
        }
    );
    assert!(matches!(
        SchedulerConfig {
            delay_debounce: std::time::Duration::ZERO,
            ..SchedulerConfig::default()
        }
        .validate(),
        Err(ConfigError::ZeroDuration { .. })
    ));
    let bad_base = SchedulerConfig {
        query: QuerySettings {
            search_base: "mailto:someone@example.com".to_string(),
            ..QuerySettings::default()
        },
        ..SchedulerConfig::default()
    };
    assert!(matches!(
        bad_base.validate(),
        Err(ConfigError::InvalidBaseUrl { .. })
    ));
}

#[test]
fn fresh_pool_holds_baseline_free_workers() {
    let state = PoolState::new(SchedulerConfig::default()).unwrap();
    assert_eq!(state.worker_count(), 5);
    assert_eq!(state.usage().free, 5);
    assert_eq!(state.active_worker(), None);
}
