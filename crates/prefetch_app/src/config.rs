use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use prefetch_core::{LanguageMode, QuerySettings, SchedulerConfig};
use prefetch_engine::{EngineError, FetchSettings};
use prefetch_logging::{prefetch_info, prefetch_warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILENAME: &str = "prefetch.ron";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("failed to read config {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
    #[error("failed to write config {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to read words: {0}")]
    Words(io::Error),
    #[error("no words to look up")]
    NoWords,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Language {
    English,
    German,
}

impl From<Language> for LanguageMode {
    fn from(language: Language) -> Self {
        match language {
            Language::English => LanguageMode::English,
            Language::German => LanguageMode::German,
        }
    }
}

/// On-disk settings. Durations are stored in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub baseline_workers: usize,
    pub max_workers: Option<usize>,
    pub prefetch_interval_ms: u64,
    pub debounce_ms: u64,
    pub worker_timeout_ms: u64,
    pub language: Language,
    pub dictionary_base: String,
    pub search_base: String,
    pub translate_base: String,
    pub request_timeout_ms: u64,
    pub max_page_bytes: u64,
    pub user_agent: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let scheduler = SchedulerConfig::default();
        let fetch = FetchSettings::default();
        Self {
            baseline_workers: scheduler.baseline_size,
            max_workers: scheduler.max_workers,
            prefetch_interval_ms: millis(scheduler.prefetch_interval),
            debounce_ms: millis(scheduler.delay_debounce),
            worker_timeout_ms: millis(scheduler.worker_timeout),
            language: Language::English,
            dictionary_base: scheduler.query.dictionary_base,
            search_base: scheduler.query.search_base,
            translate_base: scheduler.query.translate_base,
            request_timeout_ms: millis(fetch.request_timeout),
            max_page_bytes: fetch.max_bytes,
            user_agent: None,
        }
    }
}

impl AppConfig {
    pub fn query_settings(&self) -> QuerySettings {
        QuerySettings {
            dictionary_base: self.dictionary_base.clone(),
            search_base: self.search_base.clone(),
            translate_base: self.translate_base.clone(),
            ..QuerySettings::default()
        }
        .with_language(self.language.into())
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            baseline_size: self.baseline_workers,
            prefetch_interval: Duration::from_millis(self.prefetch_interval_ms),
            delay_debounce: Duration::from_millis(self.debounce_ms),
            worker_timeout: Duration::from_millis(self.worker_timeout_ms),
            max_workers: self.max_workers,
            query: self.query_settings(),
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        let defaults = FetchSettings::default();
        FetchSettings {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            max_bytes: self.max_page_bytes,
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| defaults.user_agent.clone()),
            ..defaults
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Reads the config file; a missing file yields the defaults.
pub fn load(path: &Path) -> Result<AppConfig, AppError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            prefetch_info!("No config at {:?}; using defaults", path);
            return Ok(AppConfig::default());
        }
        Err(source) => {
            return Err(AppError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let config: AppConfig = ron::from_str(&content).map_err(|source| AppError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if let Err(err) = config.scheduler_config().validate() {
        prefetch_warn!("Config {:?} will be rejected: {}", path, err);
    }
    prefetch_info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Writes the config to a temporary sibling, then renames it into place.
pub fn save(path: &Path, config: &AppConfig) -> Result<(), AppError> {
    let pretty = ron::ser::PrettyConfig::new();
    let content = ron::ser::to_string_pretty(config, pretty)?;

    let tmp = path.with_extension("ron.tmp");
    let write_err = |source| AppError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(&tmp, content).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)?;
    prefetch_info!("Saved config to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join(DEFAULT_CONFIG_FILENAME)).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.scheduler_config(), SchedulerConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILENAME);
        fs::write(
            &path,
            "(baseline_workers: 3, worker_timeout_ms: 1500, language: German)",
        )
        .unwrap();

        let config = load(&path).unwrap();
        let scheduler = config.scheduler_config();
        assert_eq!(scheduler.baseline_size, 3);
        assert_eq!(scheduler.worker_timeout, Duration::from_millis(1500));
        assert_eq!(scheduler.prefetch_interval, Duration::from_secs(5));
        assert_eq!(scheduler.query.dictionary_directory, "german-english");
        assert_eq!(scheduler.query.translate_from, "de");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILENAME);
        fs::write(&path, "(baseline_workers: \"many\")").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }), "got {err:?}");
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DEFAULT_CONFIG_FILENAME);
        let config = AppConfig {
            max_workers: Some(8),
            debounce_ms: 750,
            user_agent: Some("prefetch-test".to_string()),
            ..AppConfig::default()
        };

        save(&path, &config).unwrap();
        assert!(!path.with_extension("ron.tmp").exists());
        assert_eq!(load(&path).unwrap(), config);
        assert_eq!(config.fetch_settings().user_agent, "prefetch-test");
    }
}
