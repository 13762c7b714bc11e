use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use prefetch_core::QueryKind;

use crate::config::{Language, DEFAULT_CONFIG_FILENAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum KindArg {
    Lookup,
    Images,
    Translate,
    Search,
}

impl From<KindArg> for QueryKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Lookup => QueryKind::Lookup,
            KindArg::Images => QueryKind::ImageSearch,
            KindArg::Translate => QueryKind::Translate,
            KindArg::Search => QueryKind::WebSearch,
        }
    }
}

/// Steps through a word list, prefetching the pages ahead of the current word.
#[derive(Debug, Parser)]
#[command(name = "prefetch", version)]
pub struct Cli {
    /// Words to look up, in order. Read from stdin (one per line) when omitted.
    pub words: Vec<String>,

    /// Settings file (RON).
    #[arg(long, default_value = DEFAULT_CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Write the effective settings back to the config file.
    #[arg(long)]
    pub write_config: bool,

    #[arg(long, value_enum, default_value_t = KindArg::Lookup)]
    pub kind: KindArg,

    /// Overrides the language in the config file.
    #[arg(long, value_enum)]
    pub language: Option<Language>,

    /// Log to this file instead of the terminal.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,

    /// Give up after this many seconds without any scheduler activity.
    #[arg(long, default_value_t = 30)]
    pub idle_secs: u64,
}

impl Cli {
    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }
}

/// One word per line; blank lines and `#` comments are skipped.
pub fn read_words(reader: impl BufRead) -> io::Result<Vec<String>> {
    let mut words = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let word = line.trim();
        if word.is_empty() || word.starts_with('#') {
            continue;
        }
        words.push(word.to_string());
    }
    Ok(words)
}
