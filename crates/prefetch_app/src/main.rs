mod cli;
mod config;
mod session;

use std::io;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use prefetch_core::Query;
use prefetch_engine::SchedulerHandle;
use prefetch_logging::{prefetch_debug, prefetch_info, prefetch_warn, LevelFilter, LogDestination};

use crate::cli::Cli;
use crate::config::AppError;
use crate::session::Session;

/// How long to keep listening for late frequency results once every word was shown.
const SETTLE: Duration = Duration::from_millis(750);

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    match &cli.log_file {
        Some(path) => prefetch_logging::initialize(LogDestination::File(path.clone()), level),
        None => prefetch_logging::initialize(LogDestination::Terminal, LevelFilter::Warn),
    }

    let mut app_config = config::load(&cli.config)?;
    if let Some(language) = cli.language {
        app_config.language = language;
    }
    if cli.write_config {
        config::save(&cli.config, &app_config)?;
    }

    let words = if cli.words.is_empty() {
        cli::read_words(io::stdin().lock()).map_err(AppError::Words)?
    } else {
        cli.words.clone()
    };
    if words.is_empty() {
        return Err(AppError::NoWords.into());
    }
    let queries: Vec<Query> = words
        .iter()
        .zip(1..)
        .map(|(word, id)| Query::new(word.as_str(), cli.kind.into(), id))
        .collect();

    let handle = SchedulerHandle::new(app_config.scheduler_config(), app_config.fetch_settings())
        .map_err(AppError::from)?;
    let mut session = Session::new(queries);
    run_session(&handle, &mut session, &cli);

    println!();
    for line in session.summary() {
        println!("{line}");
    }
    Ok(())
}

fn run_session(handle: &SchedulerHandle, session: &mut Session, cli: &Cli) {
    let Some(first) = session.current().cloned() else {
        return;
    };
    for query in session.upcoming() {
        handle.prefetch_queued(query.clone());
    }
    prefetch_info!("Requesting {} with {} queued", first, session.upcoming().len());
    handle.request(first);

    loop {
        let wait = if session.all_visited() {
            SETTLE
        } else {
            cli.idle()
        };
        let Some(notification) = handle.recv_timeout(wait) else {
            if !session.all_visited() {
                prefetch_warn!("No scheduler activity for {:?}; giving up", wait);
            }
            break;
        };
        if let Some(line) = session.describe(&notification, cli.verbose) {
            println!("[{}] {line}", Local::now().format("%H:%M:%S%.3f"));
        }
        if let Some(next) = session.observe(&notification) {
            handle.request(next);
        }
        for correlation_id in session.take_settled() {
            prefetch_debug!("Discarding pages for #{}", correlation_id);
            handle.discard_by_correlation_id(correlation_id);
        }
    }
}
