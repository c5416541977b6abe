use std::fs::OpenOptions;
use std::path::PathBuf;

use log::{LevelFilter, info};
use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode, WriteLogger};

use crate::config::Settings;
use crate::registry::Dispatch;

/// Install the stderr logger and, if configured, the dispatch log file.
///
/// Best-effort: a log file that cannot be opened is skipped, and a second
/// call keeps the logger installed by the first (logging must never block a
/// dispatch).
pub fn init(settings: &Settings) {
    let level = settings.log_level.parse().unwrap_or(LevelFilter::Warn);
    let config = ConfigBuilder::new().set_target_level(LevelFilter::Off).build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let Some(path) = log_path(&settings.log_file)
        && let Some(dir) = path.parent()
        && std::fs::create_dir_all(dir).is_ok()
        && let Ok(file) = OpenOptions::new().create(true).append(true).open(&path)
    {
        loggers.push(WriteLogger::new(level.max(LevelFilter::Info), config, file));
    }
    let _ = CombinedLogger::init(loggers);
}

/// Expand `~` and environment variables. Empty or unexpandable paths disable
/// the file log.
fn log_path(raw: &str) -> Option<PathBuf> {
    if raw.trim().is_empty() {
        return None;
    }
    shellexpand::full(raw).ok().map(|p| PathBuf::from(p.as_ref()))
}

/// Record one dispatch outcome as a single tab-separated line.
pub fn log_outcome<S>(line: &str, outcome: &Dispatch<'_, S>) {
    let line_truncated: String = line.chars().take(200).collect();
    let command = outcome.command().map(|c| c.name()).unwrap_or("-");
    let usage = outcome
        .search()
        .and_then(|s| s.usage().or_else(|| s.closest_usage()))
        .map(|u| u.handler())
        .unwrap_or("-");
    info!(
        "{status}\t{command}\t{usage}\t{line}",
        status = outcome.status().as_str(),
        line = line_truncated,
    );
}
