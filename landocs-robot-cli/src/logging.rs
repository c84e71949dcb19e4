use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use landocs_robot::RobotConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// `LOG_LEVEL` wins over the configured level; unknown names mean info.
pub fn log_level(configured: &str) -> Level {
    let level = env::var("LOG_LEVEL").unwrap_or_else(|_| configured.to_string());
    match level.trim().to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" | "warning" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Stderr plus a daily `yyyy-MM-dd.log` file in the configured log folder.
/// The returned guard flushes the file writer on drop.
pub fn init_logging(config: &RobotConfig) -> Result<WorkerGuard> {
    let level = log_level(&config.log_level);
    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("creating log folder {}", config.log_dir.display()))?;
    let removed = remove_stale_logs(&config.log_dir, config.log_retention_days, Utc::now());

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_suffix("log")
        .max_log_files(config.log_retention_days.max(1))
        .build(&config.log_dir)
        .context("creating the rolling log file")?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::from_default_env().add_directive(level.into())),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_filter(EnvFilter::from_default_env().add_directive(level.into())),
        )
        .try_init()
        .context("installing the log subscriber")?;

    for path in removed {
        tracing::debug!("removed stale log {}", path.display());
    }
    Ok(guard)
}

/// Deletes `*.log` files in `dir` last modified more than `retention_days`
/// before `now`. Returns what was removed; unreadable entries are skipped.
pub fn remove_stale_logs(dir: &Path, retention_days: usize, now: DateTime<Utc>) -> Vec<PathBuf> {
    let cutoff = now - ChronoDuration::days(retention_days as i64);
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut removed = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let is_log = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("log"));
        if !is_log {
            continue;
        }
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if DateTime::<Utc>::from(modified) < cutoff && fs::remove_file(&path).is_ok() {
            removed.push(path);
        }
    }
    removed
}
