use crate::shared::paths::ensure_dir;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Targets that get their own log file. Anything else lands in `system.log`.
pub const LOG_TARGETS: [&str; 3] = ["sync", "planner", "session"];
pub const SYSTEM_TARGET: &str = "system";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to create logs directory: {0}")]
    Directory(#[from] std::io::Error),
    #[error("Failed to set global tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Keeps the non-blocking writers flushing. Drop it and buffered lines are lost.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

/// Which log file a tracing target belongs to: `sync::cache` → `sync`.
pub fn route_target(target: &str) -> &'static str {
    LOG_TARGETS
        .iter()
        .find(|name| {
            target == **name
                || target
                    .strip_prefix(**name)
                    .is_some_and(|rest| rest.starts_with("::"))
        })
        .copied()
        .unwrap_or(SYSTEM_TARGET)
}

struct TargetWriter {
    writers: HashMap<&'static str, NonBlocking>,
    system_writer: NonBlocking,
}

impl<'a> MakeWriter<'a> for TargetWriter {
    type Writer = NonBlocking;

    fn make_writer(&'a self) -> Self::Writer {
        self.system_writer.clone()
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        self.writers
            .get(route_target(meta.target()))
            .unwrap_or(&self.system_writer)
            .clone()
    }
}

/// Install the global subscriber writing one daily-rolling file per target
/// under `log_dir`. `filter` is used when `RUST_LOG` is unset.
pub fn init_logging(log_dir: &Path, filter: &str) -> Result<LoggingGuards, LoggingError> {
    ensure_dir(log_dir)?;

    let mut guards = Vec::new();
    let mut writers = HashMap::new();

    for target in LOG_TARGETS {
        let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, format!("{}.log", target));
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        writers.insert(target, non_blocking);
        guards.push(guard);
    }

    let system_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "system.log");
    let (system_writer, system_guard) = tracing_appender::non_blocking(system_appender);
    guards.push(system_guard);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(TargetWriter {
                writers,
                system_writer,
            })
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false),
    );

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(target: "system", "Logging initialized at {:?}", log_dir);

    Ok(LoggingGuards { _guards: guards })
}

/// Forward a log line from the host UI into the matching target file.
pub fn log_from_host(target: &str, level: &str, message: &str, context: Option<serde_json::Value>) {
    let ctx = context.map(|c| format!(" {}", c)).unwrap_or_default();

    macro_rules! emit {
        ($target:expr) => {
            match level {
                "trace" => tracing::trace!(target: $target, "{}{}", message, ctx),
                "debug" => tracing::debug!(target: $target, "{}{}", message, ctx),
                "warn" => tracing::warn!(target: $target, "{}{}", message, ctx),
                "error" => tracing::error!(target: $target, "{}{}", message, ctx),
                _ => tracing::info!(target: $target, "{}{}", message, ctx),
            }
        };
    }

    // tracing needs static targets
    match route_target(target) {
        "sync" => emit!("sync"),
        "planner" => emit!("planner"),
        "session" => emit!("session"),
        _ => emit!("system"),
    }
}

#[macro_export]
macro_rules! log_target {
    ($target:expr, $level:ident, $($arg:tt)+) => {
        tracing::$level!(target: $target, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_target() {
        assert_eq!(route_target("sync"), "sync");
        assert_eq!(route_target("sync::cache"), "sync");
        assert_eq!(route_target("planner"), "planner");
        assert_eq!(route_target("synchronize"), SYSTEM_TARGET);
        assert_eq!(route_target("studyplan_lib::storage"), SYSTEM_TARGET);
    }

    #[test]
    fn test_log_from_host_accepts_unknown_levels() {
        // no subscriber installed; must not panic
        log_from_host("planner", "verbose", "hello", Some(serde_json::json!({"a": 1})));
        log_from_host("whatever", "error", "boom", None);
    }
}
