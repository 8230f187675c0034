//! ---
//! flt_section: "01-core-functionality"
//! flt_subsection: "module"
//! flt_type: "source"
//! flt_scope: "code"
//! flt_description: "Shared primitives and utilities for the agent runtime."
//! flt_version: "v0.0.0-prealpha"
//! flt_owner: "tbd"
//! ---
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::AgentConfig;
use crate::version::VersionInfo;

const LOG_ENV: &str = "FLOTILLA_LOG";

/// Available log formats for the agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Flush guard for the agent's background log writers.
///
/// Hold it for the lifetime of the process; dropping it flushes buffered
/// events and stops the writer threads.
#[must_use = "dropping the guard stops the log writers"]
#[derive(Debug)]
pub struct TracingGuard {
    _file: WorkerGuard,
    _stdout: WorkerGuard,
}

/// Install the tracing subscriber for one agent instance.
///
/// Stdout gets the configured format; a rolling daily JSON file named after
/// the agent id (or the configured prefix) is kept for post-mortem analysis,
/// so operators can attribute log files to fleet members by name alone. The
/// build banner and any operator metadata labels from the configuration are
/// reported once at startup, tying every log file back to the agent that
/// produced it.
pub fn init_tracing(config: &AgentConfig) -> Result<TracingGuard> {
    let logging = &config.logging;
    std::fs::create_dir_all(&logging.directory)?;
    let prefix = logging.file_prefix.as_deref().unwrap_or(&config.agent_id);

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&logging.directory, format!("{prefix}.log")));
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let stdout_layer = match logging.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .json()
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer().with_writer(stdout_writer).boxed(),
    };
    let file_layer = fmt::layer().json().with_writer(file_writer).boxed();

    tracing_subscriber::registry()
        .with(log_filter())
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .ok();

    info!(
        agent = %config.agent_id,
        version = %VersionInfo::current().banner(),
        log_dir = %logging.directory.display(),
        format = ?logging.format,
        "tracing initialised"
    );
    for (label, value) in &config.metadata {
        info!(agent = %config.agent_id, %label, %value, "agent label");
    }

    Ok(TracingGuard {
        _file: file_guard,
        _stdout: stdout_guard,
    })
}

// `FLOTILLA_LOG` wins over `RUST_LOG`; without either the agent stays at
// `info` for quiet steady-state operation.
fn log_filter() -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!(
                "invalid {} directive ({}); defaulting to info logging",
                LOG_ENV, err
            );
            EnvFilter::new("info")
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;

    #[test]
    fn init_writes_rolling_log_file_named_after_agent() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig {
            agent_id: "agent-under-test".to_owned(),
            logging: LoggingConfig {
                directory: dir.path().to_path_buf(),
                format: LogFormat::Pretty,
                file_prefix: None,
            },
            metadata: [("site".to_owned(), "fra-02".to_owned())]
                .into_iter()
                .collect(),
        };

        let guard = init_tracing(&config).unwrap();
        info!("resolver heartbeat");
        // Dropping the guard flushes the non-blocking writers.
        drop(guard);

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(
            names.iter().any(|name| name.starts_with("agent-under-test")),
            "expected a rolling log file named after the agent, found: {names:?}"
        );
    }
}
