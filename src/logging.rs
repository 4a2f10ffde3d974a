//! # Structured Logging Module
//!
//! Environment-aware structured logging for the dispatch pipeline. Handler
//! failures are only ever reported through here, so the error helpers always
//! carry the record identity and the full error chain.

use crate::config::{LogFormat, ProcessorConfig};
use crate::orchestration::types::{BatchSummary, DispatchPhase};
use chrono::Utc;
use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging from the processor configuration.
///
/// Safe to call more than once; only the first call installs a subscriber,
/// and an already installed global subscriber is left in place.
pub fn init_structured_logging(config: &ProcessorConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let log_level = config.effective_log_level();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_level.clone()));

        let layer = match config.log_format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr)
                .boxed(),
        };

        if tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized, keeping it");
        }

        tracing::info!(
            environment = %config.environment,
            log_level = %log_level,
            log_format = ?config.log_format,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
pub fn get_environment() -> String {
    std::env::var("STREAM_DISPATCH_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
pub fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for record dispatch operations
pub fn log_record_operation(
    operation: &str,
    event_kind: &str,
    partition_key: &str,
    sort_key: &str,
    handler: Option<&str>,
    status: &str,
) {
    tracing::info!(
        operation = %operation,
        event_kind = %event_kind,
        partition_key = %partition_key,
        sort_key = %sort_key,
        handler = handler,
        status = %status,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 RECORD_OPERATION"
    );
}

/// Log a failed handler invocation with its full error chain
pub fn log_handler_error(
    phase: DispatchPhase,
    handler: &str,
    event_kind: &str,
    partition_key: &str,
    sort_key: &str,
    error: &anyhow::Error,
) {
    tracing::error!(
        operation = %phase,
        handler = %handler,
        event_kind = %event_kind,
        partition_key = %partition_key,
        sort_key = %sort_key,
        error = ?error,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ HANDLER_ERROR"
    );
}

/// Log the outcome of a processed batch
pub fn log_batch_summary(summary: &BatchSummary) {
    let has_failures = !summary.is_clean();
    if has_failures {
        tracing::warn!(
            batch_id = %summary.batch_id,
            records = summary.record_count,
            invocations = summary.handler_invocations,
            failures = summary.failure_count(),
            duration_ms = summary.duration_ms(),
            "📦 BATCH_COMPLETE with handler failures"
        );
    } else {
        tracing::info!(
            batch_id = %summary.batch_id,
            records = summary.record_count,
            invocations = summary.handler_invocations,
            duration_ms = summary.duration_ms(),
            "📦 BATCH_COMPLETE"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_detection() {
        std::env::set_var("STREAM_DISPATCH_ENV", "test_override");
        let env = get_environment();
        assert_eq!(env, "test_override");
        std::env::remove_var("STREAM_DISPATCH_ENV");
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = ProcessorConfig::default();
        init_structured_logging(&config);
        init_structured_logging(&config);
        assert!(LOGGER_INITIALIZED.get().is_some());
    }
}
