//! flurry: normalizes CSV objects into Parquet when a blob-created
//! notification arrives.
//!
//! Reads one notification (or an array of notifications) from a file or
//! stdin and runs one invocation per notification against the configured
//! storage account.

use chrono::Utc;
use clap::{Parser, ValueEnum};
use snafu::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flurry::error::{
    AppError, ConfigSnafu, EventSnafu, InvocationsFailedSnafu, ReadEventSnafu, StorageSetupSnafu,
};
use flurry::event::{Decoded, Notification, decode, parse_notifications};
use flurry::sink::{audit_log_name, output_name};
use flurry::{Config, ContainerStore, Handler, HandlerConfig, InvocationOutcome};

/// Event-triggered CSV to Parquet normalizer.
#[derive(Parser, Debug)]
#[command(name = "flurry")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Notification JSON file, or `-` for stdin.
    #[arg(short, long, default_value = "-")]
    event: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Dry run - decode notifications and report derived names without
    /// touching storage.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    match args.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let config = Config::from_file(&args.config).context(ConfigSnafu)?;
    let store = ContainerStore::new(&config.storage.url, config.storage.options.clone())
        .context(StorageSetupSnafu)?;

    let input = read_event_input(&args.event).await?;
    let notifications = parse_notifications(&input).context(EventSnafu)?;
    info!(
        "flurry received {} notification(s) for {}",
        notifications.len(),
        config.storage.url
    );

    let handler_config = config.handler_config();
    if args.dry_run {
        info!("Dry run mode - storage will not be accessed");
        for notification in &notifications {
            report_plan(notification, &handler_config);
        }
        return Ok(());
    }

    let handler = Handler::new(Arc::new(store), handler_config);
    run(&handler, &notifications).await
}

/// Run every notification as an independent invocation; a failure does not
/// stop the remaining ones.
async fn run(handler: &Handler, notifications: &[Notification]) -> Result<(), AppError> {
    let total = notifications.len();
    let mut failed = 0usize;

    for notification in notifications {
        match handler.handle(notification).await {
            Ok(InvocationOutcome::Processed(record)) => {
                info!(
                    event_id = %record.event_id,
                    rows = record.rows,
                    cols = record.cols,
                    "Processed {}",
                    record.processed_blob
                );
            }
            Ok(InvocationOutcome::Skipped(reason)) => {
                info!(
                    event_id = %notification.id,
                    reason = reason.as_str(),
                    "Skipped notification"
                );
            }
            Err(_) => failed += 1,
        }
    }

    ensure!(failed == 0, InvocationsFailedSnafu { failed, total });
    info!("All {} invocation(s) completed", total);
    Ok(())
}

async fn read_event_input(path: &str) -> Result<String, AppError> {
    let mut input = String::new();
    if path == "-" {
        tokio::io::stdin()
            .read_to_string(&mut input)
            .await
            .context(ReadEventSnafu { path })?;
    } else {
        input = tokio::fs::read_to_string(path)
            .await
            .context(ReadEventSnafu { path })?;
    }
    Ok(input)
}

fn report_plan(notification: &Notification, config: &HandlerConfig) {
    match decode(notification) {
        Decoded::Process(locator) => {
            info!(
                event_id = %notification.id,
                "Would read {locator}, write {}/{} and log {}/{}",
                config.output_container,
                output_name(&locator.name),
                config.log_container,
                audit_log_name(Utc::now(), &notification.id)
            );
        }
        Decoded::Skip(reason) => {
            warn!(
                event_id = %notification.id,
                reason = reason.as_str(),
                "Would skip notification"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use flurry::{BlobStore, ContentType};
    use std::collections::HashMap;

    async fn memory_handler() -> Handler {
        let store = ContainerStore::new("memory://", HashMap::new()).unwrap();
        store
            .write(
                "incoming",
                "a.csv",
                Bytes::from_static(b"x\n1\n"),
                ContentType::Json,
            )
            .await
            .unwrap();
        Handler::new(Arc::new(store), HandlerConfig::default())
    }

    #[tokio::test]
    async fn test_run_counts_failed_invocations() {
        let handler = memory_handler().await;
        let notifications = vec![
            Notification::new("evt-a", "https://h.example/incoming/a.csv"),
            Notification::new("evt-b", "https://h.example/incoming/missing.csv"),
            Notification::new("evt-c", "https://h.example/incoming/readme.md"),
        ];

        let err = run(&handler, &notifications).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InvocationsFailed {
                failed: 1,
                total: 3
            }
        ));
        assert_eq!(err.to_string(), "1 of 3 invocation(s) failed");
    }

    #[tokio::test]
    async fn test_run_succeeds_when_nothing_fails() {
        let handler = memory_handler().await;
        let notifications = vec![
            Notification::new("evt-a", "https://h.example/incoming/a.csv"),
            Notification::new("evt-c", "https://h.example/incoming/readme.md"),
        ];

        assert!(run(&handler, &notifications).await.is_ok());
    }
}
