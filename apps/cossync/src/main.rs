//! cossync - sync a local directory with an object storage bucket.
//!
//! Runs one command per invocation, configured entirely through the
//! environment so it can be dropped into a CI pipeline as a plugin step.
//!
//! # Usage
//!
//! ```text
//! PLUGIN_COMMAND=upload PLUGIN_BUCKET=site-1250000000 PLUGIN_REGION=ap-guangzhou \
//! PLUGIN_KEY=releases/v1 PLUGIN_LOCAL_PATH=./dist \
//! COS_SECRETID=... COS_SECRETKEY=... cossync
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PLUGIN_COMMAND` | `upload` | `upload`, `download` or `delete` |
//! | `PLUGIN_BUCKET` | *(required)* | Bucket name |
//! | `PLUGIN_REGION` | *(required)* | Bucket region |
//! | `PLUGIN_KEY` / `PLUGIN_TARGET` | *(required)* | Base remote key |
//! | `PLUGIN_LOCAL_PATH` / `PLUGIN_SOURCE` | *(required unless delete)* | Local file or directory |
//! | `PLUGIN_SECRET_ID` / `COS_SECRETID` | *(required)* | Access key id |
//! | `PLUGIN_SECRET_KEY` / `COS_SECRETKEY` | *(required)* | Secret access key |
//! | `PLUGIN_ENDPOINT` | `https://cos.<region>.myqcloud.com` | Endpoint override |
//! | `PLUGIN_PATH_STYLE` | `false` | Path-style bucket addressing |
//! | `PLUGIN_REQUEST_TIMEOUT` | `100` | Per-request timeout in seconds |
//! | `PLUGIN_TIMEOUT` | *(unset)* | Deadline for the whole run in seconds |
//! | `PLUGIN_LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `PLUGIN_LOG_LEVEL`) |
//!
//! The process exits non-zero when configuration or connection setup fails,
//! when enumeration halts early, or when the run is cancelled. Individual
//! transfer failures are logged and do not change the exit status.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cossync_core::{HaltReason, SharedStore, SyncConfig, SyncDriver, SyncReport};
use cossync_s3::S3ObjectStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `PLUGIN_LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Cancel `cancel` on Ctrl-C, or once `timeout_secs` elapses.
fn install_cancellation(cancel: &CancellationToken, timeout_secs: Option<u64>) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = on_signal.cancelled() => {}
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    warn!("interrupt received, cancelling sync");
                    on_signal.cancel();
                }
                Err(e) => error!(error = %e, "failed to listen for interrupt"),
            },
        }
    });

    if let Some(secs) = timeout_secs {
        let on_deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = on_deadline.cancelled() => {}
                () = tokio::time::sleep(Duration::from_secs(secs)) => {
                    warn!(timeout_secs = secs, "deadline reached, cancelling sync");
                    on_deadline.cancel();
                }
            }
        });
    }
}

fn connect(config: &SyncConfig) -> cossync_core::SyncResult<SharedStore> {
    let store = S3ObjectStore::connect(config)?;
    Ok(Arc::new(store))
}

/// Map a finished run to the process exit status.
fn exit_code(report: &SyncReport) -> ExitCode {
    match &report.halted {
        None => ExitCode::SUCCESS,
        Some(HaltReason::Cancelled) => {
            error!("sync cancelled before completion");
            ExitCode::FAILURE
        }
        Some(HaltReason::Enumeration(reason)) => {
            error!(reason = %reason, "sync halted before completion");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: SyncConfig) -> ExitCode {
    let cancel = CancellationToken::new();
    install_cancellation(&cancel, config.timeout_secs);

    let mut driver = SyncDriver::new(config);
    let outcome = driver.run(connect, &cancel).await;
    cancel.cancel();

    match outcome {
        Ok(report) => {
            for item in &report.summary.failed {
                warn!(source = %item.source, dest = %item.dest, status = ?item.status, "item failed");
            }
            info!(
                succeeded = report.summary.succeeded,
                failed = report.summary.failed.len(),
                skipped = report.summary.skipped,
                "summary"
            );
            exit_code(&report)
        }
        Err(e) => {
            error!(error = %e, "sync failed");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let config = SyncConfig::from_env();
    init_tracing(&config.log_level)?;

    info!(version = env!("CARGO_PKG_VERSION"), "cossync starting");

    Ok(run(config).await)
}
