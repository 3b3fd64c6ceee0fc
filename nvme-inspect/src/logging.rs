// SPDX-License-Identifier: GPL-3.0-only

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LoggingConfig, LoggingLevel};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_PREFIX: &str = "nvme-inspect.log";
const KEEP_DAYS: u64 = 7;

/// Our crates log at `level`; everything else stays at warn
fn default_directives(level: LoggingLevel) -> String {
    let level = level.as_directive();
    format!("warn,nvme_inspect={level},nvme_health={level},nvme_sys={level}")
}

pub(crate) fn init(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(config.level)))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // Reports go to stdout, so logs stay on stderr
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let Some(dir) = config.log_dir.as_deref() else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
        return;
    };

    match file_writer(dir) {
        Ok((writer, guard)) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();

            let _ = LOG_GUARD.set(guard);
        }
        Err(e) => {
            eprintln!("nvme-inspect: failed to initialize file logging: {e:#}");
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
        }
    }
}

fn file_writer(
    dir: &Path,
) -> anyhow::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if let Err(e) = fs::create_dir_all(dir) {
        return Err(anyhow::anyhow!(
            "create log directory failed: {} ({})",
            dir.display(),
            e
        ));
    }

    let prefix = OsString::from(LOG_PREFIX);
    cleanup_old_logs(dir, &prefix);

    let appender = tracing_appender::rolling::daily(dir, &prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    Ok((writer, guard))
}

fn cleanup_old_logs(dir: &Path, prefix: &OsString) {
    let cutoff = SystemTime::now().checked_sub(Duration::from_secs(KEEP_DAYS * 24 * 60 * 60));
    let Some(cutoff) = cutoff else { return };

    let prefix = prefix.to_string_lossy();

    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        // Only rolled files of ours
        if !entry.file_name().to_string_lossy().starts_with(prefix.as_ref()) {
            continue;
        }

        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if modified >= cutoff {
            continue;
        }

        let _ = fs::remove_file(entry.path());
    }
}
