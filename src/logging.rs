//! Console and file logging.
//!
//! Two layers share one subscriber: a human-oriented console stream on
//! stderr and a persistent `warden.log` under the base directory. The
//! `WARDEN_LOG` environment variable overrides both with a full filter
//! directive (`debug`, `warn,warden::probe=trace`, ...); otherwise the
//! console follows the CLI verbosity and the file follows
//! `core.log_level`.
//!
//! There is no `critical` level. Events that leave the staging area in a
//! state needing operator attention are logged at `error` with a
//! `severity = "critical"` field so they can be filtered downstream.

use std::env;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::ColorMode;
use crate::paths::LOG_FILE_NAME;

const LOG_ENV: &str = "WARDEN_LOG";
const COLOR_ENV: &str = "WARDEN_COLOR";

static INIT: OnceCell<()> = OnceCell::new();

/// Keeps the file writer thread alive. Hold it in `main` for the whole
/// run; dropping it flushes and stops the writer.
pub struct LogGuard {
    _file: WorkerGuard,
}

/// Initialize both logging layers. Safe to call more than once; later
/// calls keep the first subscriber.
pub fn init(
    console_directive: &str,
    file_directive: &str,
    base_dir: &Path,
    color: ColorMode,
) -> Result<LogGuard> {
    std::fs::create_dir_all(base_dir)
        .with_context(|| format!("could not create log directory {}", base_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(base_dir, LOG_FILE_NAME);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    // WARDEN_LOG takes over both layers when set.
    let (console_filter, file_filter) = match env::var(LOG_ENV) {
        Ok(directive) if !directive.trim().is_empty() => {
            (parse_filter(&directive), parse_filter(&directive))
        }
        _ => (parse_filter(console_directive), parse_filter(file_directive)),
    };

    let console_layer = fmt::layer()
        .with_target(true)
        .with_ansi(ansi_enabled(color))
        .with_writer(io::stderr)
        .with_filter(console_filter);
    let file_layer = fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_writer(file_writer)
        .with_filter(file_filter);

    let registered = INIT.get_or_try_init(|| {
        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()
    });
    if let Err(err) = registered {
        eprintln!("warden: logging init skipped: {err}");
    }

    Ok(LogGuard { _file: file_guard })
}

fn parse_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|err| {
        eprintln!("warden: invalid log directive {directive:?} ({err}); using info");
        EnvFilter::new("info")
    })
}

/// Whether the console layer should emit ANSI colors. An explicit CLI
/// choice wins, then `WARDEN_COLOR`, then `NO_COLOR`, then a TTY check.
pub fn ansi_enabled(color: ColorMode) -> bool {
    match color {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            match env::var(COLOR_ENV).ok().as_deref() {
                Some("always") => return true,
                Some("never") => return false,
                _ => {}
            }
            if env::var_os("NO_COLOR").is_some() {
                return false;
            }
            atty::is(atty::Stream::Stderr)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_color_choice_wins() {
        assert!(ansi_enabled(ColorMode::Always));
        assert!(!ansi_enabled(ColorMode::Never));
    }

    #[test]
    fn bad_directive_falls_back() {
        // Must not panic; the fallback filter is usable.
        let _ = parse_filter("definitely(not)a[filter");
    }
}
