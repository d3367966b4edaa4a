use std::io::Write;
use std::path::Path;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Build the filter for a `tracing` level directive such as `"warn"`.
///
/// `RUST_LOG` takes precedence when set; an unparseable level falls back to
/// `"warn"`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Initialise the global `tracing` subscriber, writing to stderr so stdout
/// carries only the report.
pub fn setup_logging(level: &str) -> anyhow::Result<()> {
    let layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}

/// The single line printed to stderr when the run fails, with the full
/// context chain.
pub fn error_line(err: &anyhow::Error) -> String {
    format!("Error: {:#}", err)
}

// ── Output ─────────────────────────────────────────────────────────────────────

/// Write `report` to `output`, or to stdout when no path is given.
pub fn write_output(report: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, report)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            tracing::info!("Report written to {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(report.as_bytes())?;
            if !report.ends_with('\n') {
                handle.write_all(b"\n")?;
            }
            handle.flush()?;
        }
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
