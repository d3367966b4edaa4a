use std::process::ExitCode;

use anyhow::{Context, Result};
use usage_analysis::engine::{analyze, export_json};
use usage_analysis::reader::load_events;
use usage_core::settings::Settings;
use usage_report::{bootstrap, render};

fn main() -> ExitCode {
    let settings = Settings::load();

    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", bootstrap::error_line(&e));
            ExitCode::FAILURE
        }
    }
}

fn run(settings: &Settings) -> Result<()> {
    bootstrap::setup_logging(settings.tracing_level())?;
    tracing::info!("usage-report v{} starting", env!("CARGO_PKG_VERSION"));

    let loaded = load_events(&settings.input)
        .with_context(|| format!("failed to load usage from {}", settings.input.display()))?;
    tracing::info!(
        "Loaded {} events from {} files ({} skipped)",
        loaded.events.len(),
        loaded.files,
        loaded.skipped
    );

    let result = analyze(&loaded.events)?;

    let report = if settings.json {
        export_json(&result, settings.pretty)?
    } else {
        render::render_text(&result)
    };

    bootstrap::write_output(&report, settings.output.as_deref())
}
