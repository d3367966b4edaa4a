use clap::Parser;
use std::path::PathBuf;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Cost, efficiency and savings report for AI coding-tool usage
#[derive(Parser, Debug, Clone)]
#[command(
    name = "usage-report",
    about = "Cost, efficiency and savings report for AI coding-tool usage",
    version
)]
pub struct Settings {
    /// Usage events: a .json array, a .jsonl file, or a directory of them
    pub input: PathBuf,

    /// Emit the full analysis as JSON instead of the text summary
    #[arg(long)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Write the report to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse an explicit argument list and apply derived overrides.
    pub fn from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let settings = Settings::try_parse_from(args)?;
        Ok(settings.resolve())
    }

    /// Parse the process arguments, exiting with usage on error.
    pub fn load() -> Self {
        Settings::parse().resolve()
    }

    /// `--debug` overrides the log level.
    fn resolve(mut self) -> Self {
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }

    /// `tracing` filter directive for the configured level.
    pub fn tracing_level(&self) -> &'static str {
        match self.log_level.to_uppercase().as_str() {
            "DEBUG" => "debug",
            "INFO" => "info",
            "ERROR" => "error",
            _ => "warn",
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::from_args(["usage-report", "events.jsonl"]).unwrap();
        assert_eq!(s.input, PathBuf::from("events.jsonl"));
        assert!(!s.json);
        assert!(!s.pretty);
        assert!(s.output.is_none());
        assert_eq!(s.log_level, "WARNING");
        assert_eq!(s.tracing_level(), "warn");
    }

    #[test]
    fn test_json_output_flags() {
        let s = Settings::from_args([
            "usage-report",
            "events.json",
            "--json",
            "--pretty",
            "--output",
            "report.json",
        ])
        .unwrap();
        assert!(s.json);
        assert!(s.pretty);
        assert_eq!(s.output, Some(PathBuf::from("report.json")));
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let s = Settings::from_args(["usage-report", "x.json", "--log-level", "ERROR", "--debug"])
            .unwrap();
        assert_eq!(s.log_level, "DEBUG");
        assert_eq!(s.tracing_level(), "debug");
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let res = Settings::from_args(["usage-report", "x.json", "--log-level", "TRACE"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_missing_input_rejected() {
        assert!(Settings::from_args(["usage-report"]).is_err());
    }
}
