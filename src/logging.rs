//! Tracing subscriber setup.
//!
//! Output goes to stdout, stderr, an append-mode file, or nowhere. The
//! filter comes from `RUST_LOG` when set, otherwise from the configured
//! level; `--verbose` forces `debug`.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Off,
    Stdout,
    Stderr,
    File(PathBuf),
}

impl LogOutput {
    /// Parse `0`/`off`, `1`/`stdout`, `2`/`stderr`, or a file name.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "2" | "stderr" => LogOutput::Stderr,
            "0" | "off" => LogOutput::Off,
            "1" | "stdout" => LogOutput::Stdout,
            filename => LogOutput::File(PathBuf::from(filename)),
        }
    }
}

/// Pick the filter directive: `--verbose` beats `RUST_LOG`, which beats the
/// configured level.
fn filter_directive(level: &str, verbose: bool, rust_log: Option<String>) -> String {
    if verbose {
        return "debug".to_string();
    }
    rust_log
        .filter(|directive| !directive.trim().is_empty())
        .unwrap_or_else(|| level.to_string())
}

/// Install the global tracing subscriber.
pub fn init_logging(output: &LogOutput, level: &str, verbose: bool) -> Result<()> {
    let directive = filter_directive(level, verbose, std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter: {}", directive))?;

    match output {
        LogOutput::Off => {}
        LogOutput::Stdout => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogOutput::Stderr => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_output_values() {
        assert_eq!(LogOutput::parse("0"), LogOutput::Off);
        assert_eq!(LogOutput::parse("off"), LogOutput::Off);
        assert_eq!(LogOutput::parse("1"), LogOutput::Stdout);
        assert_eq!(LogOutput::parse("2"), LogOutput::Stderr);
        assert_eq!(LogOutput::parse("stderr"), LogOutput::Stderr);
        assert_eq!(
            LogOutput::parse("logs/chantier.log"),
            LogOutput::File(PathBuf::from("logs/chantier.log"))
        );
    }

    #[test]
    fn filter_precedence() {
        assert_eq!(filter_directive("warn", false, None), "warn");
        assert_eq!(
            filter_directive("warn", false, Some("chantier_tracker=trace".into())),
            "chantier_tracker=trace"
        );
        assert_eq!(filter_directive("warn", false, Some("  ".into())), "warn");
        assert_eq!(filter_directive("warn", true, Some("error".into())), "debug");
    }
}
