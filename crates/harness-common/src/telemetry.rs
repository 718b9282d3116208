#![expect(clippy::print_stderr, reason = "Tracing not initialized yet")]

//! Telemetry and tracing setup.
//!
//! The filter comes from `RUST_LOG`. `CONTRACT_HARNESS_LOG` redirects output to a
//! file, `CONTRACT_HARNESS_LOG_FORMAT` selects `text` or `json` and
//! `CONTRACT_HARNESS_LOG_STREAM` selects `stderr` or `stdout`.
//! `CONTRACT_HARNESS_LOG_SPANS=1` logs every closed span with its busy and idle
//! time, which gives per-case and per-step timings for a suite run.

use std::io::IsTerminal;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

const LOG_FILE_ENV: &str = "CONTRACT_HARNESS_LOG";
const LOG_FORMAT_ENV: &str = "CONTRACT_HARNESS_LOG_FORMAT";
const LOG_STREAM_ENV: &str = "CONTRACT_HARNESS_LOG_STREAM";
const LOG_SPANS_ENV: &str = "CONTRACT_HARNESS_LOG_SPANS";

/// Keeps the non-blocking file writer flushing until dropped.
#[derive(Debug)]
pub struct TelemetryGuard {
    _guard: Option<WorkerGuard>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum LogOutput {
    File(PathBuf),
    Stdout,
    Stderr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct LogSettings {
    format: LogFormat,
    output: LogOutput,
    span_timings: bool,
}

impl LogSettings {
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let format = match value(LOG_FORMAT_ENV).map(|v| v.to_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let output = match value(LOG_FILE_ENV) {
            Some(path) => LogOutput::File(PathBuf::from(path)),
            None => match value(LOG_STREAM_ENV).map(|v| v.to_lowercase()).as_deref() {
                Some("stdout") => LogOutput::Stdout,
                _ => LogOutput::Stderr,
            },
        };
        let span_timings = value(LOG_SPANS_ENV)
            .is_some_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"));

        Self {
            format,
            output,
            span_timings,
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_timings {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

fn open_writer(output: &LogOutput) -> (BoxMakeWriter, Option<WorkerGuard>, bool) {
    match output {
        LogOutput::File(path) => match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                (BoxMakeWriter::new(non_blocking), Some(guard), false)
            }
            Err(err) => {
                eprintln!(
                    "Warning: failed to open log file {}: {}",
                    path.display(),
                    err
                );
                open_writer(&LogOutput::Stderr)
            }
        },
        LogOutput::Stdout => (
            BoxMakeWriter::new(std::io::stdout),
            None,
            std::io::stdout().is_terminal(),
        ),
        LogOutput::Stderr => (
            BoxMakeWriter::new(std::io::stderr),
            None,
            std::io::stderr().is_terminal(),
        ),
    }
}

pub fn init_tracing(default_level: &str) -> TelemetryGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let settings = LogSettings::from_env();
    let (writer, guard, ansi) = open_writer(&settings.output);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_span_events(settings.span_events())
        .with_writer(writer);
    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = match settings.format {
        LogFormat::Json => Box::new(builder.with_ansi(false).json().finish()),
        LogFormat::Text => Box::new(builder.with_ansi(ansi).finish()),
    };

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return TelemetryGuard { _guard: None };
    }
    TelemetryGuard { _guard: guard }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        LogSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_to_text_on_stderr() {
        assert_eq!(
            settings(&[]),
            LogSettings {
                format: LogFormat::Text,
                output: LogOutput::Stderr,
                span_timings: false,
            }
        );
    }

    #[test]
    fn test_format_and_stream_are_case_insensitive() {
        let parsed = settings(&[(LOG_FORMAT_ENV, " JSON "), (LOG_STREAM_ENV, "Stdout")]);
        assert_eq!(parsed.format, LogFormat::Json);
        assert_eq!(parsed.output, LogOutput::Stdout);
    }

    #[test]
    fn test_log_file_wins_over_stream() {
        let parsed = settings(&[
            (LOG_FILE_ENV, "/tmp/harness.log"),
            (LOG_STREAM_ENV, "stdout"),
        ]);
        assert_eq!(
            parsed.output,
            LogOutput::File(PathBuf::from("/tmp/harness.log"))
        );
    }

    #[test]
    fn test_blank_log_file_is_ignored() {
        let parsed = settings(&[(LOG_FILE_ENV, "   ")]);
        assert_eq!(parsed.output, LogOutput::Stderr);
    }

    #[test]
    fn test_span_timings_switch() {
        assert_eq!(settings(&[(LOG_SPANS_ENV, "1")]).span_events(), FmtSpan::CLOSE);
        assert_eq!(settings(&[(LOG_SPANS_ENV, "on")]).span_events(), FmtSpan::CLOSE);
        assert_eq!(settings(&[(LOG_SPANS_ENV, "0")]).span_events(), FmtSpan::NONE);
        assert_eq!(settings(&[]).span_events(), FmtSpan::NONE);
    }
}
