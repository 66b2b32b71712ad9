//! Tracing subscriber initialisation for depot.
//!
//! Settings come from the `[logging]` section of the configuration file and
//! can be overridden with `LOG_LEVEL`, `LOG_FORMAT`, `LOG_OUTPUT`,
//! and `LOG_FILE_PATH`. `RUST_LOG`, when set, wins over the level.

use std::{
    env,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::ParseError,
    fmt::writer::{BoxMakeWriter, MakeWriterExt},
    layer::Layer,
    prelude::*,
    registry::Registry,
    util::TryInitError,
    EnvFilter,
};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter directive: {0}")]
    Directive(#[from] ParseError),

    #[error("failed to install the tracing subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
    None,
}

impl LogOutput {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "console" => Some(Self::Console),
            "file" => Some(Self::File),
            "both" => Some(Self::Both),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter directive, e.g. `info` or `depot_server=debug,info`.
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Log file; rotated daily, the date is appended to the file name.
    pub file: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Human,
            output: LogOutput::Console,
            file: PathBuf::from("depot.log"),
        }
    }
}

impl LogSettings {
    /// Apply the `LOG_*` environment variable overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(level) = lookup("LOG_LEVEL") {
            self.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.format = if format == "json" {
                LogFormat::Json
            } else {
                LogFormat::Human
            };
        }
        if let Some(output) = lookup("LOG_OUTPUT").as_deref().and_then(LogOutput::parse) {
            self.output = output;
        }
        if let Some(path) = lookup("LOG_FILE_PATH") {
            self.file = PathBuf::from(path);
        }
        self
    }

    fn log_file(&self) -> (&Path, &std::ffi::OsStr) {
        let dir = self
            .file
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = self.file.file_name().unwrap_or("depot.log".as_ref());
        (dir, name)
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn fmt_layer(writer: BoxMakeWriter, format: LogFormat, ansi: bool) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);
    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Human => layer.boxed(),
    }
}

fn env_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };
    Ok(filter
        .add_directive("tokio=warn".parse()?)
        .add_directive("hyper=warn".parse()?))
}

/// Installs the global tracing subscriber.
///
/// Returns the guard of the background file writer, if any; it must be kept
/// alive for as long as logs should be flushed to the file.
pub fn init_subscriber(settings: &LogSettings) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = env_filter(&settings.level)?;

    let mut guard = None;
    let mut file_writer = || {
        let (dir, name) = settings.log_file();
        let (writer, worker_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
        guard = Some(worker_guard);
        writer
    };

    let output = match settings.output {
        LogOutput::Console => Some(fmt_layer(
            BoxMakeWriter::new(std::io::stdout),
            settings.format,
            true,
        )),
        LogOutput::File => Some(fmt_layer(
            BoxMakeWriter::new(file_writer()),
            settings.format,
            false,
        )),
        LogOutput::Both => Some(fmt_layer(
            BoxMakeWriter::new(std::io::stdout.and(file_writer())),
            settings.format,
            false,
        )),
        LogOutput::None => None,
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::ffi::OsStr;

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: LogSettings =
            serde_json::from_str(r#"{"format":"json","output":"both"}"#).unwrap();
        assert_eq!(settings.level, "info");
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.output, LogOutput::Both);
        assert_eq!(settings.file, PathBuf::from("depot.log"));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LOG_LEVEL", "debug"),
            ("LOG_FORMAT", "json"),
            ("LOG_OUTPUT", "file"),
            ("LOG_FILE_PATH", "/var/log/depot/depot.log"),
        ]
        .into_iter()
        .collect();

        let settings =
            LogSettings::default().with_overrides_from(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(settings.level, "debug");
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.output, LogOutput::File);
        assert_eq!(settings.file, PathBuf::from("/var/log/depot/depot.log"));
    }

    #[test]
    fn test_log_file_location() {
        let settings = LogSettings {
            file: PathBuf::from("/var/log/depot/registry.log"),
            ..LogSettings::default()
        };
        assert_eq!(
            settings.log_file(),
            (Path::new("/var/log/depot"), OsStr::new("registry.log"))
        );

        let bare = LogSettings::default();
        assert_eq!(bare.log_file(), (Path::new("."), OsStr::new("depot.log")));
    }

    #[test]
    fn test_unknown_output_override_is_ignored() {
        let settings = LogSettings::default().with_overrides_from(|key| {
            (key == "LOG_OUTPUT").then(|| "syslog".to_string())
        });
        assert_eq!(settings.output, LogOutput::Console);
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        if env::var("RUST_LOG").is_ok() {
            return;
        }
        assert!(env_filter("info,=[").is_err());
    }
}
