//! Logging configuration
//!
//! Every section deserializes with defaults filled in, so a `[logging]`
//! table in a Transit config file only needs the keys it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where log output goes and how it is formatted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `transit_keys=debug,info`
    pub default_level: String,
    pub console: ConsoleConfig,
    /// Optional JSONL file sink
    pub file: Option<FileConfig>,
    pub jsonl: JsonlConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig::jsonl(),
            file: None,
            jsonl: JsonlConfig::default(),
        }
    }
}

impl LogConfig {
    /// Pretty, colored console output at `debug`
    pub fn development() -> Self {
        Self {
            default_level: "debug".to_string(),
            console: ConsoleConfig::pretty(),
            ..Self::default()
        }
    }

    /// Daily-rotated JSONL files under `log_dir`, console off
    pub fn production(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            console: ConsoleConfig::disabled(),
            file: Some(FileConfig {
                directory: log_dir.into(),
                ..FileConfig::default()
            }),
            ..Self::default()
        }
    }

    /// Warnings and errors only, for test binaries
    pub fn testing() -> Self {
        Self {
            default_level: "warn".to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Human-readable lines instead of JSONL
    pub pretty: bool,
    /// ANSI colors; only honored for pretty output
    pub ansi: bool,
}

impl ConsoleConfig {
    pub fn jsonl() -> Self {
        Self {
            enabled: true,
            pretty: false,
            ansi: false,
        }
    }

    pub fn pretty() -> Self {
        Self {
            enabled: true,
            pretty: true,
            ansi: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::jsonl()
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self::jsonl()
    }
}

/// JSONL file sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// Base file name; rotated files get a date suffix
    pub prefix: String,
    pub rotation: RotationStrategy,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "transit".to_string(),
            rotation: RotationStrategy::default(),
        }
    }
}

/// How often the log file is rolled over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// One `<prefix>.log` file, truncated on startup
    Never,
}

/// Shape of each JSONL record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonlConfig {
    /// Put event fields at the top level instead of under `fields`
    pub flatten_events: bool,
    /// Attach the enclosing span stack (`policy_create_or_get`, ...)
    pub include_spans: bool,
    /// Attach source file and line
    pub include_location: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            flatten_events: true,
            include_spans: true,
            include_location: false,
        }
    }
}
