use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::rotation::{DEFAULT_BACKUP_COUNT, RotationPeriod, deserialize_size};
use crate::{BackupNaming, ConsoleTarget, RotationPolicy, Severity};

/// Default log file used when a file-based sink has no path.
pub const DEFAULT_LOG_FILE: &str = "log.log";

/// Configuration for one logger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Logger name; generated when absent
    #[serde(default)]
    pub name: Option<String>,
    /// Minimum severity, as a name ("info") or a number (20)
    #[serde(default)]
    pub level: Severity,
    /// Output destination
    #[serde(default)]
    pub sink: SinkConfig,
}

impl LoggerConfig {
    /// Create a new LoggerConfig with defaults (WARNING to stderr)
    pub fn new() -> Self {
        Self {
            name: None,
            level: Severity::default(),
            sink: SinkConfig::default(),
        }
    }

    /// Set logger name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set log level
    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    /// Set output destination
    pub fn with_sink(mut self, sink: SinkConfig) -> Self {
        self.sink = sink;
        self
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Output destination of a configured logger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Standard output or standard error
    Console {
        #[serde(default)]
        target: ConsoleTarget,
    },
    /// A single append-only file
    File {
        #[serde(default = "default_log_file")]
        path: PathBuf,
    },
    /// A file rolled over by size and/or time
    Rotating {
        #[serde(default = "default_log_file")]
        path: PathBuf,
        #[serde(default = "default_backup_count")]
        backup_count: usize,
        /// Bytes, or a string with K/M/G units; 0 disables size rollover
        #[serde(default, deserialize_with = "deserialize_size")]
        max_bytes: u64,
        /// Name backups `YYYYMMDD_<file>` instead of `<file>.N`
        #[serde(default)]
        date_naming: bool,
        #[serde(default)]
        period: Option<RotationPeriod>,
    },
}

impl SinkConfig {
    /// File sink at `path`
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    /// Rotating sink at `path` with the default policy
    pub fn rotating(path: impl Into<PathBuf>) -> Self {
        Self::Rotating {
            path: path.into(),
            backup_count: DEFAULT_BACKUP_COUNT,
            max_bytes: 0,
            date_naming: false,
            period: None,
        }
    }

    /// Rotation policy of a rotating sink
    pub fn rotation_policy(&self) -> Option<RotationPolicy> {
        match self {
            Self::Rotating {
                backup_count,
                max_bytes,
                date_naming,
                period,
                ..
            } => Some(
                RotationPolicy::new()
                    .with_backup_count(*backup_count)
                    .with_max_bytes(*max_bytes)
                    .with_naming(if *date_naming {
                        BackupNaming::Date
                    } else {
                        BackupNaming::Numeric
                    })
                    .with_period(*period),
            ),
            _ => None,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::Console {
            target: ConsoleTarget::default(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_backup_count() -> usize {
    DEFAULT_BACKUP_COUNT
}
