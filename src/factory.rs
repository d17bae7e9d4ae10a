//! Factories producing pre-configured [`LoggerHandle`]s.
//!
//! Each factory validates its level when it is built, so an invalid value is
//! rejected before any directory or file is touched.

use std::path::Path;

use crate::config::DEFAULT_LOG_FILE;
use crate::logger::generated_name;
use crate::{
    BackupNaming, ConsoleTarget, LoggerConfig, LoggerHandle, Result, RotationPeriod,
    RotationPolicy, Severity, Sink, SinkConfig,
};

/// Create the parent directory of `path` (recursively) if it is missing.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
        tracing::debug!(dir = %parent.display(), "created log directory");
    }
    Ok(())
}

fn handle_with(name: Option<&str>, prefix: &str, level: Severity, sink: Sink) -> LoggerHandle {
    let name = name.map_or_else(|| generated_name(prefix), str::to_string);
    let mut handle = LoggerHandle::new(name, level);
    handle.add_sink(sink);
    handle
}

/// Builds loggers writing to a standard stream.
#[derive(Debug, Clone, Default)]
pub struct StdoutLoggerFactory {
    level: Severity,
    name: Option<String>,
    target: ConsoleTarget,
}

impl StdoutLoggerFactory {
    /// Factory for WARNING-level loggers on stderr.
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with a raw numeric level; fails with `InvalidLevel` outside the set.
    pub fn from_level(value: u32) -> Result<Self> {
        Ok(Self::new().with_level(Severity::try_from(value)?))
    }

    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Write to stdout instead of stderr.
    pub fn with_target(mut self, target: ConsoleTarget) -> Self {
        self.target = target;
        self
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    pub fn target(&self) -> ConsoleTarget {
        self.target
    }

    pub fn create(&self) -> LoggerHandle {
        handle_with(
            self.name.as_deref(),
            "StreamLogger",
            self.level,
            Sink::console(self.target),
        )
    }
}

/// Builds loggers appending to a single file.
#[derive(Debug, Clone, Default)]
pub struct FileLoggerFactory {
    level: Severity,
    name: Option<String>,
}

impl FileLoggerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with a raw numeric level; fails with `InvalidLevel` outside the set.
    pub fn from_level(value: u32) -> Result<Self> {
        Ok(Self::new().with_level(Severity::try_from(value)?))
    }

    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    /// Create a logger appending to `path`, creating missing parent directories.
    pub fn create(&self, path: impl AsRef<Path>) -> Result<LoggerHandle> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;
        let sink = Sink::file(path)?;
        Ok(handle_with(self.name.as_deref(), "FileLogger", self.level, sink))
    }

    /// Create a logger appending to `log.log` in the working directory.
    pub fn create_default(&self) -> Result<LoggerHandle> {
        self.create(DEFAULT_LOG_FILE)
    }
}

/// Builds loggers writing to a rotating file.
#[derive(Debug, Clone, Default)]
pub struct RotatingFileLoggerFactory {
    level: Severity,
    name: Option<String>,
    policy: RotationPolicy,
}

impl RotatingFileLoggerFactory {
    /// Three backups, no automatic rollover, numeric backup names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with a raw numeric level; fails with `InvalidLevel` outside the set.
    pub fn from_level(value: u32) -> Result<Self> {
        Ok(Self::new().with_level(Severity::try_from(value)?))
    }

    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_backup_count(mut self, backup_count: usize) -> Self {
        self.policy.backup_count = backup_count;
        self
    }

    /// Roll over before a write would push the file past `max_bytes`; 0 disables.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.policy.max_bytes = max_bytes;
        self
    }

    /// Name backups `YYYYMMDD_<file>` instead of `<file>.N`.
    pub fn with_date_naming(mut self, enabled: bool) -> Self {
        self.policy.naming = if enabled {
            BackupNaming::Date
        } else {
            BackupNaming::Numeric
        };
        self
    }

    /// Also roll over whenever `period` changes.
    pub fn with_period(mut self, period: RotationPeriod) -> Self {
        self.policy.period = Some(period);
        self
    }

    pub fn with_policy(mut self, policy: RotationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Create a logger on a rotating file at `path`, creating missing parent
    /// directories.
    pub fn create(&self, path: impl AsRef<Path>) -> Result<LoggerHandle> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;
        let sink = Sink::rotating(path, self.policy.clone())?;
        Ok(handle_with(
            self.name.as_deref(),
            "RotationLogger",
            self.level,
            sink,
        ))
    }

    /// Create a logger on `log.log` in the working directory.
    pub fn create_default(&self) -> Result<LoggerHandle> {
        self.create(DEFAULT_LOG_FILE)
    }
}

/// Build the logger described by `config`.
pub fn from_config(config: &LoggerConfig) -> Result<LoggerHandle> {
    let sink = open_sink(&config.sink)?;
    let prefix = match &config.sink {
        SinkConfig::Console { .. } => "StreamLogger",
        SinkConfig::File { .. } => "FileLogger",
        SinkConfig::Rotating { .. } => "RotationLogger",
    };
    Ok(handle_with(
        config.name.as_deref(),
        prefix,
        config.level,
        sink,
    ))
}

/// Open the sink described by `config`, creating missing directories.
pub(crate) fn open_sink(config: &SinkConfig) -> Result<Sink> {
    match config {
        SinkConfig::Console { target } => Ok(Sink::console(*target)),
        SinkConfig::File { path } => {
            ensure_parent_dir(path)?;
            Sink::file(path)
        }
        SinkConfig::Rotating { path, .. } => {
            ensure_parent_dir(path)?;
            let policy = config.rotation_policy().unwrap_or_default();
            Sink::rotating(path, policy)
        }
    }
}
