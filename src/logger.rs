//! Logger handles and the caller-owned registry.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::format::{Formatter, Record};
use crate::{Result, Severity, Sink};

static NEXT_LOGGER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique logger name such as `FileLogger-3`.
pub fn generated_name(prefix: &str) -> String {
    format!("{}-{}", prefix, NEXT_LOGGER.fetch_add(1, Ordering::Relaxed))
}

/// Identifies a sink within one [`LoggerHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(u64);

/// A named logger owning an ordered set of sinks.
///
/// Records go only to this handle's own sinks; nothing is forwarded to any
/// other logger. Every attached sink carries the handle's formatter and level.
#[derive(Debug)]
pub struct LoggerHandle {
    name: String,
    level: Severity,
    formatter: Formatter,
    sinks: Vec<(SinkId, Sink)>,
    next_sink: u64,
}

impl LoggerHandle {
    /// Create a handle with no sinks.
    pub fn new(name: impl Into<String>, level: Severity) -> Self {
        Self {
            name: name.into(),
            level,
            formatter: Formatter,
            sinks: Vec::new(),
            next_sink: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    pub fn formatter(&self) -> Formatter {
        self.formatter
    }

    /// Set the level of the handle and of every attached sink.
    pub fn set_level(&mut self, level: Severity) {
        self.level = level;
        for (_, sink) in &mut self.sinks {
            sink.set_level(level);
        }
    }

    /// Like [`set_level`](Self::set_level) for a raw numeric value.
    ///
    /// Fails with [`Error::InvalidLevel`](crate::Error::InvalidLevel) and
    /// leaves every level untouched when `value` is not 10, 20, 30, 40 or 50.
    pub fn set_level_value(&mut self, value: u32) -> Result<()> {
        let level = Severity::try_from(value)?;
        self.set_level(level);
        Ok(())
    }

    /// Attach a sink, giving it this handle's formatter and level.
    ///
    /// The same destination must not be added twice.
    pub fn add_sink(&mut self, mut sink: Sink) -> SinkId {
        sink.attach_formatter(self.formatter);
        sink.set_level(self.level);
        let id = SinkId(self.next_sink);
        self.next_sink += 1;
        self.sinks.push((id, sink));
        id
    }

    /// Close and drop one sink. Returns whether it was attached.
    pub fn remove_sink(&mut self, id: SinkId) -> Result<bool> {
        let Some(index) = self.sinks.iter().position(|(sink_id, _)| *sink_id == id) else {
            return Ok(false);
        };
        let (_, mut sink) = self.sinks.remove(index);
        sink.close()?;
        Ok(true)
    }

    pub fn sink(&self, id: SinkId) -> Option<&Sink> {
        self.sinks
            .iter()
            .find(|(sink_id, _)| *sink_id == id)
            .map(|(_, sink)| sink)
    }

    /// Attached sinks in attachment order.
    pub fn sinks(&self) -> impl Iterator<Item = &Sink> {
        self.sinks.iter().map(|(_, sink)| sink)
    }

    /// Close and drop every sink.
    ///
    /// Calling this again is a no-op. Records emitted afterwards reach no sink.
    pub fn close(&mut self) -> Result<()> {
        let mut first_err = None;
        for (_, mut sink) in self.sinks.drain(..) {
            if let Err(e) = sink.close() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Send `message` to every sink if `level` passes this handle's level.
    ///
    /// Every sink is attempted; the first failure is returned.
    pub fn log(&mut self, level: Severity, message: &str) -> Result<()> {
        if level < self.level {
            return Ok(());
        }
        let record = Record::new(&self.name, level, message);
        let mut first_err = None;
        for (_, sink) in &mut self.sinks {
            if let Err(e) = sink.write(&record) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn debug(&mut self, message: &str) -> Result<()> {
        self.log(Severity::Debug, message)
    }

    pub fn info(&mut self, message: &str) -> Result<()> {
        self.log(Severity::Info, message)
    }

    pub fn warning(&mut self, message: &str) -> Result<()> {
        self.log(Severity::Warning, message)
    }

    pub fn error(&mut self, message: &str) -> Result<()> {
        self.log(Severity::Error, message)
    }

    pub fn critical(&mut self, message: &str) -> Result<()> {
        self.log(Severity::Critical, message)
    }

    /// Log at ERROR with `err` and its chain of sources appended.
    pub fn exception(&mut self, message: &str, err: &dyn std::error::Error) -> Result<()> {
        let mut text = format!("{}\n{}", message, err);
        let mut source = err.source();
        while let Some(cause) = source {
            text.push_str("\nCaused by: ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        self.log(Severity::Error, &text)
    }

    /// Change the retention of every rotating sink.
    pub fn set_backup_count(&mut self, backup_count: usize) {
        for (_, sink) in &mut self.sinks {
            if let Some(rotating) = sink.as_rotating_mut() {
                rotating.set_backup_count(backup_count);
            }
        }
    }

    /// Force a rollover on every rotating sink.
    pub fn rollover(&mut self) -> Result<()> {
        for (_, sink) in &mut self.sinks {
            if let Some(rotating) = sink.as_rotating_mut() {
                rotating.rollover()?;
            }
        }
        Ok(())
    }
}

/// Name-to-handle lookup owned by the caller.
///
/// Handles created by the factories are independent; a registry only gives
/// them a place to be found by name and closed together.
#[derive(Debug, Default)]
pub struct Registry {
    loggers: BTreeMap<String, LoggerHandle>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handle under its name, returning any handle it replaced.
    pub fn insert(&mut self, handle: LoggerHandle) -> Option<LoggerHandle> {
        self.loggers.insert(handle.name().to_string(), handle)
    }

    pub fn get(&self, name: &str) -> Option<&LoggerHandle> {
        self.loggers.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut LoggerHandle> {
        self.loggers.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<LoggerHandle> {
        self.loggers.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.loggers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }

    /// Close every handle and empty the registry.
    pub fn close_all(&mut self) -> Result<()> {
        let mut first_err = None;
        for (_, mut handle) in std::mem::take(&mut self.loggers) {
            if let Err(e) = handle.close() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
