use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;

use crate::format::{Formatter, Record, local_now};
use crate::rotation::{BackupNaming, RotationPolicy, rotate_dated, rotate_numbered};
use crate::{Error, Result, Severity};

/// State of the current log file.
#[derive(Debug)]
pub struct FileState {
    /// The open file handle.
    pub file: File,
    /// Current size of the file in bytes.
    pub size: u64,
    /// When the file's contents started: its mtime if it was reopened
    /// non-empty, otherwise the moment it was opened.
    pub opened_at: OffsetDateTime,
    /// Rotation period key of the file (None without time-based rotation).
    pub period_key: Option<String>,
}

impl FileState {
    fn open(path: &Path, policy: &RotationPolicy, now: OffsetDateTime) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let metadata = file.metadata()?;
        let size = metadata.len();

        // An existing non-empty file belongs to the period it was last written in.
        let opened_at = match metadata.modified() {
            Ok(modified) if size > 0 => OffsetDateTime::from(modified).to_offset(now.offset()),
            _ => now,
        };
        let period_key = policy
            .period
            .map(|period| period.key(opened_at))
            .transpose()?;

        Ok(Self {
            file,
            size,
            opened_at,
            period_key,
        })
    }
}

/// Why a write rolls the file over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Size,
    Period,
}

/// A file sink that rolls its file over by size and/or time.
///
/// On rollover the live file is renamed according to the [`BackupNaming`] of
/// its policy, backups beyond `backup_count` are deleted and a fresh file is
/// opened at the original path.
#[derive(Debug)]
pub struct RotatingFileSink {
    /// Path of the live log file.
    path: PathBuf,
    /// Rollover and retention settings.
    policy: RotationPolicy,
    level: Severity,
    formatter: Formatter,
    /// Current file state; None once closed.
    state: Option<FileState>,
}

impl RotatingFileSink {
    /// Open `path` in append mode. The parent directory must already exist.
    ///
    /// Fails with [`Error::Config`] when the policy combines an hourly period
    /// with date-named backups.
    pub fn open(path: impl AsRef<Path>, policy: RotationPolicy) -> Result<Self> {
        Self::open_at(path, policy, local_now())
    }

    pub(crate) fn open_at(
        path: impl AsRef<Path>,
        policy: RotationPolicy,
        now: OffsetDateTime,
    ) -> Result<Self> {
        policy.validate()?;
        let path = path.as_ref().to_path_buf();
        if path.file_name().is_none() {
            return Err(Error::Config(format!(
                "log path has no file name: {}",
                path.display()
            )));
        }

        let state = FileState::open(&path, &policy, now)?;
        tracing::debug!(
            path = %path.display(),
            size = state.size,
            backup_count = policy.backup_count,
            max_bytes = policy.max_bytes,
            "opened rotating log file"
        );

        Ok(Self {
            path,
            policy,
            level: Severity::default(),
            formatter: Formatter,
            state: Some(state),
        })
    }

    /// Path of the live log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current rollover settings.
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Change how many backups are kept. Takes effect at the next rollover.
    pub fn set_backup_count(&mut self, backup_count: usize) {
        self.policy.backup_count = backup_count;
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    pub fn set_level(&mut self, level: Severity) {
        self.level = level;
    }

    pub fn formatter(&self) -> Formatter {
        self.formatter
    }

    pub fn attach_formatter(&mut self, formatter: Formatter) {
        self.formatter = formatter;
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_none()
    }

    /// Format and write a record if it passes this sink's threshold.
    pub fn write_record(&mut self, record: &Record<'_>) -> Result<()> {
        if record.level < self.level {
            return Ok(());
        }
        let line = self.formatter.format(record)?;
        self.write_at(line.as_bytes(), record.time)
    }

    /// Roll the file over now, regardless of size or period.
    pub fn rollover(&mut self) -> Result<()> {
        self.rollover_at(local_now())
    }

    /// Flush and release the file. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut state) = self.state.take() {
            state.file.flush()?;
            tracing::debug!(path = %self.path.display(), "closed rotating log file");
        }
        Ok(())
    }

    pub(crate) fn flush_file(&mut self) -> Result<()> {
        match self.state.as_mut() {
            Some(state) => Ok(state.file.flush()?),
            None => Ok(()),
        }
    }

    /// Write raw bytes, rolling over first if they would cross a threshold.
    pub(crate) fn write_at(&mut self, buf: &[u8], now: OffsetDateTime) -> Result<()> {
        let state = self.state.as_ref().ok_or(Error::Closed)?;
        match self.rotation_trigger(state, buf.len(), now)? {
            // A date-named backup of a finished period carries that period's date.
            Some(Trigger::Period) => {
                let stamp = state.opened_at;
                self.rollover_stamped(stamp, now)?;
            }
            Some(Trigger::Size) => self.rollover_at(now)?,
            None => {}
        }

        let state = self.state.as_mut().ok_or(Error::Closed)?;
        state.file.write_all(buf)?;
        state.size += buf.len() as u64;
        Ok(())
    }

    /// Check if rotation is needed based on current state and buffer size.
    fn rotation_trigger(
        &self,
        state: &FileState,
        buf_len: usize,
        now: OffsetDateTime,
    ) -> Result<Option<Trigger>> {
        if let (Some(period), Some(key)) = (self.policy.period, &state.period_key)
            && period.key(now)? != *key
        {
            return Ok(Some(Trigger::Period));
        }

        // An empty file never rolls over by size; an oversized record is written
        // to it as is.
        let size_trigger = self.policy.has_size_rotation()
            && state.size > 0
            && state.size + buf_len as u64 > self.policy.max_bytes;
        Ok(size_trigger.then_some(Trigger::Size))
    }

    /// Perform rotation and open a new file.
    pub(crate) fn rollover_at(&mut self, now: OffsetDateTime) -> Result<()> {
        self.rollover_stamped(now, now)
    }

    /// Roll over, dating a date-named backup with `stamp`.
    fn rollover_stamped(&mut self, stamp: OffsetDateTime, now: OffsetDateTime) -> Result<()> {
        // Close current file (drop it) before renaming.
        let mut state = self.state.take().ok_or(Error::Closed)?;
        state.file.flush()?;
        drop(state);

        let rotated = match self.policy.naming {
            BackupNaming::Numeric => rotate_numbered(&self.path, self.policy.backup_count),
            BackupNaming::Date => rotate_dated(&self.path, self.policy.backup_count, stamp),
        };

        // Reopen even when renaming failed so the sink stays usable.
        self.state = Some(FileState::open(&self.path, &self.policy, now)?);
        rotated?;

        tracing::debug!(
            path = %self.path.display(),
            naming = ?self.policy.naming,
            backup_count = self.policy.backup_count,
            "rolled over log file"
        );
        Ok(())
    }
}
