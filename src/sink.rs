//! Output destinations for formatted log lines.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::format::{Formatter, Record, local_now};
use crate::{Error, Result, RotatingFileSink, RotationPolicy, Severity};

/// Which standard stream a console sink writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleTarget {
    Stdout,
    #[default]
    Stderr,
}

/// Writes lines to stdout or stderr.
#[derive(Debug)]
pub struct ConsoleSink {
    target: ConsoleTarget,
    level: Severity,
    formatter: Formatter,
    closed: bool,
}

impl ConsoleSink {
    pub fn new(target: ConsoleTarget) -> Self {
        Self {
            target,
            level: Severity::default(),
            formatter: Formatter,
            closed: false,
        }
    }

    pub fn target(&self) -> ConsoleTarget {
        self.target
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        match self.target {
            ConsoleTarget::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(buf)?;
                out.flush()?;
            }
            ConsoleTarget::Stderr => {
                let mut out = io::stderr().lock();
                out.write_all(buf)?;
                out.flush()?;
            }
        }
        Ok(())
    }
}

/// Appends lines to a single file it owns exclusively.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    level: Severity,
    formatter: Formatter,
    /// None once closed.
    file: Option<File>,
}

impl FileSink {
    /// Open `path` in append mode. The parent directory must already exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!(path = %path.display(), "opened log file");
        Ok(Self {
            path,
            level: Severity::default(),
            formatter: Formatter,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        let file = self.file.as_mut().ok_or(Error::Closed)?;
        file.write_all(buf)?;
        Ok(())
    }
}

/// Kind of a [`Sink`], without its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    File,
    Rotating,
}

/// An output destination attached to a logger.
///
/// Every variant filters records below its own level and renders them with
/// the formatter attached by its logger.
#[derive(Debug)]
pub enum Sink {
    Console(ConsoleSink),
    File(FileSink),
    Rotating(RotatingFileSink),
}

impl Sink {
    /// Console sink on the given stream.
    pub fn console(target: ConsoleTarget) -> Self {
        Self::Console(ConsoleSink::new(target))
    }

    /// Plain file sink appending to `path`.
    pub fn file(path: impl AsRef<Path>) -> Result<Self> {
        FileSink::open(path).map(Self::File)
    }

    /// Rotating file sink appending to `path`.
    pub fn rotating(path: impl AsRef<Path>, policy: RotationPolicy) -> Result<Self> {
        RotatingFileSink::open(path, policy).map(Self::Rotating)
    }

    pub fn kind(&self) -> SinkKind {
        match self {
            Self::Console(_) => SinkKind::Console,
            Self::File(_) => SinkKind::File,
            Self::Rotating(_) => SinkKind::Rotating,
        }
    }

    /// Stream of a console sink; None for file sinks.
    pub fn console_target(&self) -> Option<ConsoleTarget> {
        match self {
            Self::Console(sink) => Some(sink.target()),
            _ => None,
        }
    }

    pub fn attach_formatter(&mut self, formatter: Formatter) {
        match self {
            Self::Console(sink) => sink.formatter = formatter,
            Self::File(sink) => sink.formatter = formatter,
            Self::Rotating(sink) => sink.attach_formatter(formatter),
        }
    }

    pub fn formatter(&self) -> Formatter {
        match self {
            Self::Console(sink) => sink.formatter,
            Self::File(sink) => sink.formatter,
            Self::Rotating(sink) => sink.formatter(),
        }
    }

    pub fn set_level(&mut self, level: Severity) {
        match self {
            Self::Console(sink) => sink.level = level,
            Self::File(sink) => sink.level = level,
            Self::Rotating(sink) => sink.set_level(level),
        }
    }

    pub fn level(&self) -> Severity {
        match self {
            Self::Console(sink) => sink.level,
            Self::File(sink) => sink.level,
            Self::Rotating(sink) => sink.level(),
        }
    }

    /// Write a record if it passes this sink's level.
    pub fn write(&mut self, record: &Record<'_>) -> Result<()> {
        if record.level < self.level() {
            return Ok(());
        }
        match self {
            Self::Console(sink) => {
                let line = sink.formatter.format(record)?;
                sink.write_bytes(line.as_bytes())
            }
            Self::File(sink) => {
                let line = sink.formatter.format(record)?;
                sink.write_bytes(line.as_bytes())
            }
            Self::Rotating(sink) => sink.write_record(record),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        match self {
            Self::Console(ConsoleSink { closed: true, .. }) => Ok(()),
            Self::Console(sink) => match sink.target {
                ConsoleTarget::Stdout => Ok(io::stdout().flush()?),
                ConsoleTarget::Stderr => Ok(io::stderr().flush()?),
            },
            Self::File(sink) => match sink.file.as_mut() {
                Some(file) => Ok(file.flush()?),
                None => Ok(()),
            },
            Self::Rotating(sink) => sink.flush_file(),
        }
    }

    /// Flush and release the sink. Closing twice is a no-op; the standard
    /// streams themselves are never closed.
    pub fn close(&mut self) -> Result<()> {
        self.flush()?;
        match self {
            Self::Console(sink) => sink.closed = true,
            Self::File(sink) => {
                if sink.file.take().is_some() {
                    tracing::debug!(path = %sink.path.display(), "closed log file");
                }
            }
            Self::Rotating(sink) => sink.close()?,
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        match self {
            Self::Console(sink) => sink.closed,
            Self::File(sink) => sink.file.is_none(),
            Self::Rotating(sink) => sink.is_closed(),
        }
    }

    /// The rotating sink inside, if this is one.
    pub fn as_rotating_mut(&mut self) -> Option<&mut RotatingFileSink> {
        match self {
            Self::Rotating(sink) => Some(sink),
            _ => None,
        }
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        match self {
            Self::Console(sink) => sink.write_bytes(buf),
            Self::File(sink) => sink.write_bytes(buf),
            Self::Rotating(sink) => sink.write_at(buf, local_now()),
        }
    }
}

// Pre-formatted bytes (e.g. from a tracing fmt layer) bypass the level check
// but still go through rollover.
impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.write_bytes(buf) {
            Ok(()) => Ok(buf.len()),
            Err(Error::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match Sink::flush(self) {
            Ok(()) => Ok(()),
            Err(Error::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "previous\n").unwrap();

        let mut sink = Sink::file(&path).unwrap();
        sink.set_level(Severity::Debug);
        sink.write(&Record::new("app", Severity::Info, "appended")).unwrap();
        sink.close().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("previous\n"));
        assert!(content.ends_with("-app [INFO] : appended\n"));
    }

    #[test]
    fn test_sink_filters_below_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        let mut sink = Sink::file(&path).unwrap();
        assert_eq!(sink.level(), Severity::Warning);
        sink.write(&Record::new("app", Severity::Info, "quiet")).unwrap();
        sink.write(&Record::new("app", Severity::Warning, "loud")).unwrap();
        sink.close().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("quiet"));
        assert!(content.contains("loud"));
    }

    #[test]
    fn test_close_is_idempotent_and_releases_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        let mut sink = Sink::file(&path).unwrap();
        sink.close().unwrap();
        sink.close().unwrap();
        assert!(sink.is_closed());

        let record = Record::new("app", Severity::Critical, "late");
        assert!(matches!(sink.write(&record), Err(Error::Closed)));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_console_target_defaults_to_stderr() {
        assert_eq!(ConsoleTarget::default(), ConsoleTarget::Stderr);
        let sink = Sink::console(ConsoleTarget::default());
        assert_eq!(sink.console_target(), Some(ConsoleTarget::Stderr));

        let dir = tempfile::tempdir().unwrap();
        let file = Sink::file(dir.path().join("app.log")).unwrap();
        assert_eq!(file.console_target(), None);
    }

    #[test]
    fn test_console_sink_close() {
        let mut sink = Sink::console(ConsoleTarget::Stderr);
        assert_eq!(sink.kind(), SinkKind::Console);
        sink.write(&Record::new("console", Severity::Error, "to stderr"))
            .unwrap();
        sink.close().unwrap();
        sink.close().unwrap();
        assert!(sink.is_closed());
        assert!(matches!(
            sink.write(&Record::new("console", Severity::Error, "late")),
            Err(Error::Closed)
        ));
    }

    #[test]
    fn test_io_write_passes_bytes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.log");

        let mut sink = Sink::rotating(&path, RotationPolicy::new()).unwrap();
        writeln!(sink, "raw line").unwrap();
        Write::flush(&mut sink).unwrap();
        sink.close().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "raw line\n");
        assert!(writeln!(sink, "after close").is_err());
    }

    #[test]
    fn test_as_rotating_mut() {
        let dir = tempfile::tempdir().unwrap();
        let mut rotating = Sink::rotating(dir.path().join("r.log"), RotationPolicy::new()).unwrap();
        let mut plain = Sink::file(dir.path().join("p.log")).unwrap();
        assert!(rotating.as_rotating_mut().is_some());
        assert!(plain.as_rotating_mut().is_none());
    }
}
