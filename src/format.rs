//! The fixed output line layout.
//!
//! Every sink writes `<timestamp>-<name> [<LEVEL>] : <message>` followed by a
//! newline, where the timestamp looks like `2026-10-19 08:15:02,113`.

use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::{Result, Severity};

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second],[subsecond digits:3]");

/// Current local time, or UTC when the local offset cannot be determined.
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// A single log event on its way to the sinks.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    /// Name of the emitting logger.
    pub name: &'a str,
    /// Severity of the event.
    pub level: Severity,
    /// Message text.
    pub message: &'a str,
    /// When the event was created.
    pub time: OffsetDateTime,
}

impl<'a> Record<'a> {
    /// Create a record stamped with the current local time.
    pub fn new(name: &'a str, level: Severity, message: &'a str) -> Self {
        Self::at(name, level, message, local_now())
    }

    /// Create a record with an explicit timestamp.
    pub fn at(name: &'a str, level: Severity, message: &'a str, time: OffsetDateTime) -> Self {
        Self {
            name,
            level,
            message,
            time,
        }
    }
}

/// Renders records into output lines.
///
/// The layout is not configurable; the type exists so every sink attached to a
/// logger can be checked to carry the same one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Formatter;

impl Formatter {
    /// Render a record as a newline-terminated line.
    pub fn format(&self, record: &Record<'_>) -> Result<String> {
        Ok(format!(
            "{}-{} [{}] : {}\n",
            timestamp(record.time)?,
            record.name,
            record.level.as_str(),
            record.message
        ))
    }
}

/// `YYYY-MM-DD HH:MM:SS,mmm`
pub fn timestamp(time: OffsetDateTime) -> Result<String> {
    Ok(time.format(TIMESTAMP_FORMAT)?)
}
