use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::{Error, Result};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]");
const HOUR_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day][hour]");
const WEEK_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year base:iso_week]W[week_number repr:iso]");
const MONTH_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year][month]");

/// Default number of backup generations kept.
pub const DEFAULT_BACKUP_COUNT: usize = 3;

/// Parse a size string with optional units (K/M/G, case-insensitive).
/// A bare number is a byte count.
fn parse_size(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim();
    let Some(last) = s.chars().last() else {
        return Err("empty size string".to_string());
    };

    let (num_str, multiplier) = if last.is_ascii_alphabetic() {
        let multiplier = match last.to_ascii_uppercase() {
            'B' => 1,
            'K' => 1024,
            'M' => 1024 * 1024,
            'G' => 1024 * 1024 * 1024,
            unit => return Err(format!("invalid unit: {}, supported: B/K/M/G", unit)),
        };
        (s[..s.len() - 1].trim_end(), multiplier)
    } else {
        (s, 1)
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number: {}", num_str))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| "size too large".to_string())
}

/// Size value that can be a number or string with units.
#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Number(u64),
    String(String),
}

/// Deserialize a byte threshold written as `1048576`, `"512K"` or `"10M"`.
pub(crate) fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match SizeValue::deserialize(deserializer)? {
        SizeValue::Number(n) => Ok(n),
        SizeValue::String(s) => parse_size(&s).map_err(serde::de::Error::custom),
    }
}

/// How a rolled-over file is renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupNaming {
    /// `app.log.1`, `app.log.2`, ... with `.1` the newest.
    #[default]
    Numeric,
    /// `20261019_app.log`, dated with the local calendar day of the rollover,
    /// or of the closing file's period when the rollover is time-triggered.
    Date,
}

/// Time periods for log rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPeriod {
    /// Roll over when the hour changes.
    Hourly,
    /// Roll over when the calendar day changes.
    Daily,
    /// Roll over when the ISO week changes.
    Weekly,
    /// Roll over when the month changes.
    Monthly,
}

impl RotationPeriod {
    /// Identifier of the period containing `time`. Two instants fall in the
    /// same period exactly when their keys are equal.
    pub fn key(&self, time: OffsetDateTime) -> Result<String> {
        let format = match self {
            Self::Hourly => HOUR_FORMAT,
            Self::Daily => DATE_FORMAT,
            Self::Weekly => WEEK_FORMAT,
            Self::Monthly => MONTH_FORMAT,
        };
        Ok(time.format(format)?)
    }

    /// Whether two consecutive periods can fall on the same calendar day.
    pub fn is_sub_daily(&self) -> bool {
        matches!(self, Self::Hourly)
    }
}

/// Rollover and retention settings of a rotating file sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationPolicy {
    /// Number of backup files kept.
    #[serde(default = "default_backup_count")]
    pub backup_count: usize,
    /// Size threshold in bytes; 0 disables size-based rollover.
    #[serde(default, deserialize_with = "deserialize_size")]
    pub max_bytes: u64,
    /// Backup naming scheme.
    #[serde(default)]
    pub naming: BackupNaming,
    /// Time-based rollover period, if any.
    #[serde(default)]
    pub period: Option<RotationPeriod>,
}

impl RotationPolicy {
    /// Policy with three backups and no automatic rollover.
    pub fn new() -> Self {
        Self {
            backup_count: DEFAULT_BACKUP_COUNT,
            max_bytes: 0,
            naming: BackupNaming::Numeric,
            period: None,
        }
    }

    /// Set the number of backups kept.
    pub fn with_backup_count(mut self, backup_count: usize) -> Self {
        self.backup_count = backup_count;
        self
    }

    /// Set the size threshold.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Set the backup naming scheme.
    pub fn with_naming(mut self, naming: BackupNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Set the time-based rollover period.
    pub fn with_period(mut self, period: Option<RotationPeriod>) -> Self {
        self.period = period;
        self
    }

    /// Check if this policy includes size-based rotation.
    pub fn has_size_rotation(&self) -> bool {
        self.max_bytes > 0
    }

    /// Reject combinations that would overwrite whole periods of logs.
    ///
    /// Date-named backups carry one calendar day, so a period shorter than a
    /// day would reuse the same backup name for every rollover of that day.
    pub fn validate(&self) -> Result<()> {
        match (self.naming, self.period) {
            (BackupNaming::Date, Some(period)) if period.is_sub_daily() => Err(Error::Config(
                format!("{:?} rotation cannot be combined with date-named backups", period),
            )),
            _ => Ok(()),
        }
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self::new()
    }
}

fn default_backup_count() -> usize {
    DEFAULT_BACKUP_COUNT
}

/// Local calendar date as `YYYYMMDD`.
pub fn date_stamp(time: OffsetDateTime) -> Result<String> {
    Ok(time.format(DATE_FORMAT)?)
}

/// `<base>.<index>`
pub fn numbered_backup_path(base: &Path, index: usize) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

/// `<dir>/<YYYYMMDD>_<basename>`
pub fn dated_backup_path(base: &Path, time: OffsetDateTime) -> Result<PathBuf> {
    let file_name = base
        .file_name()
        .ok_or_else(|| Error::Config(format!("log path has no file name: {}", base.display())))?;
    let mut name = OsString::from(format!("{}_", date_stamp(time)?));
    name.push(file_name);
    Ok(base.with_file_name(name))
}

/// Whether `name` is a date-named backup of `base_name`.
pub(crate) fn is_dated_backup(name: &str, base_name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() == base_name.len() + 9
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[8] == b'_'
        && &name[9..] == base_name
}

/// Shift numbered backups up by one and move `base` to `base.1`.
///
/// The backup at `backup_count` is deleted first. With `backup_count == 0`
/// nothing is kept and `base` is removed so it reopens empty.
pub(crate) fn rotate_numbered(base: &Path, backup_count: usize) -> Result<()> {
    if backup_count == 0 {
        if base.exists() {
            std::fs::remove_file(base)?;
        }
        return Ok(());
    }

    let oldest = numbered_backup_path(base, backup_count);
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
        tracing::trace!(path = %oldest.display(), "removed oldest backup");
    }

    for i in (1..backup_count).rev() {
        let from = numbered_backup_path(base, i);
        if from.exists() {
            std::fs::rename(&from, numbered_backup_path(base, i + 1))?;
        }
    }

    if base.exists() {
        std::fs::rename(base, numbered_backup_path(base, 1))?;
    }
    Ok(())
}

/// Move `base` to its date-named backup, then prune old date-named backups.
///
/// A backup from an earlier rollover on the same day is overwritten.
pub(crate) fn rotate_dated(base: &Path, backup_count: usize, time: OffsetDateTime) -> Result<()> {
    let target = dated_backup_path(base, time)?;
    if base.exists() {
        if target.exists() {
            tracing::debug!(path = %target.display(), "overwriting same-day backup");
            std::fs::remove_file(&target)?;
        }
        std::fs::rename(base, &target)?;
    }
    prune_dated(base, backup_count)
}

/// Keep the `backup_count` newest date-named backups of `base`.
fn prune_dated(base: &Path, backup_count: usize) -> Result<()> {
    let Some(base_name) = base.file_name().and_then(|n| n.to_str()) else {
        return Ok(());
    };
    let dir = match base.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut backups: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_dated_backup(name, base_name))
        .collect();
    // YYYYMMDD prefixes sort chronologically.
    backups.sort_unstable_by(|a, b| b.cmp(a));

    for stale in backups.into_iter().skip(backup_count) {
        let path = dir.join(&stale);
        std::fs::remove_file(&path)?;
        tracing::trace!(path = %path.display(), "removed expired backup");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("100"), Ok(100));
        assert_eq!(parse_size("5K"), Ok(5 * 1024));
        assert_eq!(parse_size("2m"), Ok(2 * 1024 * 1024));
        assert_eq!(parse_size("1G"), Ok(1024 * 1024 * 1024));
        assert_eq!(parse_size("64b"), Ok(64));
        assert!(parse_size("").is_err());
        assert!(parse_size("12X").is_err());
        assert!(parse_size("abc").is_err());
        assert!(parse_size("99999999999999G").is_err());
    }

    #[test]
    fn test_policy_defaults() {
        let policy = RotationPolicy::default();
        assert_eq!(policy.backup_count, 3);
        assert_eq!(policy.max_bytes, 0);
        assert_eq!(policy.naming, BackupNaming::Numeric);
        assert_eq!(policy.period, None);
        assert!(!policy.has_size_rotation());
        assert!(policy.with_max_bytes(10).has_size_rotation());
    }

    #[test]
    fn test_policy_deserialize() {
        let yaml = r#"
backup_count: 5
max_bytes: "2K"
naming: date
period: daily
"#;
        let policy: RotationPolicy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            policy,
            RotationPolicy::new()
                .with_backup_count(5)
                .with_max_bytes(2048)
                .with_naming(BackupNaming::Date)
                .with_period(Some(RotationPeriod::Daily))
        );

        let policy: RotationPolicy = serde_yaml::from_str("max_bytes: 300").unwrap();
        assert_eq!(policy.max_bytes, 300);
        assert_eq!(policy.backup_count, DEFAULT_BACKUP_COUNT);
    }

    #[test]
    fn test_date_stamp_zero_padded() {
        assert_eq!(date_stamp(datetime!(2026-01-05 23:59:59 UTC)).unwrap(), "20260105");
        assert_eq!(date_stamp(datetime!(2026-12-31 00:00:00 UTC)).unwrap(), "20261231");
    }

    #[test]
    fn test_period_keys() {
        let a = datetime!(2026-10-19 10:15:00 UTC);
        let b = datetime!(2026-10-19 11:05:00 UTC);
        let c = datetime!(2026-10-20 00:00:01 UTC);
        let key = |period: RotationPeriod, time| period.key(time).unwrap();
        assert_eq!(key(RotationPeriod::Hourly, a), "2026101910");
        assert_ne!(key(RotationPeriod::Hourly, a), key(RotationPeriod::Hourly, b));
        assert_eq!(key(RotationPeriod::Daily, a), key(RotationPeriod::Daily, b));
        assert_ne!(key(RotationPeriod::Daily, b), key(RotationPeriod::Daily, c));
        // 2026-10-19 is a Monday, so the whole span is one ISO week.
        assert_eq!(key(RotationPeriod::Weekly, a), "2026W43");
        assert_eq!(key(RotationPeriod::Weekly, a), key(RotationPeriod::Weekly, c));
        assert_eq!(key(RotationPeriod::Monthly, a), "202610");
    }

    #[test]
    fn test_validate_rejects_hourly_date_naming() {
        let hourly_dated = RotationPolicy::new()
            .with_naming(BackupNaming::Date)
            .with_period(Some(RotationPeriod::Hourly));
        assert!(matches!(hourly_dated.validate(), Err(Error::Config(_))));

        for period in [RotationPeriod::Daily, RotationPeriod::Weekly, RotationPeriod::Monthly] {
            let policy = RotationPolicy::new()
                .with_naming(BackupNaming::Date)
                .with_period(Some(period));
            assert!(policy.validate().is_ok(), "{period:?} rejected");
        }
        let hourly_numeric = RotationPolicy::new().with_period(Some(RotationPeriod::Hourly));
        assert!(hourly_numeric.validate().is_ok());
    }

    #[test]
    fn test_numbered_backup_path() {
        let base = Path::new("logs/app.log");
        assert_eq!(numbered_backup_path(base, 1), PathBuf::from("logs/app.log.1"));
        assert_eq!(numbered_backup_path(base, 12), PathBuf::from("logs/app.log.12"));
    }

    #[test]
    fn test_dated_backup_path() {
        let time = datetime!(2026-07-04 09:00:00 UTC);
        assert_eq!(
            dated_backup_path(Path::new("/var/log/app.log"), time).unwrap(),
            PathBuf::from("/var/log/20260704_app.log")
        );
        assert_eq!(
            dated_backup_path(Path::new("app.log"), time).unwrap(),
            PathBuf::from("20260704_app.log")
        );
        assert!(dated_backup_path(Path::new("/"), time).is_err());
    }

    #[test]
    fn test_is_dated_backup() {
        assert!(is_dated_backup("20261019_app.log", "app.log"));
        assert!(!is_dated_backup("20261019_app.log.1", "app.log"));
        assert!(!is_dated_backup("2026101x_app.log", "app.log"));
        assert!(!is_dated_backup("20261019-app.log", "app.log"));
        assert!(!is_dated_backup("app.log", "app.log"));
    }

    #[test]
    fn test_rotate_numbered_shifts_and_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        std::fs::write(&base, "live").unwrap();
        std::fs::write(numbered_backup_path(&base, 1), "one").unwrap();
        std::fs::write(numbered_backup_path(&base, 2), "two").unwrap();

        rotate_numbered(&base, 2).unwrap();

        assert!(!base.exists());
        let read = |i| std::fs::read_to_string(numbered_backup_path(&base, i)).unwrap();
        assert_eq!(read(1), "live");
        assert_eq!(read(2), "one");
        assert!(!numbered_backup_path(&base, 3).exists());
    }

    #[test]
    fn test_rotate_numbered_zero_keeps_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        std::fs::write(&base, "live").unwrap();

        rotate_numbered(&base, 0).unwrap();

        assert!(!base.exists());
        assert!(!numbered_backup_path(&base, 1).exists());
    }

    #[test]
    fn test_rotate_dated_prunes_old_days() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        for day in ["20261015", "20261016", "20261017"] {
            std::fs::write(dir.path().join(format!("{day}_app.log")), day).unwrap();
        }
        std::fs::write(dir.path().join("20261001_other.log"), "x").unwrap();
        std::fs::write(&base, "today").unwrap();

        rotate_dated(&base, 2, datetime!(2026-10-19 08:00:00 UTC)).unwrap();

        let today = dir.path().join("20261019_app.log");
        assert_eq!(std::fs::read_to_string(&today).unwrap(), "today");
        assert!(dir.path().join("20261017_app.log").exists());
        assert!(!dir.path().join("20261016_app.log").exists());
        assert!(!dir.path().join("20261015_app.log").exists());
        assert!(dir.path().join("20261001_other.log").exists());
    }

    #[test]
    fn test_rotate_dated_same_day_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        let time = datetime!(2026-10-19 08:00:00 UTC);

        std::fs::write(&base, "first").unwrap();
        rotate_dated(&base, 3, time).unwrap();
        std::fs::write(&base, "second").unwrap();
        rotate_dated(&base, 3, time).unwrap();

        let backup = dated_backup_path(&base, time).unwrap();
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "second");
    }
}
