use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::Error;

/// Severity of a log record.
///
/// The set is closed: only the five numeric values below are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u32)]
pub enum Severity {
    /// Diagnostic detail.
    Debug = 10,
    /// Normal operation.
    Info = 20,
    /// Something unexpected that does not stop the program.
    #[default]
    Warning = 30,
    /// An operation failed.
    Error = 40,
    /// The program may not be able to continue.
    Critical = 50,
}

impl Severity {
    /// All severities in ascending order.
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    /// Numeric value (10, 20, 30, 40 or 50).
    pub fn value(self) -> u32 {
        self as u32
    }

    /// Upper-case name as it appears in output lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn filter_directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }

    /// Map a `tracing` level onto the closed set. TRACE folds into DEBUG.
    pub fn from_tracing(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Self::Debug,
            tracing::Level::INFO => Self::Info,
            tracing::Level::WARN => Self::Warning,
            _ => Self::Error,
        }
    }
}

impl TryFrom<u32> for Severity {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Error> {
        match value {
            10 => Ok(Self::Debug),
            20 => Ok(Self::Info),
            30 => Ok(Self::Warning),
            40 => Ok(Self::Error),
            50 => Ok(Self::Critical),
            other => Err(Error::InvalidLevel(other.to_string())),
        }
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(value) = s.parse::<u32>() {
            return Self::try_from(value);
        }
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" | "fatal" => Ok(Self::Critical),
            _ => Err(Error::InvalidLevel(s.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum LevelInput {
            Number(u64),
            Name(String),
        }

        match LevelInput::deserialize(deserializer)? {
            LevelInput::Number(n) => u32::try_from(n)
                .map_err(|_| Error::InvalidLevel(n.to_string()))
                .and_then(Severity::try_from)
                .map_err(de::Error::custom),
            LevelInput::Name(name) => name.parse().map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_round_trip_through_try_from() {
        for level in Severity::ALL {
            assert_eq!(Severity::try_from(level.value()).unwrap(), level);
        }
    }

    #[test]
    fn test_out_of_set_values_rejected() {
        for value in [0, 1, 5, 15, 25, 31, 45, 51, 60, 100, u32::MAX] {
            let err = Severity::try_from(value).unwrap_err();
            assert!(matches!(err, Error::InvalidLevel(_)), "{value} accepted");
        }
    }

    #[test]
    fn test_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
        assert_eq!(Severity::default(), Severity::Warning);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("info".parse::<Severity>().unwrap(), Severity::Info);
        assert_eq!("WARN".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("Critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("40".parse::<Severity>().unwrap(), Severity::Error);
        assert!("35".parse::<Severity>().is_err());
        assert!("verbose".parse::<Severity>().is_err());
    }

    #[test]
    fn test_deserialize_name_or_number() {
        let level: Severity = serde_yaml::from_str("debug").unwrap();
        assert_eq!(level, Severity::Debug);
        let level: Severity = serde_yaml::from_str("50").unwrap();
        assert_eq!(level, Severity::Critical);
        assert!(serde_yaml::from_str::<Severity>("42").is_err());
    }

    #[test]
    fn test_serialize_as_name() {
        assert_eq!(serde_yaml::to_string(&Severity::Info).unwrap().trim(), "INFO");
    }

    #[test]
    fn test_from_tracing() {
        assert_eq!(Severity::from_tracing(tracing::Level::TRACE), Severity::Debug);
        assert_eq!(Severity::from_tracing(tracing::Level::WARN), Severity::Warning);
        assert_eq!(Severity::from_tracing(tracing::Level::ERROR), Severity::Error);
    }
}
