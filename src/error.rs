use thiserror::Error as ThisError;

/// Errors that can occur while building or using a logger
#[derive(ThisError, Debug)]
pub enum Error {
    /// Severity outside the closed DEBUG..CRITICAL set.
    #[error("Invalid log level: {0} (expected one of 10, 20, 30, 40, 50)")]
    InvalidLevel(String),
    /// I/O operation failed (directory creation, open, rename, write).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
    /// Initialization failed.
    #[error("Initialization error: {0}")]
    Init(String),
    /// Formatting a timestamp or date stamp failed.
    #[error("Time error: {0}")]
    Time(#[from] time::error::Format),
    /// The sink was already closed.
    #[error("Sink is closed")]
    Closed,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
