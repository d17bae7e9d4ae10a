//! # mylogger
//!
//! Factories for pre-configured loggers writing to the console, a file or a
//! rotating file.
//!
//! ## Features
//!
//! - One fixed line layout: `2026-10-19 08:15:02,113-app [INFO] : message`
//! - Size- and time-triggered rollover with numeric (`app.log.1`) or dated
//!   (`20261019_app.log`) backups
//! - Missing log directories are created on demand
//! - Optional bridge from the `tracing` ecosystem into the same sinks
//!
//! ## Example
//!
//! ```rust,no_run
//! use mylogger::RotatingFileLoggerFactory;
//!
//! let mut logger = RotatingFileLoggerFactory::from_level(20)?
//!     .with_max_bytes(1024 * 1024)
//!     .with_backup_count(5)
//!     .create("logs/app.log")?;
//!
//! logger.info("service started")?;
//! logger.close()?;
//! # Ok::<(), mylogger::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod format;
pub mod level;
pub mod logger;
pub mod rotation;
pub mod sink;
pub mod writer;

#[cfg(feature = "tracing-integration")]
pub mod tracing_init;

pub use config::{DEFAULT_LOG_FILE, LoggerConfig, SinkConfig};
pub use error::{Error, Result};
pub use factory::{FileLoggerFactory, RotatingFileLoggerFactory, StdoutLoggerFactory, from_config};
pub use format::{Formatter, Record};
pub use level::Severity;
pub use logger::{LoggerHandle, Registry, SinkId};
pub use rotation::{BackupNaming, RotationPeriod, RotationPolicy};
pub use sink::{ConsoleTarget, Sink, SinkKind};
pub use writer::RotatingFileSink;

#[cfg(feature = "tracing-integration")]
pub use tracing_init::init_tracing;
