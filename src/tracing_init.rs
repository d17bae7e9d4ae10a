//! Route `tracing` events into a configured sink.
//!
//! The installed subscriber renders events in the same fixed layout as
//! [`LoggerHandle`](crate::LoggerHandle) and hands them to the sink through a
//! non-blocking writer. The writer's worker owns the sink exclusively.

use std::fmt;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::factory::open_sink;
use crate::format::{Formatter, Record, local_now};
use crate::{Error, LoggerConfig, Result, Severity};

static LOG_GUARD: Lazy<Mutex<Option<tracing_appender::non_blocking::WorkerGuard>>> =
    Lazy::new(|| Mutex::new(None));

/// Event formatter producing `<timestamp>-<name> [<LEVEL>] : <message>`.
#[derive(Debug, Clone)]
pub struct LineFormat {
    name: String,
    formatter: Formatter,
}

impl LineFormat {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formatter: Formatter,
        }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut message = String::new();
        ctx.format_fields(Writer::new(&mut message), event)?;

        let level = Severity::from_tracing(*event.metadata().level());
        let record = Record::at(&self.name, level, &message, local_now());
        let line = self.formatter.format(&record).map_err(|_| fmt::Error)?;
        writer.write_str(&line)
    }
}

/// Install a global subscriber writing `tracing` events to the sink in `config`.
///
/// `RUST_LOG` overrides the configured level. Fails if a global subscriber is
/// already set.
pub fn init_tracing(config: &LoggerConfig) -> Result<()> {
    let log_spec = effective_log_spec(config, std::env::var("RUST_LOG").ok().as_deref());
    let env_filter = EnvFilter::try_new(&log_spec).map_err(|e| Error::Init(e.to_string()))?;

    let name = config
        .name
        .clone()
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
    let sink = open_sink(&config.sink)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(sink);

    let layer = tracing_subscriber::fmt::layer()
        .event_format(LineFormat::new(name))
        .with_writer(non_blocking);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .map_err(|e| Error::Init(e.to_string()))?;

    // Keep the worker alive for the rest of the process.
    let mut slot = LOG_GUARD
        .lock()
        .map_err(|e| Error::Init(e.to_string()))?;
    *slot = Some(guard);
    Ok(())
}

/// Filter directive: a non-empty `RUST_LOG` wins over the configured level.
fn effective_log_spec(config: &LoggerConfig, rust_log: Option<&str>) -> String {
    match rust_log {
        Some(spec) if !spec.trim().is_empty() => spec.to_string(),
        _ => config.level.filter_directive().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex as StdMutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<StdMutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_rust_log_overrides_config_level() {
        let cfg = LoggerConfig::new().with_level(Severity::Info);
        assert_eq!(effective_log_spec(&cfg, Some("trace")), "trace");
    }

    #[test]
    fn test_cfg_level_used_when_no_rust_log() {
        let cfg = LoggerConfig::new().with_level(Severity::Warning);
        assert_eq!(effective_log_spec(&cfg, None), "warn");
        assert_eq!(effective_log_spec(&cfg, Some("")), "warn");
        let cfg = cfg.with_level(Severity::Critical);
        assert_eq!(effective_log_spec(&cfg, Some("  ")), "error");
    }

    #[test]
    fn test_line_format_layout() {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .event_format(LineFormat::new("traced"))
            .with_writer(move || sink.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("disk almost full");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.ends_with("-traced [WARNING] : disk almost full\n"), "{output}");
    }
}
