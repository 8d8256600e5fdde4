//! Stderr logger for the `log` facade, plus an optional `tracing` subscriber.
//!
//! Records look like `[  0.042s DEBUG nwire_detect::labeler] message`.

use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, fmt::format::FmtSpan, prelude::*, EnvFilter};

/// Environment variable read by [`init_from_env`] and [`init_tracing`].
pub const LOG_ENV_VAR: &str = "NWIRE_LOG";

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let mut out = std::io::stderr().lock();
            let _ = writeln!(
                out,
                "[{:7.3}s {:>5} {}] {}",
                self.started.elapsed().as_secs_f64(),
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger at `level`. Later calls do nothing.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| StderrLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Install the stderr logger with the level named by `NWIRE_LOG`
/// (`error`, `warn`, `info`, `debug`, `trace`); falls back to `info`.
pub fn init_from_env() -> Result<(), log::SetLoggerError> {
    init_with_level(level_from_env(std::env::var(LOG_ENV_VAR).ok().as_deref()))
}

fn level_from_env(raw: Option<&str>) -> LevelFilter {
    raw.and_then(|s| LevelFilter::from_str(s.trim()).ok())
        .unwrap_or(LevelFilter::Info)
}

/// Install a global `tracing` subscriber filtered by `NWIRE_LOG`.
///
/// Span close events are reported so instrumented hot paths show their
/// durations. With `json` every event is one flattened JSON object.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_span_events(FmtSpan::CLOSE)
    });
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::Uptime::default())
    });
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();
}
