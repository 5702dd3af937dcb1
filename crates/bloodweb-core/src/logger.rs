//! Stderr logging for the worker and the CLI.
//!
//! Lines read `[  12.345s  INFO detect/nodes] message`: seconds since the
//! logger was installed, the level, then the emitting `bloodweb` crate and
//! module. Other crates, such as the image decoders, only get
//! through at `Warn` and above. Install once with [`init_with_level`]; the
//! `tracing` feature adds [`init_tracing`] with the same split.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

const OWN_TARGET: &str = "bloodweb";
const FOREIGN_LEVEL: LevelFilter = LevelFilter::Warn;

struct WorkerLogger {
    level: LevelFilter,
    started: Instant,
}

impl WorkerLogger {
    fn filter_for(&self, target: &str) -> LevelFilter {
        if target.starts_with(OWN_TARGET) {
            self.level
        } else {
            self.level.min(FOREIGN_LEVEL)
        }
    }
}

/// `bloodweb_detect::detector::nodes` becomes `detect/nodes`.
fn short_target(target: &str) -> String {
    let mut parts = target.split("::");
    let krate = parts.next().unwrap_or_default();
    let krate = krate.strip_prefix("bloodweb_").unwrap_or(krate);
    match parts.last() {
        Some(module) => format!("{krate}/{module}"),
        None => krate.to_string(),
    }
}

impl Log for WorkerLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:8.3}s {:>5} {}] {}",
            elapsed,
            record.level(),
            short_target(record.target()),
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<WorkerLogger> = OnceLock::new();

/// Install the stderr logger; `level` applies to the `bloodweb` crates.
///
/// Calling this more than once is a no-op after the first successful
/// initialization.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| WorkerLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install a `tracing` subscriber; span close events carry stage timings.
///
/// `RUST_LOG` overrides the default of `info` for the `bloodweb` crates
/// and `warn` for the rest.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,bloodweb=info"));
    if json {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .flatten_event(true)
            .finish()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_are_shortened_to_crate_and_module() {
        assert_eq!(short_target("bloodweb_detect::detector::nodes"), "detect/nodes");
        assert_eq!(short_target("bloodweb::control"), "bloodweb/control");
        assert_eq!(short_target("bloodweb"), "bloodweb");
        assert_eq!(short_target("png::decoder"), "png/decoder");
    }

    #[test]
    fn other_crates_are_capped_at_warn() {
        let logger = WorkerLogger {
            level: LevelFilter::Debug,
            started: Instant::now(),
        };
        assert_eq!(logger.filter_for("bloodweb_select::selector"), LevelFilter::Debug);
        assert_eq!(logger.filter_for("png::decoder"), LevelFilter::Warn);

        let quiet = WorkerLogger {
            level: LevelFilter::Error,
            started: Instant::now(),
        };
        assert_eq!(quiet.filter_for("png::decoder"), LevelFilter::Error);
    }
}
