//! Debug logging for codebuddy.
//!
//! Crate code logs through the `log_*!` macros; invocation spans go through
//! `tracing`. Both end up in the same optional log file and nothing is
//! written until the CLI enables logging.

use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
};

/// Filter applied to tracing spans when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "codebuddy=debug,warn";

/// HTTP stack targets hidden unless verbose logging is on
const NOISY_TARGETS: &[&str] = &["reqwest", "hyper", "h2", "rustls", "want", "mio", "tokio_util"];

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(false);
static VERBOSE_LOGGING: AtomicBool = AtomicBool::new(false);
static LOG_FILE: LazyLock<Mutex<Option<File>>> = LazyLock::new(|| Mutex::new(None));

/// Append `bytes` to the log file, if one is open
fn write_to_log_file(bytes: &[u8]) {
    if let Some(file) = LOG_FILE.lock().as_mut() {
        let _ = file.write_all(bytes);
        let _ = file.flush();
    }
}

struct BuddyLogger;

static LOGGER: BuddyLogger = BuddyLogger;

impl log::Log for BuddyLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if !LOGGING_ENABLED.load(Ordering::Relaxed) || metadata.level() > Level::Debug {
            return false;
        }
        let target = metadata.target();
        target.starts_with("codebuddy")
            || VERBOSE_LOGGING.load(Ordering::Relaxed)
            || !NOISY_TARGETS.iter().any(|noisy| target.starts_with(noisy))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "{} {} [{}] - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        );
        write_to_log_file(line.as_bytes());
    }

    fn flush(&self) {}
}

/// `MakeWriter` that routes tracing output into the log file
#[derive(Clone, Copy)]
struct LogFileWriter;

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if LOGGING_ENABLED.load(Ordering::Relaxed) {
            write_to_log_file(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        *self
    }
}

/// Install the `log` logger and the tracing subscriber.
///
/// Safe to call more than once; only the first call does any work.
pub fn init() -> Result<(), String> {
    static INIT: LazyLock<Result<(), String>> = LazyLock::new(install);
    INIT.clone()
}

fn install() -> Result<(), String> {
    let verbose = std::env::var_os("CODEBUDDY_VERBOSE").is_some()
        || std::env::var("RUST_LOG").is_ok_and(|v| v.contains("debug") || v.contains("trace"));
    VERBOSE_LOGGING.store(verbose, Ordering::Relaxed);
    enable_logging();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let fmt_layer = fmt::Layer::new()
        .with_target(true)
        .with_timer(fmt::time::ChronoUtc::rfc_3339())
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(LogFileWriter);
    let subscriber = Registry::default().with(env_filter).with(fmt_layer);

    let tracing_result = tracing::subscriber::set_global_default(subscriber);
    let log_result = log::set_logger(&LOGGER).map(|()| log::set_max_level(LevelFilter::Debug));

    // Another subscriber or logger already installed is fine; losing both is not
    match (tracing_result, log_result) {
        (Err(tracing_err), Err(log_err)) => Err(format!(
            "Failed to initialize logging: tracing={tracing_err}, log={log_err}"
        )),
        _ => Ok(()),
    }
}

pub fn enable_logging() {
    LOGGING_ENABLED.store(true, Ordering::Relaxed);
}

pub fn disable_logging() {
    LOGGING_ENABLED.store(false, Ordering::Relaxed);
}

/// Open (or create) `file_path` and append all further log output to it
pub fn set_log_file(file_path: &str) -> io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)?;
    *LOG_FILE.lock() = Some(file);
    Ok(())
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    fn metadata(target: &str) -> Metadata<'_> {
        Metadata::builder().level(Level::Debug).target(target).build()
    }

    #[test]
    fn test_noisy_targets_filtered_unless_verbose() {
        enable_logging();
        let logger = BuddyLogger;

        assert!(logger.enabled(&metadata("codebuddy::orchestrator")));
        assert!(!logger.enabled(&metadata("hyper::proto")));

        VERBOSE_LOGGING.store(true, Ordering::Relaxed);
        assert!(logger.enabled(&metadata("hyper::proto")));
        VERBOSE_LOGGING.store(false, Ordering::Relaxed);

        disable_logging();
        assert!(!logger.enabled(&metadata("codebuddy::orchestrator")));
    }
}
