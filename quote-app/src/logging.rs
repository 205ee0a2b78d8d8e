use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};

use anyhow::{Context, Result};
use chrono::Local;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, filter, reload};

use crate::config::LoggingConfig;

static LEVEL: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();
static STDERR_ON: AtomicBool = AtomicBool::new(true);
static LOG_FILE: Mutex<Option<File>> = Mutex::new(None);

/// Local wall-clock time with offset, e.g. `2024-03-05T09:00:00.000+01:00`.
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Writes to the `[logging] file`, or nowhere while none is open.
struct LogFile;

struct LogFileWriter(MutexGuard<'static, Option<File>>);

impl Write for LogFileWriter {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        match self.0.as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.as_mut().map_or(Ok(()), File::flush)
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileWriter(log_file())
    }
}

// A writer that panicked mid-record leaves a usable file behind.
fn log_file() -> MutexGuard<'static, Option<File>> {
    LOG_FILE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// `RUST_LOG` when set, otherwise `default_level`, otherwise `warn`.
fn make_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the global subscriber: one stderr layer that can be muted and
/// one file layer that stays silent until a file is opened. Both share the
/// reloadable level filter.
fn init_default_logging(default_level: &str) {
    let (level, handle) = reload::Layer::new(make_filter(default_level));

    let stderr = tracing_subscriber::fmt::layer()
        .with_timer(LocalTime)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .with_filter(filter::filter_fn(|_| STDERR_ON.load(Ordering::Relaxed)));

    let file = tracing_subscriber::fmt::layer()
        .with_timer(LocalTime)
        .with_ansi(false)
        .with_writer(LogFile);

    if tracing_subscriber::registry()
        .with(level)
        .with(stderr)
        .with(file)
        .try_init()
        .is_ok()
    {
        let _ = LEVEL.set(handle);
    }
}

fn set_stderr_enabled(enabled: bool) {
    STDERR_ON.store(enabled, Ordering::Relaxed);
}

/// Appends to `path` from now on. The directory must exist.
fn enable_file_logging(path: &Path) -> Result<()> {
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file '{}'", path.display()))?;
    *log_file() = Some(file);
    Ok(())
}

/// Replaces the active log filter, as `quoter --log-level` does after startup.
/// Accepts a bare level such as "debug" or any EnvFilter directive.
pub fn set_log_level(directives: &str) -> Result<()> {
    let handle = LEVEL.get().context("logging is not initialized")?;
    let filter = EnvFilter::try_new(directives)
        .with_context(|| format!("invalid log filter '{directives}'"))?;
    handle.reload(filter).context("cannot replace the log filter")
}

/// Applies the `[logging]` section. `quiet` keeps records off the terminal;
/// the log file, when configured, still receives them.
pub fn init_from_config(
    config: &LoggingConfig,
    quiet: bool,
) -> Result<()> {
    init_default_logging(&config.level);
    set_stderr_enabled(!quiet);
    if let Some(path) = &config.file {
        enable_file_logging(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // One subscriber per process, so every check lives in one test.
    #[test]
    fn runtime_controls_after_init() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quoter.log");
        let config = LoggingConfig {
            level: "info".to_string(),
            file: Some(path.clone()),
        };

        init_from_config(&config, true).unwrap();
        // Pin the level in case RUST_LOG is set for the test run.
        set_log_level("info").unwrap();
        assert!(set_log_level("quote_app=loud").is_err());

        tracing::warn!(target: "quote_app::tests", "written while quiet");
        tracing::debug!(target: "quote_app::tests", "below info");
        set_log_level("debug").unwrap();
        tracing::debug!(target: "quote_app::tests", "visible at debug");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("WARN"));
        assert!(contents.contains("written while quiet"));
        assert!(!contents.contains("below info"));
        assert!(contents.contains("visible at debug"));
    }

    #[test]
    fn file_logging_in_missing_directory_fails() {
        let path = Path::new("/definitely/not/here/quoter.log");

        assert!(enable_file_logging(path).is_err());
    }
}
