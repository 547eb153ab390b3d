//! Process-wide logging setup.
//!
//! The crate itself only emits through the [`log`] facade, so embedders are
//! free to install any sink they like. For programs that don't carry one,
//! this module provides a small logger with the two outputs these tools
//! actually use — the console and an append-mode log file — switchable at
//! runtime through a [`LogHandle`]. Install it once at startup:
//!
//! ```no_run
//! use vrkit::logging::{LogConfig, LogTargets, Logger};
//!
//! let handle = Logger::init(
//!     LogConfig::new()
//!         .level(log::LevelFilter::Debug)
//!         .targets(LogTargets::STDOUT),
//! )
//! .unwrap();
//!
//! log::info!("starting up");
//! handle.open_file("session.log").unwrap();
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use bitflags::bitflags;
use log::{LevelFilter, Metadata, Record};

use crate::VrKitError;

bitflags! {
    /// Where log lines go. Targets can be combined and changed at runtime.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct LogTargets: u8 {
        const STDOUT = 1;
        const FILE = 2;
    }
}

/// Configuration for [`Logger::init`].
pub struct LogConfig {
    level: LevelFilter,
    targets: LogTargets,
    file: Option<std::path::PathBuf>,
}

impl LogConfig {
    /// Info level, console output, no file.
    pub fn new() -> LogConfig {
        LogConfig {
            level: LevelFilter::Info,
            targets: LogTargets::STDOUT,
            file: None,
        }
    }

    /// Maximum level to emit.
    pub fn level(mut self, level: LevelFilter) -> LogConfig {
        self.level = level;
        self
    }

    /// Initial output target set.
    pub fn targets(mut self, targets: LogTargets) -> LogConfig {
        self.targets = targets;
        self
    }

    /// Open this file (append mode) at init and enable the FILE target.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> LogConfig {
        self.file = Some(path.as_ref().to_owned());
        self
    }
}

impl Default for LogConfig {
    fn default() -> LogConfig {
        LogConfig::new()
    }
}

/// Output state shared between the installed logger and its handles.
struct Sink {
    targets: Mutex<LogTargets>,
    file: Mutex<Option<File>>,
}

impl Sink {
    fn write(&self, line: &str) {
        let targets = *lock(&self.targets);

        if targets.contains(LogTargets::STDOUT) {
            let _ = io::stdout().write_all(line.as_bytes());
        }

        if targets.contains(LogTargets::FILE) {
            if let Some(file) = lock(&self.file).as_mut() {
                let _ = file.write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = lock(&self.file).as_mut() {
            let _ = file.flush();
        }
    }
}

/// The installable logger. Construct and install with [`Logger::init`];
/// afterwards use the ordinary `log` macros everywhere.
pub struct Logger {
    sink: Arc<Sink>,
}

impl Logger {
    /// Install a logger for this process and return the handle for runtime
    /// adjustments. Fails with [`VrKitError::LoggerInstall`] if any logger
    /// is already installed, or with an i/o error if the configured log
    /// file can't be opened.
    pub fn init(config: LogConfig) -> Result<LogHandle, VrKitError> {
        let mut targets = config.targets;
        let file = match &config.file {
            Some(path) => {
                targets |= LogTargets::FILE;
                Some(open_append(path)?)
            }
            None => None,
        };

        let sink = Arc::new(Sink {
            targets: Mutex::new(targets),
            file: Mutex::new(file),
        });

        log::set_boxed_logger(Box::new(Logger {
            sink: Arc::clone(&sink),
        }))?;
        log::set_max_level(config.level);

        Ok(LogHandle { sink })
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.sink.write(&format_record(record));
        }
    }

    fn flush(&self) {
        self.sink.flush();
    }
}

/// Cheap, cloneable handle for adjusting the installed logger at runtime.
#[derive(Clone)]
pub struct LogHandle {
    sink: Arc<Sink>,
}

impl LogHandle {
    /// Open `path` in append mode as the log file and enable the FILE
    /// target. Replaces any previously open log file.
    pub fn open_file<P: AsRef<Path>>(&self, path: P) -> Result<(), VrKitError> {
        let file = open_append(path.as_ref())?;
        *lock(&self.sink.file) = Some(file);
        *lock(&self.sink.targets) |= LogTargets::FILE;
        Ok(())
    }

    /// Flush and close the log file, disabling the FILE target.
    pub fn close_file(&self) {
        if let Some(mut file) = lock(&self.sink.file).take() {
            let _ = file.flush();
        }
        *lock(&self.sink.targets) -= LogTargets::FILE;
    }

    /// Replace the output target set.
    pub fn set_targets(&self, targets: LogTargets) {
        *lock(&self.sink.targets) = targets;
    }

    pub fn targets(&self) -> LogTargets {
        *lock(&self.sink.targets)
    }

    /// Change the maximum level to emit.
    pub fn set_level(&self, level: LevelFilter) {
        log::set_max_level(level);
    }
}

/// Render one record as a log line: `[LEVEL] file (line) => target: message`.
/// The source path is trimmed to its file name.
fn format_record(record: &Record) -> String {
    let file = record
        .file()
        .map(|path| path.rsplit(['/', '\\']).next().unwrap_or(path))
        .unwrap_or("?");

    format!(
        "[{}] {} ({}) => {}: {}\n",
        record.level(),
        file,
        record.line().unwrap_or(0),
        record.target(),
        record.args()
    )
}

fn open_append(path: &Path) -> Result<File, io::Error> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
