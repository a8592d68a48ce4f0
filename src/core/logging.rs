//! Process-wide logging: a readable console stream plus a JSON-lines log file.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use env_logger::{Builder, Target, WriteStyle};
use log::{LevelFilter, Log, Metadata, Record};

pub const DEFAULT_LOG_FILE: &str = "app.log";
const FILTER_ENV: &str = "RUST_LOG";
const STYLE_ENV: &str = "RUST_LOG_STYLE";

#[derive(Debug, Clone)]
pub struct LogOptions {
    pub file: PathBuf,
    pub verbose: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_LOG_FILE),
            verbose: false,
        }
    }
}

struct TeeLogger {
    console: env_logger::Logger,
    file: env_logger::Logger,
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata) || self.file.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.console.log(record);
        self.file.log(record);
    }

    fn flush(&self) {
        self.console.flush();
        self.file.flush();
    }
}

/// Handle to the installed logger. Construct once at start-up, flush at exit.
#[derive(Debug)]
pub struct Logging {
    file: PathBuf,
}

impl Logging {
    pub fn init(options: &LogOptions) -> Result<Self> {
        rotate_log_file(&options.file).with_context(|| {
            format!("failed to rotate log file {}", options.file.display())
        })?;
        let file = File::create(&options.file)
            .with_context(|| format!("failed to open log file {}", options.file.display()))?;

        let filters = std::env::var(FILTER_ENV).ok();
        let console = builder(options.verbose, filters.as_deref())
            .target(Target::Stderr)
            .build();
        let file_logger = builder(options.verbose, filters.as_deref())
            .target(Target::Pipe(Box::new(file)))
            .write_style(WriteStyle::Never)
            .format(|buf, record| {
                let line = serde_json::json!({
                    "time": chrono::Utc::now().to_rfc3339(),
                    "level": record.level().as_str(),
                    "target": record.target(),
                    "msg": record.args().to_string(),
                });
                writeln!(buf, "{line}")
            })
            .build();

        let max_level = console.filter().max(file_logger.filter());
        log::set_boxed_logger(Box::new(TeeLogger {
            console,
            file: file_logger,
        }))
        .context("a logger is already installed")?;
        log::set_max_level(max_level);

        Ok(Self {
            file: options.file.clone(),
        })
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn flush(&self) {
        log::logger().flush();
    }
}

impl Drop for Logging {
    fn drop(&mut self) {
        self.flush();
    }
}

/// `RUST_LOG` directives win over `--verbose`.
fn builder(verbose: bool, filters: Option<&str>) -> Builder {
    let mut builder = Builder::new();
    if let Ok(style) = std::env::var(STYLE_ENV) {
        builder.parse_write_style(&style);
    }
    match filters.map(str::trim).filter(|filters| !filters.is_empty()) {
        Some(filters) => builder.parse_filters(filters),
        None if verbose => builder.filter_level(LevelFilter::Debug),
        None => builder.filter_level(LevelFilter::Info),
    };
    builder
}

/// Keeps one previous run: `app.log` becomes `app.log.1`, replacing an older copy.
pub(crate) fn rotate_log_file(path: &Path) -> io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let mut rotated = path.as_os_str().to_owned();
    rotated.push(".1");
    fs::rename(path, PathBuf::from(rotated))
}
