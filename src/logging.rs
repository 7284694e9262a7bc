use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::error::{AppError, Result};

/// Append to `path`, filtered by `RUST_LOG` or else `level`. The terminal is
/// owned by the UI, so nothing is ever written to stdout or stderr.
pub fn init_file_logging(path: &Path, level: &str) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_default_env().or_else(|_| level_filter(level))?;
    let fmt_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false);
    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("logging already initialised: {}", e)))
}

fn level_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| AppError::Config(format!("invalid log level '{}': {}", level, e)))
}
