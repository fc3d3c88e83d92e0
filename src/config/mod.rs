//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if a value is present but malformed.

use crate::error::{Error, Result};

/// Parallelism used when `FANOUT_MAX_PARALLEL` is unset.
pub const DEFAULT_MAX_PARALLEL: usize = 4;

#[derive(Debug, Clone)]
pub struct Config {
    pub max_parallel: usize,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let max_parallel = match std::env::var("FANOUT_MAX_PARALLEL") {
            Ok(raw) => parse_max_parallel(&raw)?,
            Err(_) => DEFAULT_MAX_PARALLEL,
        };

        Ok(Self {
            max_parallel,
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Parse a parallelism bound. Zero, negative and non-numeric values are rejected.
pub fn parse_max_parallel(raw: &str) -> Result<usize> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("max parallel must be an integer, got {raw:?}")))?;

    if value <= 0 {
        return Err(Error::Config(format!(
            "max parallel must be positive, got {value}"
        )));
    }

    usize::try_from(value)
        .map_err(|_| Error::Config(format!("max parallel {value} does not fit this platform")))
}
