//! Tracing bootstrap with automatic PII redaction
//!
//! The auth core logs every denial with role, identifier and tier for audit.
//! Identifiers are often phone numbers, emails or client addresses, and
//! headers may carry bearer tokens, so anything user-supplied goes through
//! [`redact`] before it becomes a log field.
//!
//! # Detected Data Types
//!
//! - **Session tokens**: JWTs and `Bearer ...` values are dropped entirely
//! - **Email Addresses**: user@example.com → EMAIL[hash] or u***@e***
//! - **Phone Numbers**: +8801712345678 → PHONE[hash] or +***********78
//! - **IP Addresses**: 192.168.1.1 → IP[hash] or 192.***.***.1
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{init_tracing, LoggerConfig, LogFormat};
//!
//! let config = LoggerConfig {
//!     format: LogFormat::Json,
//!     ..LoggerConfig::default()
//! };
//! init_tracing(&config).expect("tracing initialised once");
//!
//! logger_redacted::redacted_warn!(
//!     identifier = "203.0.113.9",
//!     tier = "auth",
//!     "Rate limit exceeded"
//! );
//! ```

pub mod redactor;
pub mod macros;
pub mod config;

pub use redactor::*;
pub use config::*;

use std::sync::atomic::{AtomicBool, Ordering};

use lazy_static::lazy_static;
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

lazy_static! {
    static ref GLOBAL_REDACTOR: PiiRedactor = PiiRedactor::default();
}

static REDACTION_ENABLED: AtomicBool = AtomicBool::new(true);

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Redact a value with the process-wide redactor.
///
/// Returns the input unchanged when redaction was disabled at init.
pub fn redact(value: &str) -> String {
    if REDACTION_ENABLED.load(Ordering::Relaxed) {
        GLOBAL_REDACTOR.redact(value)
    } else {
        value.to_string()
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Errors
///
/// Fails if the filter directive is invalid or a subscriber is already set.
pub fn init_tracing(config: &LoggerConfig) -> Result<(), LoggerError> {
    REDACTION_ENABLED.store(config.redaction_enabled, Ordering::Relaxed);

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| LoggerError::InvalidFilter(e.to_string()))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_level(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
    };

    installed.map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))
}
