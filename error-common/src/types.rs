use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::codes;

/// Error taxonomy of the authentication and access-control core
#[derive(Error, Debug)]
pub enum AuthError {
    /// Password mismatch, unknown identity or deactivated account
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Malformed, expired or badly signed token
    #[error("Invalid token")]
    InvalidToken,

    /// One-time code or backup code mismatch
    #[error("Invalid verification code")]
    InvalidCode,

    /// Role lacks the required permission
    #[error("Insufficient permissions")]
    InsufficientPermission,

    /// Tier budget exhausted for the current window
    #[error("Rate limit exceeded, retry after {}s", retry_after.as_secs())]
    RateLimited {
        retry_after: Duration,
        limit: u32,
        reset_at: DateTime<Utc>,
    },

    /// Backing identity store or counter store fault
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Input rejected before reaching any store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Wrapped unexpected errors
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Result type alias for auth core operations
pub type Result<T> = std::result::Result<T, AuthError>;

impl AuthError {
    pub fn store<E: std::fmt::Display>(err: E) -> Self {
        Self::StoreUnavailable(err.to_string())
    }

    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => codes::authentication::INVALID_CREDENTIALS,
            Self::InvalidToken => codes::authentication::INVALID_TOKEN,
            Self::InvalidCode => codes::authentication::INVALID_CODE,
            Self::InsufficientPermission => codes::authorization::INSUFFICIENT_PERMISSIONS,
            Self::RateLimited { .. } => codes::rate_limit::TOO_MANY_REQUESTS,
            Self::StoreUnavailable(_) => codes::system::STORE_UNAVAILABLE,
            Self::Validation(_) => codes::validation::INVALID_INPUT,
            Self::Config(_) => codes::system::CONFIGURATION,
            Self::Internal(_) => codes::system::INTERNAL,
        }
    }

    /// HTTP status equivalent
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidCredentials | Self::InvalidToken | Self::InvalidCode => 401,
            Self::InsufficientPermission => 403,
            Self::RateLimited { .. } => 429,
            Self::StoreUnavailable(_) => 503,
            Self::Validation(_) => 422,
            Self::Config(_) | Self::Internal(_) => 500,
        }
    }

    /// Message safe to hand to an unauthenticated caller.
    ///
    /// Never distinguishes an unknown identity from a wrong password, nor an
    /// expired token from a forged one.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Invalid credentials".to_string(),
            Self::InvalidToken => "Invalid or expired token".to_string(),
            Self::InvalidCode => "Invalid verification code".to_string(),
            Self::InsufficientPermission => "Insufficient permissions".to_string(),
            Self::RateLimited { retry_after, .. } => format!(
                "Too many requests, retry after {} seconds",
                retry_after.as_secs()
            ),
            Self::StoreUnavailable(_) => "Service temporarily unavailable".to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::Config(_) | Self::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Retry-after in whole seconds, rounded up, for rate limited errors
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after, .. } => {
                let secs = retry_after.as_secs();
                Some(if retry_after.subsec_nanos() > 0 { secs + 1 } else { secs }.max(1))
            }
            _ => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

/// Async logging function for errors
pub async fn log_error(context: &str, error: &AuthError) {
    tracing::error!(
        context = context,
        error_code = error.code(),
        error = %error,
        "Auth core error occurred"
    );
}
