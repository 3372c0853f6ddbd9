//! Common error handling utilities for the CareNet auth core
//!
//! This crate provides the error taxonomy shared by every authentication,
//! session and access-control component. Each variant carries a stable
//! error code and an HTTP status so gateways can render a consistent,
//! non-revealing response.
//!
//! # Error Categories
//!
//! - **InvalidCredentials**: password mismatch or unknown identity
//! - **InvalidToken**: malformed, expired, forged or mistyped session token
//! - **InvalidCode**: one-time code or backup code mismatch
//! - **InsufficientPermission**: role lacks the required capability
//! - **RateLimited**: tier budget exhausted for the current window
//! - **StoreUnavailable**: backing identity or counter store fault
//!
//! # Example
//!
//! ```rust
//! use error_common::{AuthError, Result};
//!
//! fn require_admin(is_admin: bool) -> Result<()> {
//!     if !is_admin {
//!         return Err(AuthError::InsufficientPermission);
//!     }
//!     Ok(())
//! }
//!
//! let err = require_admin(false).unwrap_err();
//! assert_eq!(err.status_code(), 403);
//! assert_eq!(err.code(), error_common::codes::authorization::INSUFFICIENT_PERMISSIONS);
//! ```

pub mod types;
pub mod context;
pub mod codes;

pub use types::*;
pub use context::*;
