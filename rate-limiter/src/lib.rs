//! Tiered rate limiting for the CareNet auth core
//!
//! Each request is counted against `{tier}:{identifier}` in a fixed window
//! whose expiry starts on the first hit. The identifier is the authenticated
//! identity id, else the client address, else `anonymous`.
//!
//! | Tier      | Default budget |
//! |-----------|----------------|
//! | `auth`    | 5 / minute     |
//! | `payment` | 10 / minute    |
//! | `webhook` | 1000 / minute  |
//! | `general` | 100 / minute   |
//!
//! The counter store is treated as best effort: a failing or slow store lets
//! traffic through (logged at `error`) unless the tier opts into
//! `fail_closed`.

pub mod tier;
pub mod config;
pub mod store;
pub mod limiter;

pub use tier::*;
pub use config::{RateLimitConfig, TierLimit};
pub use store::*;
pub use limiter::RateLimiter;
