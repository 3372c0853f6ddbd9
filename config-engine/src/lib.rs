//! Configuration management for the CareNet auth core
//!
//! Two concerns live here:
//! - **Layered loading**: serde defaults, an optional TOML/YAML/JSON file and
//!   `CARENET__`-prefixed environment variables, merged by the `config` crate
//! - **Injected stores**: [`ConfigStore`] hands components an atomically
//!   swappable snapshot, so tunables such as rate-limit tiers can change at
//!   runtime without a process-wide singleton
//!
//! # Example
//!
//! ```rust
//! use config_engine::{ConfigStore, InMemoryConfigStore, Validate};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Limits { auth: u32 }
//! impl Validate for Limits {}
//!
//! let store = InMemoryConfigStore::new(Limits { auth: 5 });
//! assert_eq!(store.snapshot().auth, 5);
//!
//! store.update(Limits { auth: 3 }).unwrap();
//! assert_eq!(store.snapshot().auth, 3);
//! assert_eq!(store.version(), 1);
//! ```

pub mod store;
pub mod providers;
pub mod validation;
pub mod error;

pub use store::*;
pub use providers::*;
pub use validation::*;
pub use error::*;
