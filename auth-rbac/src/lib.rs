//! Role-based permission registry for the CareNet auth core
//!
//! Every identity carries exactly one [`Role`]. What a role may do is a fixed
//! capability set of `resource:action` strings, looked up through a single
//! [`PermissionRegistry`] instead of scattered role comparisons in handlers.
//!
//! # Core Concepts
//!
//! - **Role**: tagged enumeration of marketplace roles
//! - **Permission**: `resource:action` or `resource:own:action` string
//! - **Capability set**: all permissions granted to one role
//!
//! # Example
//!
//! ```rust
//! use auth_rbac::{Action, PermissionRegistry, Role};
//!
//! let registry = PermissionRegistry::default();
//!
//! assert!(registry.has_permission(Role::Moderator, "disputes:resolve"));
//! assert!(registry.has_any_role(Role::Agency, &[Role::Agency, Role::Admin]));
//! assert!(registry.can_access_own_resource(Role::Guardian, "patients", Action::Write));
//! ```

pub mod role;
pub mod registry;
pub mod error;
mod table;

pub use role::*;
pub use registry::*;
pub use error::RbacError;
