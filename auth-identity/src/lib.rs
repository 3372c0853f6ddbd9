//! Credential hashing, session tokens and TOTP multi-factor authentication
//!
//! - [`password`]: Argon2id hashing and strength policy
//! - [`tokens`]: access/refresh/MFA-challenge JWTs with separate secrets
//! - [`totp`] and [`mfa`]: enrollment, confirmation, backup codes
//! - [`service`]: login, MFA login and refresh over an [`IdentityStore`]

pub mod config;
pub mod models;
pub mod repository;
pub mod password;
pub mod tokens;
pub mod totp;
pub mod mfa;
pub mod service;

pub use config::*;
pub use models::*;
pub use repository::*;
pub use password::CredentialHasher;
pub use tokens::{extract_bearer, AccessClaims, MfaChallengeClaims, RefreshClaims, TokenService, TokenType};
pub use mfa::MfaService;
pub use service::AuthService;
