//! Argon2id credential hashing

use crate::config::PasswordPolicy;
use anyhow::{anyhow, Context};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use error_common::{AuthError, Result};

/// Hashes and verifies passwords with Argon2id.
///
/// Output is PHC formatted (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`) so
/// cost parameters travel with every stored hash and older hashes keep
/// verifying after the policy changes.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    policy: PasswordPolicy,
}

impl CredentialHasher {
    pub fn new(policy: PasswordPolicy) -> Result<Self> {
        let params = Params::new(policy.memory_kib, policy.iterations, policy.parallelism, Some(32))
            .map_err(|e| AuthError::Config(format!("invalid Argon2 parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            policy,
        })
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Hash a password with a fresh random salt.
    ///
    /// CPU-bound, so it runs on the blocking pool.
    pub async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let argon2 = self.argon2.clone();

        let hash = tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| anyhow!("Failed to hash password: {}", e))
        })
        .await
        .context("Password hashing task panicked")??;

        Ok(hash)
    }

    /// Verify a password against a stored PHC string.
    ///
    /// A mismatch is `Ok(false)`. A stored value that is not a valid hash is
    /// reported as `InvalidCredentials` so callers never learn why.
    pub async fn verify(&self, password: &str, stored_hash: &str) -> Result<bool> {
        let password = password.to_string();
        let stored_hash = stored_hash.to_string();
        let argon2 = self.argon2.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&stored_hash)?;
            match argon2.verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .context("Password verification task panicked")?;

        outcome.map_err(|e| {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            AuthError::InvalidCredentials
        })
    }

    /// Spend roughly the cost of one verification without a stored hash.
    ///
    /// Called when the login identifier matches no identity so the response
    /// time does not reveal which identifiers exist.
    pub async fn burn_verification(&self, password: &str) {
        if let Err(e) = self.hash(password).await {
            tracing::debug!(error = %e, "Dummy verification failed");
        }
    }

    /// Check a candidate password against the policy, reporting every
    /// unmet rule at once.
    pub fn validate_strength(&self, password: &str) -> Result<()> {
        let policy = &self.policy;
        let length = password.chars().count();

        if length < policy.min_length {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters long",
                policy.min_length
            )));
        }
        if length > policy.max_length {
            return Err(AuthError::Validation(format!(
                "Password must be at most {} characters long",
                policy.max_length
            )));
        }

        let mut missing = Vec::new();
        if policy.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            missing.push("uppercase letter");
        }
        if policy.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            missing.push("lowercase letter");
        }
        if policy.require_digit && !password.chars().any(|c| c.is_numeric()) {
            missing.push("digit");
        }
        if policy.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
            missing.push("special character");
        }

        if !missing.is_empty() {
            return Err(AuthError::Validation(format!(
                "Password must contain: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }
}
