use crate::config::MfaConfig;
use crate::models::{Identity, MfaEnrollment, MfaState};
use crate::repository::IdentityStore;
use crate::totp;
use auth_rbac::Role;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use error_common::{AuthError, DenialContext, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

const BACKUP_CODE_BYTES: usize = 5;

/// TOTP enrollment, verification and backup code redemption
pub struct MfaService {
    store: Arc<dyn IdentityStore>,
    config: MfaConfig,
}

impl MfaService {
    pub fn new(store: Arc<dyn IdentityStore>, config: MfaConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &MfaConfig {
        &self.config
    }

    pub fn is_eligible(&self, role: Role) -> bool {
        self.config.eligible_roles.contains(&role)
    }

    pub async fn state(&self, identity_id: Uuid) -> Result<MfaState> {
        Ok(self.load(identity_id).await?.mfa_state())
    }

    /// Generate and persist a pending secret plus a fresh set of backup codes.
    ///
    /// Any earlier pending secret is overwritten. The plaintext secret and
    /// backup codes are only ever returned here.
    pub async fn start_enrollment(&self, identity_id: Uuid) -> Result<MfaEnrollment> {
        let identity = self.load(identity_id).await?;

        if !self.is_eligible(identity.role) {
            let err = AuthError::InsufficientPermission;
            DenialContext::new(identity.id.to_string())
                .with_role(identity.role.as_str())
                .add_context("operation", "mfa_enrollment")
                .log(&err);
            return Err(err);
        }
        if identity.mfa_state() == MfaState::Enabled {
            return Err(AuthError::Validation("MFA is already enabled".to_string()));
        }

        let secret = totp::generate_secret();
        let account = identity.name.clone().unwrap_or_else(|| identity.phone.clone());
        let (provisioning_uri, qr_image) = totp::provisioning(&secret, &self.config.issuer, &account)?;

        let backup_codes = generate_backup_codes(self.config.backup_code_count);
        let hashes = backup_codes
            .iter()
            .map(|code| hash_backup_code(identity.id, code))
            .collect();

        self.store.store_pending_mfa(identity.id, &secret, hashes).await?;

        tracing::info!(identity_id = %identity.id, role = %identity.role, "MFA enrollment started");

        Ok(MfaEnrollment {
            secret,
            provisioning_uri,
            qr_image,
            backup_codes,
            instructions: vec![
                "Install an authenticator app such as Google Authenticator or Authy".to_string(),
                "Scan the QR code or enter the secret manually".to_string(),
                "Enter the 6-digit code shown by the app to finish setup".to_string(),
                "Store the backup codes somewhere safe; each one works once".to_string(),
            ],
        })
    }

    /// Enable MFA once the first code from the authenticator app checks out.
    ///
    /// Confirming an already enabled identity with a valid code is a no-op.
    pub async fn confirm_enrollment(&self, identity_id: Uuid, code: &str) -> Result<()> {
        let identity = self.load(identity_id).await?;
        self.check_code(&identity, code)?;

        if identity.mfa_enabled {
            return Ok(());
        }

        // The code was checked against this secret; a concurrent restart replaces it
        let secret = identity.mfa_secret.as_deref().ok_or(AuthError::InvalidCode)?;
        if !self.store.enable_mfa(identity.id, secret).await? {
            tracing::debug!(identity_id = %identity.id, "MFA secret changed during confirmation");
            return Err(AuthError::InvalidCode);
        }

        tracing::info!(identity_id = %identity.id, "MFA enabled");
        Ok(())
    }

    /// Clear secret, backup codes and the enabled flag. Idempotent.
    pub async fn disable(&self, identity_id: Uuid) -> Result<()> {
        let identity = self.load(identity_id).await?;
        if identity.mfa_state() == MfaState::None && identity.backup_code_hashes.is_empty() {
            return Ok(());
        }
        self.store.clear_mfa(identity.id).await?;

        tracing::info!(identity_id = %identity.id, "MFA disabled");
        Ok(())
    }

    /// Second-factor check for an identity with MFA enabled
    pub async fn verify_code(&self, identity_id: Uuid, code: &str) -> Result<()> {
        let identity = self.load(identity_id).await?;
        if !identity.mfa_enabled {
            return Err(AuthError::InvalidCode);
        }
        self.check_code(&identity, code)
    }

    /// Redeem a one-time backup code, returning how many remain
    pub async fn redeem_backup_code(&self, identity_id: Uuid, code: &str) -> Result<usize> {
        let identity = self.load(identity_id).await?;
        if !identity.mfa_enabled {
            return Err(AuthError::InvalidCode);
        }

        let candidate = hash_backup_code(identity.id, code);
        let matched = identity
            .backup_code_hashes
            .iter()
            .find(|stored| bool::from(stored.as_bytes().ct_eq(candidate.as_bytes())))
            .ok_or(AuthError::InvalidCode)?;

        // A concurrent redemption may have consumed it first
        if !self.store.consume_backup_code(identity.id, matched).await? {
            return Err(AuthError::InvalidCode);
        }

        let remaining = identity.backup_code_hashes.len() - 1;
        tracing::info!(identity_id = %identity.id, remaining, "Backup code redeemed");
        Ok(remaining)
    }

    fn check_code(&self, identity: &Identity, code: &str) -> Result<()> {
        let secret = identity.mfa_secret.as_deref().ok_or(AuthError::InvalidCode)?;
        let now = Utc::now().timestamp().max(0) as u64;

        if totp::verify_code(secret, code, now, self.config.drift_steps)? {
            Ok(())
        } else {
            tracing::debug!(identity_id = %identity.id, "TOTP code rejected");
            Err(AuthError::InvalidCode)
        }
    }

    async fn load(&self, identity_id: Uuid) -> Result<Identity> {
        self.store
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }
}

/// Random `xxxxx-xxxxx` hex codes, 40 bits each
pub fn generate_backup_codes(count: usize) -> Vec<String> {
    (0..count)
        .map(|_| {
            let mut bytes = [0u8; BACKUP_CODE_BYTES];
            OsRng.fill_bytes(&mut bytes);
            let code = hex::encode(bytes);
            format!("{}-{}", &code[..5], &code[5..])
        })
        .collect()
}

/// Digest stored in place of a backup code, bound to its owner
pub fn hash_backup_code(identity_id: Uuid, code: &str) -> String {
    let normalized: String = code
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_lowercase)
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(identity_id.as_bytes());
    hasher.update(b":");
    hasher.update(normalized.as_bytes());
    BASE64.encode(hasher.finalize())
}
