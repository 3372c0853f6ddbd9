use auth_rbac::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A marketplace account as seen by the auth core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
    pub phone: String,
    pub email: Option<String>,
    pub name: Option<String>,
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    #[serde(default, skip_serializing)]
    pub mfa_secret: Option<String>,
    pub mfa_enabled: bool,
    #[serde(default, skip_serializing)]
    pub backup_code_hashes: Vec<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(role: Role, phone: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            phone: phone.into(),
            email: None,
            name: None,
            password_hash: password_hash.into(),
            mfa_secret: None,
            mfa_enabled: false,
            backup_code_hashes: Vec::new(),
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn mfa_state(&self) -> MfaState {
        match (&self.mfa_secret, self.mfa_enabled) {
            (Some(_), true) => MfaState::Enabled,
            (Some(_), false) => MfaState::Pending,
            (None, _) => MfaState::None,
        }
    }
}

/// MFA enrollment state derived from (secret present, enabled flag)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MfaState {
    None,
    Pending,
    Enabled,
}

/// Access and refresh tokens issued together
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Returned once by `start_enrollment`; the secret and backup codes are
/// never retrievable again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaEnrollment {
    pub secret: String,
    pub provisioning_uri: String,
    /// `data:image/png;base64,...`
    pub qr_image: String,
    pub backup_codes: Vec<String>,
    pub instructions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

impl LoginRequest {
    pub fn with_phone(phone: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            phone: Some(phone.into()),
            email: None,
            password: password.into(),
        }
    }

    pub fn with_email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            phone: None,
            email: Some(email.into()),
            password: password.into(),
        }
    }
}

/// Result of the password step
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginOutcome {
    Authenticated {
        identity: Identity,
        tokens: TokenPair,
    },
    /// Password accepted; a TOTP or backup code must follow within the
    /// challenge token's lifetime.
    #[serde(rename_all = "camelCase")]
    MfaRequired {
        challenge_token: String,
        expires_in: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIdentity {
    pub role: Role,
    pub phone: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mfa_state_derivation() {
        let mut identity = Identity::new(Role::Agency, "+8801700000000", "hash");
        assert_eq!(identity.mfa_state(), MfaState::None);

        identity.mfa_secret = Some("JBSWY3DPEHPK3PXP".into());
        assert_eq!(identity.mfa_state(), MfaState::Pending);

        identity.mfa_enabled = true;
        assert_eq!(identity.mfa_state(), MfaState::Enabled);
    }

    #[test]
    fn test_serialization_hides_secrets() {
        let mut identity = Identity::new(Role::Admin, "+8801700000000", "$argon2id$v=19$...");
        identity.mfa_secret = Some("JBSWY3DPEHPK3PXP".into());
        identity.backup_code_hashes = vec!["backup-hash-1".into()];

        let json = serde_json::to_string(&identity).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("JBSWY3DPEHPK3PXP"));
        assert!(!json.contains("backup-hash-1"));
        assert!(json.contains("\"role\":\"ADMIN\""));
    }
}
