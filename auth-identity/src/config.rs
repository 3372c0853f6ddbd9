use auth_rbac::Role;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Identity, token and MFA configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub tokens: TokenConfig,

    #[serde(default)]
    pub mfa: MfaConfig,

    #[serde(default)]
    pub password: PasswordPolicy,
}

/// Session token configuration.
///
/// Access and refresh tokens are signed with different secrets so a leak of
/// one cannot be used to mint the other.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenConfig {
    /// HS256 secret for access and MFA challenge tokens
    #[serde(default = "empty_secret", skip_serializing)]
    pub access_secret: SecretString,

    /// HS256 secret for refresh tokens, must differ from `access_secret`
    #[serde(default = "empty_secret", skip_serializing)]
    pub refresh_secret: SecretString,

    /// Access token lifetime in seconds (default: 900 = 15 minutes)
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: u64,

    /// Refresh token lifetime in seconds (default: 604800 = 7 days)
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: u64,

    /// Lifetime of the token bridging password and MFA steps (default: 300)
    #[serde(default = "default_challenge_ttl")]
    pub mfa_challenge_ttl_secs: u64,

    /// JWT issuer claim
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Clock skew tolerated on `exp` (default: 0)
    #[serde(default)]
    pub leeway_secs: u64,
}

/// MFA enrollment and verification settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MfaConfig {
    /// Issuer shown in authenticator apps
    #[serde(default = "default_mfa_issuer")]
    pub issuer: String,

    /// Adjacent 30-second steps accepted on each side of "now"
    #[serde(default = "default_drift_steps")]
    pub drift_steps: u8,

    /// Number of one-time backup codes issued at enrollment
    #[serde(default = "default_backup_code_count")]
    pub backup_code_count: usize,

    /// Roles allowed to enroll
    #[serde(default = "default_eligible_roles")]
    pub eligible_roles: Vec<Role>,
}

/// Password strength policy and Argon2id cost parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PasswordPolicy {
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_true")]
    pub require_uppercase: bool,
    #[serde(default = "default_true")]
    pub require_lowercase: bool,
    #[serde(default = "default_true")]
    pub require_digit: bool,
    #[serde(default = "default_true")]
    pub require_special: bool,

    /// Argon2 memory cost in KiB (default: 19456 = 19 MiB)
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    /// Argon2 iterations (default: 2)
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Argon2 lanes (default: 1)
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new())
}

fn default_access_ttl() -> u64 {
    900
}

fn default_refresh_ttl() -> u64 {
    604_800
}

fn default_challenge_ttl() -> u64 {
    300
}

fn default_issuer() -> String {
    "carenet".to_string()
}

fn default_mfa_issuer() -> String {
    "CareNet".to_string()
}

fn default_drift_steps() -> u8 {
    2
}

fn default_backup_code_count() -> usize {
    10
}

fn default_eligible_roles() -> Vec<Role> {
    vec![Role::Agency, Role::Moderator, Role::Admin]
}

fn default_min_length() -> usize {
    8
}

fn default_max_length() -> usize {
    128
}

fn default_true() -> bool {
    true
}

fn default_memory_kib() -> u32 {
    19456
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

impl TokenConfig {
    pub fn with_secrets(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: SecretString::new(access_secret.into()),
            refresh_secret: SecretString::new(refresh_secret.into()),
            ..Self::default()
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_secret: empty_secret(),
            refresh_secret: empty_secret(),
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_secs: default_refresh_ttl(),
            mfa_challenge_ttl_secs: default_challenge_ttl(),
            issuer: default_issuer(),
            leeway_secs: 0,
        }
    }
}

impl Default for MfaConfig {
    fn default() -> Self {
        Self {
            issuer: default_mfa_issuer(),
            drift_steps: default_drift_steps(),
            backup_code_count: default_backup_code_count(),
            eligible_roles: default_eligible_roles(),
        }
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            max_length: default_max_length(),
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = IdentityConfig::default();
        assert_eq!(config.tokens.access_token_ttl_secs, 15 * 60);
        assert_eq!(config.tokens.refresh_token_ttl_secs, 7 * 24 * 60 * 60);
        assert_eq!(config.mfa.drift_steps, 2);
        assert_eq!(config.mfa.backup_code_count, 10);
        assert_eq!(config.mfa.eligible_roles, vec![Role::Agency, Role::Moderator, Role::Admin]);
        assert_eq!(config.password.memory_kib, 19456);
    }

    #[test]
    fn test_secrets_never_printed() {
        let config = TokenConfig::with_secrets("access-secret-value", "refresh-secret-value");
        let printed = format!("{config:?}");
        assert!(!printed.contains("access-secret-value"));
        assert!(!printed.contains("refresh-secret-value"));
        assert_eq!(config.access_secret.expose_secret(), "access-secret-value");

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret-value"));
    }

    #[test]
    fn test_deserialize_partial_document() {
        let config: IdentityConfig = serde_json::from_str(
            r#"{"tokens": {"access_secret": "a", "refresh_secret": "b"}, "mfa": {"eligible_roles": ["AGENCY"]}}"#,
        )
        .unwrap();
        assert_eq!(config.tokens.issuer, "carenet");
        assert_eq!(config.mfa.eligible_roles, vec![Role::Agency]);
        assert_eq!(config.password.min_length, 8);
    }
}
