//! Session token issuance and verification
//!
//! Access tokens and refresh tokens are HS256 JWTs signed with two distinct
//! secrets. MFA challenge tokens share the access key but carry their own
//! `typ`, so neither can stand in for the other.

use crate::config::TokenConfig;
use crate::models::{Identity, TokenPair};
use auth_rbac::Role;
use chrono::{DateTime, Duration, Utc};
use error_common::{AuthError, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminates the three token kinds signed by this service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
    MfaChallenge,
}

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Identity id
    pub sub: String,
    pub role: Role,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub typ: TokenType,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Claims carried by a refresh token, a subset of [`AccessClaims`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub role: Role,
    pub typ: TokenType,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Claims bridging the password step and the second factor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfaChallengeClaims {
    pub sub: String,
    pub typ: TokenType,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

trait TypedClaims {
    fn typ(&self) -> TokenType;
    fn subject(&self) -> &str;
}

macro_rules! impl_typed_claims {
    ($($claims:ty),*) => {
        $(impl TypedClaims for $claims {
            fn typ(&self) -> TokenType {
                self.typ
            }

            fn subject(&self) -> &str {
                &self.sub
            }
        })*
    };
}

impl_typed_claims!(AccessClaims, RefreshClaims, MfaChallengeClaims);

impl AccessClaims {
    pub fn identity_id(&self) -> Result<Uuid> {
        parse_subject(&self.sub)
    }
}

impl RefreshClaims {
    pub fn identity_id(&self) -> Result<Uuid> {
        parse_subject(&self.sub)
    }
}

impl MfaChallengeClaims {
    pub fn identity_id(&self) -> Result<Uuid> {
        parse_subject(&self.sub)
    }
}

fn parse_subject(sub: &str) -> Result<Uuid> {
    Uuid::parse_str(sub).map_err(|_| AuthError::InvalidToken)
}

struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Signs and verifies session tokens.
///
/// Every verification failure (expired, forged, malformed, wrong issuer,
/// wrong type) collapses into [`AuthError::InvalidToken`].
pub struct TokenService {
    access_key: SigningKey,
    refresh_key: SigningKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    challenge_ttl: Duration,
    issuer: String,
    validation: Validation,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Result<Self> {
        let access_secret = config.access_secret.expose_secret();
        let refresh_secret = config.refresh_secret.expose_secret();

        if access_secret.is_empty() || refresh_secret.is_empty() {
            return Err(AuthError::Config(
                "access and refresh token secrets must both be set".to_string(),
            ));
        }
        if access_secret == refresh_secret {
            return Err(AuthError::Config(
                "access and refresh token secrets must differ".to_string(),
            ));
        }
        if config.access_token_ttl_secs == 0
            || config.access_token_ttl_secs >= config.refresh_token_ttl_secs
        {
            return Err(AuthError::Config(format!(
                "access token TTL ({}s) must be non-zero and shorter than refresh token TTL ({}s)",
                config.access_token_ttl_secs, config.refresh_token_ttl_secs
            )));
        }
        if config.refresh_token_ttl_secs > MAX_TTL_SECS {
            return Err(AuthError::Config(format!(
                "refresh token TTL ({}s) exceeds the {MAX_TTL_SECS}s maximum",
                config.refresh_token_ttl_secs
            )));
        }
        if config.mfa_challenge_ttl_secs == 0 || config.mfa_challenge_ttl_secs > MAX_TTL_SECS {
            return Err(AuthError::Config(format!(
                "MFA challenge TTL ({}s) must be between 1 and {MAX_TTL_SECS}s",
                config.mfa_challenge_ttl_secs
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = config.leeway_secs;

        Ok(Self {
            access_key: SigningKey::from_secret(access_secret.as_bytes()),
            refresh_key: SigningKey::from_secret(refresh_secret.as_bytes()),
            access_ttl: secs(config.access_token_ttl_secs),
            refresh_ttl: secs(config.refresh_token_ttl_secs),
            challenge_ttl: secs(config.mfa_challenge_ttl_secs),
            issuer: config.issuer.clone(),
            validation,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn challenge_ttl(&self) -> Duration {
        self.challenge_ttl
    }

    /// Clock skew tolerated past `exp`, in seconds
    pub fn leeway_secs(&self) -> u64 {
        self.validation.leeway
    }

    pub fn issue_access_token(&self, identity: &Identity) -> Result<String> {
        self.access_token_at(identity, Utc::now())
    }

    pub fn issue_refresh_token(&self, identity: &Identity) -> Result<String> {
        self.refresh_token_at(identity, Utc::now())
    }

    /// Issue an access/refresh pair at the same instant
    pub fn issue_pair(&self, identity: &Identity) -> Result<TokenPair> {
        let now = Utc::now();
        Ok(TokenPair {
            access_token: self.access_token_at(identity, now)?,
            refresh_token: self.refresh_token_at(identity, now)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.num_seconds().max(0) as u64,
            access_expires_at: now + self.access_ttl,
            refresh_expires_at: now + self.refresh_ttl,
        })
    }

    pub fn issue_mfa_challenge(&self, identity: &Identity) -> Result<String> {
        self.challenge_token_at(identity, Utc::now())
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims> {
        self.verify(token, &self.access_key, TokenType::Access)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims> {
        self.verify(token, &self.refresh_key, TokenType::Refresh)
    }

    pub fn verify_mfa_challenge(&self, token: &str) -> Result<MfaChallengeClaims> {
        self.verify(token, &self.access_key, TokenType::MfaChallenge)
    }

    pub(crate) fn access_token_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String> {
        let claims = AccessClaims {
            sub: identity.id.to_string(),
            role: identity.role,
            phone: identity.phone.clone(),
            email: identity.email.clone(),
            name: identity.name.clone(),
            typ: TokenType::Access,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims, &self.access_key)
    }

    pub(crate) fn refresh_token_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String> {
        let claims = RefreshClaims {
            sub: identity.id.to_string(),
            role: identity.role,
            typ: TokenType::Refresh,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims, &self.refresh_key)
    }

    pub(crate) fn challenge_token_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String> {
        let claims = MfaChallengeClaims {
            sub: identity.id.to_string(),
            typ: TokenType::MfaChallenge,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.challenge_ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims, &self.access_key)
    }

    fn sign<C: Serialize>(&self, claims: &C, key: &SigningKey) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &key.encoding)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
    }

    fn verify<C>(&self, token: &str, key: &SigningKey, expected: TokenType) -> Result<C>
    where
        C: DeserializeOwned + TypedClaims,
    {
        let data = decode::<C>(token, &key.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, expected = ?expected, "Token rejected");
            AuthError::InvalidToken
        })?;

        if data.claims.typ() != expected {
            tracing::debug!(expected = ?expected, actual = ?data.claims.typ(), "Token type mismatch");
            return Err(AuthError::InvalidToken);
        }
        parse_subject(data.claims.subject())?;

        Ok(data.claims)
    }
}

// Lifetimes are capped at ten years to keep `now + ttl` in range
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn secs(value: u64) -> Duration {
    Duration::seconds(value.min(MAX_TTL_SECS) as i64)
}

/// Pull the token out of an `Authorization` header value.
///
/// Only `Bearer <token>` with exactly one separating space and a non-empty
/// token is accepted.
pub fn extract_bearer(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}
