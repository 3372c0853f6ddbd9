use crate::config::IdentityConfig;
use crate::mfa::MfaService;
use crate::models::*;
use crate::password::CredentialHasher;
use crate::repository::IdentityStore;
use crate::tokens::{AccessClaims, MfaChallengeClaims, TokenService};
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use error_common::{AuthError, Result};
use logger_redacted::redacted_warn;
use std::sync::Arc;
use uuid::Uuid;

/// Registration, login, MFA login and refresh on top of an [`IdentityStore`]
pub struct AuthService {
    store: Arc<dyn IdentityStore>,
    hasher: CredentialHasher,
    tokens: Arc<TokenService>,
    mfa: Arc<MfaService>,
    /// Challenge `jti`s already exchanged for tokens, with their expiry
    redeemed_challenges: DashMap<String, i64>,
}

impl AuthService {
    pub fn new(store: Arc<dyn IdentityStore>, config: IdentityConfig) -> Result<Self> {
        let hasher = CredentialHasher::new(config.password)?;
        let tokens = Arc::new(TokenService::new(&config.tokens)?);
        let mfa = Arc::new(MfaService::new(store.clone(), config.mfa));

        Ok(Self {
            store,
            hasher,
            tokens,
            mfa,
            redeemed_challenges: DashMap::new(),
        })
    }

    pub fn tokens(&self) -> Arc<TokenService> {
        self.tokens.clone()
    }

    pub fn mfa(&self) -> Arc<MfaService> {
        self.mfa.clone()
    }

    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    pub async fn register(&self, request: NewIdentity) -> Result<Identity> {
        let phone = request.phone.trim();
        if phone.is_empty() {
            return Err(AuthError::Validation("Phone number is required".to_string()));
        }
        if self.store.find_by_phone(phone).await?.is_some() {
            return Err(AuthError::Validation(
                "An account with this phone number already exists".to_string(),
            ));
        }
        if let Some(email) = request.email.as_deref() {
            if self.store.find_by_email(email).await?.is_some() {
                return Err(AuthError::Validation(
                    "An account with this email already exists".to_string(),
                ));
            }
        }

        self.hasher.validate_strength(&request.password)?;
        let password_hash = self.hasher.hash(&request.password).await?;

        let mut identity = Identity::new(request.role, phone, password_hash);
        identity.email = request.email;
        identity.name = request.name;

        self.store.insert(identity.clone()).await?;
        tracing::info!(identity_id = %identity.id, role = %identity.role, "Identity registered");

        Ok(identity)
    }

    /// Password step of the login flow.
    ///
    /// Unknown identifier, deactivated account and wrong password are all
    /// reported as `InvalidCredentials`.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginOutcome> {
        let (identifier, found) = match (request.phone.as_deref(), request.email.as_deref()) {
            (Some(phone), _) => (phone, self.store.find_by_phone(phone).await?),
            (None, Some(email)) => (email, self.store.find_by_email(email).await?),
            (None, None) => {
                return Err(AuthError::Validation(
                    "Either phone or email is required".to_string(),
                ))
            }
        };

        let Some(identity) = found else {
            self.hasher.burn_verification(&request.password).await;
            redacted_warn!(identifier = identifier, reason = "unknown_identity", "Login failed");
            return Err(AuthError::InvalidCredentials);
        };

        let password_ok = self.hasher.verify(&request.password, &identity.password_hash).await?;
        if !password_ok || !identity.is_active {
            let reason = if identity.is_active { "wrong_password" } else { "inactive" };
            redacted_warn!(
                identifier = identifier,
                role = %identity.role,
                reason = reason,
                "Login failed"
            );
            return Err(AuthError::InvalidCredentials);
        }

        if identity.mfa_enabled {
            let challenge_token = self.tokens.issue_mfa_challenge(&identity)?;
            tracing::info!(identity_id = %identity.id, "Password accepted, MFA required");
            return Ok(LoginOutcome::MfaRequired {
                challenge_token,
                expires_in: self.tokens.challenge_ttl().num_seconds().max(0) as u64,
            });
        }

        let tokens = self.finish_login(&identity).await?;
        Ok(LoginOutcome::Authenticated { identity, tokens })
    }

    /// Second step of the login flow for identities with MFA enabled
    pub async fn complete_mfa_login(
        &self,
        challenge_token: &str,
        code: &str,
        use_backup_code: bool,
    ) -> Result<(Identity, TokenPair)> {
        let claims = self.tokens.verify_mfa_challenge(challenge_token)?;
        self.reserve_challenge(&claims)?;

        let outcome = self.second_factor(&claims, code, use_backup_code).await;
        if outcome.is_err() {
            // A wrong code leaves the challenge usable until it expires
            self.redeemed_challenges.remove(&claims.jti);
        }
        outcome
    }

    async fn second_factor(
        &self,
        claims: &MfaChallengeClaims,
        code: &str,
        use_backup_code: bool,
    ) -> Result<(Identity, TokenPair)> {
        let identity = self.active_identity(claims.identity_id()?).await?;

        if use_backup_code {
            let remaining = self.mfa.redeem_backup_code(identity.id, code).await?;
            if remaining <= 2 {
                tracing::warn!(identity_id = %identity.id, remaining, "Backup codes running low");
            }
        } else {
            self.mfa.verify_code(identity.id, code).await?;
        }

        let tokens = self.finish_login(&identity).await?;
        Ok((identity, tokens))
    }

    /// Claim a challenge for one exchange; a claimed `jti` is rejected until it expires
    fn reserve_challenge(&self, claims: &MfaChallengeClaims) -> Result<()> {
        let now = Utc::now().timestamp();
        self.redeemed_challenges.retain(|_, exp| *exp >= now);

        match self.redeemed_challenges.entry(claims.jti.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!(subject = %claims.sub, "MFA challenge replayed");
                Err(AuthError::InvalidToken)
            }
            Entry::Vacant(slot) => {
                let leeway = i64::try_from(self.tokens.leeway_secs()).unwrap_or(i64::MAX);
                slot.insert(claims.exp.saturating_add(leeway));
                Ok(())
            }
        }
    }

    /// Exchange a refresh token for a new pair carrying the current role
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.tokens.verify_refresh_token(refresh_token)?;
        let identity = self.active_identity(claims.identity_id()?).await?;
        self.tokens.issue_pair(&identity)
    }

    /// Verify an access token and return its claims
    pub fn authenticate(&self, access_token: &str) -> Result<AccessClaims> {
        self.tokens.verify_access_token(access_token)
    }

    pub async fn change_password(&self, identity_id: Uuid, current: &str, new: &str) -> Result<()> {
        let identity = self
            .store
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.verify(current, &identity.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }
        self.hasher.validate_strength(new)?;

        let password_hash = self.hasher.hash(new).await?;
        self.store.update_password_hash(identity.id, &password_hash).await?;

        tracing::info!(identity_id = %identity.id, "Password changed");
        Ok(())
    }

    pub async fn me(&self, identity_id: Uuid) -> Result<Identity> {
        self.active_identity(identity_id).await
    }

    pub async fn deactivate(&self, identity_id: Uuid) -> Result<()> {
        self.store.set_active(identity_id, false).await?;
        tracing::info!(identity_id = %identity_id, "Identity deactivated");
        Ok(())
    }

    async fn finish_login(&self, identity: &Identity) -> Result<TokenPair> {
        self.store.touch_last_login(identity.id, Utc::now()).await?;
        let tokens = self.tokens.issue_pair(identity)?;
        tracing::info!(identity_id = %identity.id, role = %identity.role, "Login succeeded");
        Ok(tokens)
    }

    // Tokens outlive account changes, so every refresh rechecks the store
    async fn active_identity(&self, identity_id: Uuid) -> Result<Identity> {
        match self.store.find_by_id(identity_id).await? {
            Some(identity) if identity.is_active => Ok(identity),
            _ => Err(AuthError::InvalidToken),
        }
    }
}
