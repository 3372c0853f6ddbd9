use std::sync::Arc;

use auth_identity::{AuthService, MfaService, TokenService};
use auth_rbac::PermissionRegistry;
use rate_limiter::RateLimiter;

use crate::client_ip::TrustedProxies;

/// Shared handles for middleware and handlers
#[derive(Clone)]
pub struct GatewayState {
    pub auth: Arc<AuthService>,
    pub tokens: Arc<TokenService>,
    pub mfa: Arc<MfaService>,
    pub limiter: Arc<RateLimiter>,
    pub registry: PermissionRegistry,
    pub trusted_proxies: TrustedProxies,
}

impl GatewayState {
    pub fn new(auth: Arc<AuthService>, limiter: Arc<RateLimiter>, registry: PermissionRegistry) -> Self {
        Self {
            tokens: auth.tokens(),
            mfa: auth.mfa(),
            auth,
            limiter,
            registry,
            trusted_proxies: TrustedProxies::default(),
        }
    }

    /// Honour forwarding headers from these proxies
    pub fn with_trusted_proxies(mut self, trusted_proxies: TrustedProxies) -> Self {
        self.trusted_proxies = trusted_proxies;
        self
    }
}
