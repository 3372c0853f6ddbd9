//! Axum middleware for authentication, authorization and rate limiting

use std::sync::Arc;

use auth_identity::extract_bearer;
use auth_rbac::Role;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use error_common::{AuthError, DenialContext};
use rate_limiter::{RateLimitDecision, RequestIdentity, Tier};

use crate::context::AuthContext;
use crate::error::ApiError;
use crate::state::GatewayState;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Require a valid access token and inject [`AuthContext`]
pub async fn auth_middleware(
    State(state): State<GatewayState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let verified = bearer_token(request.headers())
        .ok_or(AuthError::InvalidToken)
        .and_then(|token| state.tokens.verify_access_token(&token));

    let claims = match verified {
        Ok(claims) => claims,
        Err(err) => {
            let client = state
                .trusted_proxies
                .client_ip(&request)
                .map_or_else(|| "anonymous".to_string(), |ip| ip.to_string());
            DenialContext::new(logger_redacted::redact(&client))
                .add_context("path", request.uri().path())
                .log(&err);
            return Err(err.into());
        }
    };
    let auth_ctx = AuthContext::from_claims(&claims)?;

    tracing::debug!(
        identity_id = %auth_ctx.identity_id,
        role = %auth_ctx.role,
        "Request authenticated"
    );

    request.extensions_mut().insert(auth_ctx);
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Attach [`AuthContext`] when a valid token is present, never reject
pub async fn optional_auth_middleware(
    State(state): State<GatewayState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        if let Ok(claims) = state.tokens.verify_access_token(&token) {
            if let Ok(auth_ctx) = AuthContext::from_claims(&claims) {
                request.extensions_mut().insert(auth_ctx);
                request.extensions_mut().insert(claims);
            }
        }
    }

    next.run(request).await
}

/// Rate limit guard bound to one tier
#[derive(Clone)]
pub struct TierGuard {
    state: GatewayState,
    tier: Tier,
}

impl TierGuard {
    pub fn new(state: GatewayState, tier: Tier) -> Self {
        Self { state, tier }
    }

    /// Key by identity when the bearer token verifies, else by client address
    fn request_identity(&self, request: &Request<Body>) -> RequestIdentity {
        let client_addr = self
            .state
            .trusted_proxies
            .client_ip(request)
            .map(|ip| ip.to_string());

        let auth_ctx = request.extensions().get::<AuthContext>().cloned().or_else(|| {
            bearer_token(request.headers())
                .and_then(|token| self.state.tokens.verify_access_token(&token).ok())
                .and_then(|claims| AuthContext::from_claims(&claims).ok())
        });

        RequestIdentity {
            identity_id: auth_ctx.as_ref().map(|ctx| ctx.identity_id.to_string()),
            client_addr,
            role: auth_ctx.map(|ctx| ctx.role),
        }
    }
}

/// Count the request against the guard's tier.
///
/// Mounted outside authentication, so requests with missing or forged tokens
/// spend the client address budget. Every response carries the
/// `X-RateLimit-*` headers; a denied request gets 429 with `Retry-After` and
/// never reaches the handler.
pub async fn rate_limit_middleware(
    State(guard): State<TierGuard>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let who = guard.request_identity(&request);

    let decision = match guard.state.limiter.check(guard.tier, &who).await {
        Ok(decision) => decision,
        Err(err) => return ApiError(err).into_response(),
    };

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        ApiError(AuthError::RateLimited {
            retry_after: decision.retry_after(),
            limit: decision.limit,
            reset_at: decision.reset_at,
        })
        .into_response()
    };

    write_rate_limit_headers(response.headers_mut(), &decision);
    response
}

pub fn write_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_at_unix()));
}

/// Permission guard checked against the shared registry
#[derive(Clone)]
pub struct RequirePermission {
    state: GatewayState,
    permission: Arc<str>,
}

impl RequirePermission {
    pub fn new(state: GatewayState, permission: impl Into<Arc<str>>) -> Self {
        Self {
            state,
            permission: permission.into(),
        }
    }
}

pub async fn require_permission(
    State(guard): State<RequirePermission>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_ctx = request
        .extensions()
        .get::<AuthContext>()
        .ok_or(AuthError::InvalidToken)?;

    if !auth_ctx.has_permission(&guard.state.registry, &guard.permission) {
        let err = AuthError::InsufficientPermission;
        DenialContext::new(auth_ctx.identity_id.to_string())
            .with_role(auth_ctx.role.as_str())
            .add_context("required_permission", guard.permission.as_ref())
            .add_context("path", request.uri().path())
            .log(&err);
        return Err(err.into());
    }

    Ok(next.run(request).await)
}

/// Role allow-list guard
#[derive(Clone)]
pub struct RequireAnyRole {
    roles: Arc<[Role]>,
}

impl RequireAnyRole {
    pub fn new(roles: impl Into<Arc<[Role]>>) -> Self {
        Self { roles: roles.into() }
    }
}

pub async fn require_any_role(
    State(guard): State<RequireAnyRole>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_ctx = request
        .extensions()
        .get::<AuthContext>()
        .ok_or(AuthError::InvalidToken)?;

    if !auth_ctx.has_any_role(&guard.roles) {
        let err = AuthError::InsufficientPermission;
        DenialContext::new(auth_ctx.identity_id.to_string())
            .with_role(auth_ctx.role.as_str())
            .add_context("required_roles", format!("{:?}", guard.roles))
            .add_context("path", request.uri().path())
            .log(&err);
        return Err(err.into());
    }

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer)
        .map(str::to_string)
}
