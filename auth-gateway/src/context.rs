use async_trait::async_trait;
use auth_identity::AccessClaims;
use auth_rbac::{PermissionRegistry, Role};
use axum::{extract::FromRequestParts, http::request::Parts};
use error_common::AuthError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Authenticated caller, injected into request extensions by
/// [`auth_middleware`](crate::middleware::auth_middleware)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub identity_id: Uuid,
    pub role: Role,
    pub phone: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl AuthContext {
    pub fn from_claims(claims: &AccessClaims) -> Result<Self, AuthError> {
        Ok(Self {
            identity_id: claims.identity_id()?,
            role: claims.role,
            phone: claims.phone.clone(),
            email: claims.email.clone(),
            name: claims.name.clone(),
        })
    }

    pub fn has_permission(&self, registry: &PermissionRegistry, permission: &str) -> bool {
        registry.has_permission(self.role, permission)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        auth_rbac::has_any_role(self.role, roles)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(ApiError(AuthError::InvalidToken))
    }
}
