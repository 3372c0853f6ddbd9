use auth_identity::{Identity, LoginOutcome, LoginRequest, MfaEnrollment, MfaState, TokenPair};
use auth_rbac::Role;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use error_common::AuthError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::AuthContext;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Refresh request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Second login step, TOTP or backup code
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaLoginRequest {
    pub challenge_token: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct MfaCodeRequest {
    pub code: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MfaDisableRequest {
    pub code: Option<String>,
}

/// Successful login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub identity: Identity,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaStatusResponse {
    pub mfa_enabled: bool,
    pub message: &'static str,
}

/// Current caller with effective permissions
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub identity: Identity,
    pub role_name: &'static str,
    pub permissions: Vec<String>,
    pub mfa_state: MfaState,
}

/// `POST /auth/login`
///
/// Answers with tokens, or with `{"status":"mfa_required","challengeToken"}`
/// when the identity has MFA enabled.
pub async fn login(
    State(state): State<GatewayState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginOutcome>, ApiError> {
    let outcome = state.auth.login(request).await?;
    Ok(Json(outcome))
}

/// `POST /auth/refresh`
pub async fn refresh(
    State(state): State<GatewayState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let tokens = state.auth.refresh(&request.refresh_token).await?;
    Ok(Json(tokens))
}

/// `POST /auth/mfa/login`
pub async fn mfa_login(
    State(state): State<GatewayState>,
    Json(request): Json<MfaLoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let (identity, tokens) = state
        .auth
        .complete_mfa_login(&request.challenge_token, &request.code, false)
        .await?;
    Ok(Json(SessionResponse { identity, tokens }))
}

/// `POST /auth/mfa/recover`, the second step with a single-use backup code
pub async fn mfa_recover(
    State(state): State<GatewayState>,
    Json(request): Json<MfaLoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let (identity, tokens) = state
        .auth
        .complete_mfa_login(&request.challenge_token, &request.code, true)
        .await?;
    Ok(Json(SessionResponse { identity, tokens }))
}

/// `POST /auth/mfa/setup`
pub async fn mfa_setup(
    State(state): State<GatewayState>,
    auth_ctx: AuthContext,
) -> Result<Json<MfaEnrollment>, ApiError> {
    let enrollment = state.mfa.start_enrollment(auth_ctx.identity_id).await?;
    Ok(Json(enrollment))
}

/// `POST /auth/mfa/verify`, confirms a pending enrollment
pub async fn mfa_verify(
    State(state): State<GatewayState>,
    auth_ctx: AuthContext,
    Json(request): Json<MfaCodeRequest>,
) -> Result<Json<MfaStatusResponse>, ApiError> {
    state
        .mfa
        .confirm_enrollment(auth_ctx.identity_id, &request.code)
        .await?;
    Ok(Json(MfaStatusResponse {
        mfa_enabled: true,
        message: "MFA enabled successfully",
    }))
}

/// `POST /auth/mfa/disable`
///
/// A current TOTP code is required while MFA is enabled; a pending
/// enrollment can be abandoned without one.
pub async fn mfa_disable(
    State(state): State<GatewayState>,
    auth_ctx: AuthContext,
    request: Option<Json<MfaDisableRequest>>,
) -> Result<Json<MfaStatusResponse>, ApiError> {
    let Json(request) = request.unwrap_or_default();

    if state.mfa.state(auth_ctx.identity_id).await? == MfaState::Enabled {
        let code = request.code.as_deref().ok_or_else(|| {
            AuthError::Validation("A current MFA code is required".to_string())
        })?;
        state.mfa.verify_code(auth_ctx.identity_id, code).await?;
    }

    state.mfa.disable(auth_ctx.identity_id).await?;
    Ok(Json(MfaStatusResponse {
        mfa_enabled: false,
        message: "MFA disabled",
    }))
}

/// `GET /auth/me`
pub async fn me(
    State(state): State<GatewayState>,
    auth_ctx: AuthContext,
) -> Result<Json<MeResponse>, ApiError> {
    let identity = state.auth.me(auth_ctx.identity_id).await?;
    let permissions = state
        .registry
        .permissions_for(identity.role)
        .into_iter()
        .map(str::to_string)
        .collect();

    Ok(Json(MeResponse {
        role_name: identity.role.display_name(),
        mfa_state: identity.mfa_state(),
        permissions,
        identity,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSummary {
    pub role: Role,
    pub name: &'static str,
    pub description: &'static str,
    pub permissions: Vec<String>,
}

/// `POST /auth/password`
pub async fn change_password(
    State(state): State<GatewayState>,
    auth_ctx: AuthContext,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .auth
        .change_password(auth_ctx.identity_id, &request.current_password, &request.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /auth/roles`, staff only
pub async fn list_roles(State(state): State<GatewayState>) -> Json<Vec<RoleSummary>> {
    let roles = Role::ALL
        .iter()
        .map(|&role| RoleSummary {
            role,
            name: role.display_name(),
            description: role.description(),
            permissions: state
                .registry
                .permissions_for(role)
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
        .collect();
    Json(roles)
}

/// `POST /auth/identities/:id/deactivate`
pub async fn deactivate_identity(
    State(state): State<GatewayState>,
    auth_ctx: AuthContext,
    Path(identity_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.auth.deactivate(identity_id).await?;
    tracing::info!(
        identity_id = %identity_id,
        actor = %auth_ctx.identity_id,
        "Identity deactivated by staff"
    );
    Ok(StatusCode::NO_CONTENT)
}
