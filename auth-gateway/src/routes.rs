use auth_rbac::Role;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use rate_limiter::Tier;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{
    auth_middleware, rate_limit_middleware, require_any_role, require_permission, RequireAnyRole,
    RequirePermission, TierGuard,
};
use crate::state::GatewayState;

/// The `/auth` surface with its guards attached.
///
/// The last route layer runs first. Rate limiting is outermost on every
/// router, so a request is counted before its token is checked.
pub fn auth_routes(state: GatewayState) -> Router {
    let auth_tier = TierGuard::new(state.clone(), Tier::Auth);
    let general_tier = TierGuard::new(state.clone(), Tier::General);

    let credentials = Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/auth/mfa/login", post(handlers::mfa_login))
        .route("/auth/mfa/recover", post(handlers::mfa_recover))
        .route_layer(from_fn_with_state(auth_tier.clone(), rate_limit_middleware));

    let refresh = Router::new()
        .route("/auth/refresh", post(handlers::refresh))
        .route_layer(from_fn_with_state(general_tier.clone(), rate_limit_middleware));

    let mfa = Router::new()
        .route("/auth/mfa/setup", post(handlers::mfa_setup))
        .route("/auth/mfa/verify", post(handlers::mfa_verify))
        .route("/auth/mfa/disable", post(handlers::mfa_disable))
        .route("/auth/password", post(handlers::change_password))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
        .route_layer(from_fn_with_state(auth_tier, rate_limit_middleware));

    let session = Router::new()
        .route("/auth/me", get(handlers::me))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
        .route_layer(from_fn_with_state(general_tier.clone(), rate_limit_middleware));

    let staff = Router::new()
        .route("/auth/roles", get(handlers::list_roles))
        .route_layer(from_fn_with_state(
            RequireAnyRole::new(vec![Role::Moderator, Role::Admin]),
            require_any_role,
        ))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
        .route_layer(from_fn_with_state(general_tier.clone(), rate_limit_middleware));

    let admin = Router::new()
        .route(
            "/auth/identities/:id/deactivate",
            post(handlers::deactivate_identity),
        )
        .route_layer(from_fn_with_state(
            RequirePermission::new(state.clone(), "users:write"),
            require_permission,
        ))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
        .route_layer(from_fn_with_state(general_tier, rate_limit_middleware));

    Router::new()
        .merge(credentials)
        .merge(refresh)
        .merge(mfa)
        .merge(session)
        .merge(staff)
        .merge(admin)
        .with_state(state)
}

/// Full application router with health check and request tracing
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth_routes(state))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
