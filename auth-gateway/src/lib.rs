//! HTTP surface of the CareNet auth core
//!
//! Wires [`auth_identity`], [`auth_rbac`] and [`rate_limiter`] into axum:
//!
//! - [`middleware::auth_middleware`] verifies the bearer access token and
//!   injects an [`AuthContext`]
//! - [`middleware::rate_limit_middleware`] counts the request against a
//!   [`rate_limiter::Tier`] and writes `X-RateLimit-*` headers; it runs
//!   outside authentication so rejected tokens are counted too
//! - [`client_ip::TrustedProxies`] decides when `X-Forwarded-For` is believed
//! - [`middleware::RequirePermission`] and [`middleware::RequireAnyRole`]
//!   reject with 403
//! - [`error::ApiError`] renders every [`error_common::AuthError`] as
//!   `{"error", "code", "status"}`
//!
//! # Example
//!
//! ```rust,no_run
//! use auth_gateway::{router, GatewayState};
//!
//! async fn serve(state: GatewayState) -> std::io::Result<()> {
//!     let app = router(state);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(
//!         listener,
//!         app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
//!     )
//!     .await
//! }
//! ```

pub mod client_ip;
pub mod context;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use client_ip::TrustedProxies;
pub use context::AuthContext;
pub use error::ApiError;
pub use middleware::{
    auth_middleware, optional_auth_middleware, rate_limit_middleware, RequireAnyRole,
    RequirePermission, TierGuard,
};
pub use routes::{auth_routes, router};
pub use state::GatewayState;
