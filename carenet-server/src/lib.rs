//! CareNet auth core server assembly
//!
//! [`build_state`] turns a [`ServerConfig`] into the shared
//! [`GatewayState`]; [`build_app`] adds CORS on top of the gateway router.

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use auth_gateway::{router, GatewayState, TrustedProxies};
use auth_identity::{AuthService, InMemoryIdentityStore};
use auth_rbac::PermissionRegistry;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    Router,
};
use config_engine::InMemoryConfigStore;
use rate_limiter::{CounterStore, InMemoryCounterStore, RateLimiter, RedisCounterStore};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

pub use config::{HttpConfig, RedisConfig, ServerConfig};

const COUNTER_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Wire identity, RBAC and rate limiting from configuration.
///
/// # Errors
///
/// Fails when the token or password settings are rejected by the services.
pub async fn build_state(config: ServerConfig) -> anyhow::Result<GatewayState> {
    let ServerConfig {
        http,
        identity,
        rate_limit,
        redis,
        ..
    } = config;

    let identities = Arc::new(InMemoryIdentityStore::new());
    let auth = Arc::new(AuthService::new(identities, identity)?);

    let counters = counter_store(&redis).await;
    let limiter = Arc::new(RateLimiter::new(
        counters,
        Arc::new(InMemoryConfigStore::new(rate_limit)),
    ));

    let trusted_proxies = TrustedProxies::new(http.trusted_proxies);
    if !trusted_proxies.is_empty() {
        info!(proxies = ?trusted_proxies, "Forwarded client addresses honoured from trusted proxies");
    }

    Ok(GatewayState::new(auth, limiter, PermissionRegistry::default())
        .with_trusted_proxies(trusted_proxies))
}

/// Gateway router with the configured CORS policy
pub fn build_app(state: GatewayState, http: &HttpConfig) -> Router {
    router(state).layer(cors_layer(&http.cors_origins))
}

async fn counter_store(redis: &RedisConfig) -> Arc<dyn CounterStore> {
    if let Some(url) = redis.url.as_deref() {
        match RedisCounterStore::connect(url, redis.namespace.clone()).await {
            Ok(store) => {
                info!(namespace = %redis.namespace, "Rate limit counters in Redis");
                return Arc::new(store);
            }
            Err(err) => {
                warn!(error = %err, "Redis unavailable at startup, using in-process rate limit counters");
            }
        }
    }

    let store = Arc::new(InMemoryCounterStore::new());
    let purged = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(COUNTER_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let removed = purged.purge_expired();
            if removed > 0 {
                tracing::debug!(removed, "Purged expired rate limit windows");
            }
        }
    });
    store
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([
            HeaderName::from_static(auth_gateway::middleware::X_RATELIMIT_LIMIT),
            HeaderName::from_static(auth_gateway::middleware::X_RATELIMIT_REMAINING),
            HeaderName::from_static(auth_gateway::middleware::X_RATELIMIT_RESET),
            header::RETRY_AFTER,
        ])
}
