use auth_identity::IdentityConfig;
use config_engine::{ConfigError, Validate};
use ipnetwork::IpNetwork;
use logger_redacted::LoggerConfig;
use rate_limiter::RateLimitConfig;
use secrecy::ExposeSecret;
use serde::Deserialize;

/// Server configuration, loaded from an optional file overlaid by
/// `CARENET__SECTION__KEY` environment variables
#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub logging: LoggerConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub redis: RedisConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Browser origins allowed by CORS; empty disables cross-origin access
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Proxy networks (CIDR) whose `X-Forwarded-For` is believed; empty keys
    /// rate limits on the socket address alone
    #[serde(default)]
    pub trusted_proxies: Vec<IpNetwork>,
}

/// Shared counter store for rate limiting. Without a URL every replica
/// keeps its own in-process counters.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_namespace() -> String {
    rate_limiter::RedisCounterStore::DEFAULT_NAMESPACE.to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            namespace: default_namespace(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> config_engine::Result<()> {
        if self.http.port == 0 {
            return Err(ConfigError::ValidationError("http.port must be non-zero".to_string()));
        }

        let tokens = &self.identity.tokens;
        let access = tokens.access_secret.expose_secret();
        let refresh = tokens.refresh_secret.expose_secret();
        if access.is_empty() || refresh.is_empty() {
            return Err(ConfigError::ValidationError(
                "identity.tokens.access_secret and identity.tokens.refresh_secret are required"
                    .to_string(),
            ));
        }
        if access == refresh {
            return Err(ConfigError::ValidationError(
                "access and refresh token secrets must differ".to_string(),
            ));
        }

        if matches!(self.redis.url.as_deref(), Some(url) if url.trim().is_empty()) {
            return Err(ConfigError::ValidationError("redis.url must not be blank".to_string()));
        }

        self.rate_limit.validate()
    }
}
