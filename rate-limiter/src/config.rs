use std::time::Duration;

use config_engine::{ConfigError, Validate};
use serde::{Deserialize, Serialize};

use crate::tier::Tier;

/// Budget for one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierLimit {
    /// Requests allowed per window
    pub limit: u32,

    /// Window length (in seconds, for serialization)
    #[serde(with = "duration_secs", default = "default_window")]
    pub window: Duration,

    /// Deny instead of allow when the counter store is unreachable
    #[serde(default)]
    pub fail_closed: bool,
}

impl TierLimit {
    pub fn per_minute(limit: u32) -> Self {
        Self {
            limit,
            window: default_window(),
            fail_closed: false,
        }
    }
}

/// Per-tier limits, read from a config store on every check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_auth")]
    pub auth: TierLimit,

    #[serde(default = "default_payment")]
    pub payment: TierLimit,

    #[serde(default = "default_webhook")]
    pub webhook: TierLimit,

    #[serde(default = "default_general")]
    pub general: TierLimit,

    /// Upper bound on a single counter store call (default: 250ms)
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Disable to let every request through without touching the store
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Serialize Duration as seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

fn default_window() -> Duration {
    Duration::from_secs(60)
}

fn default_auth() -> TierLimit {
    TierLimit::per_minute(5)
}

fn default_payment() -> TierLimit {
    TierLimit::per_minute(10)
}

fn default_webhook() -> TierLimit {
    TierLimit::per_minute(1000)
}

fn default_general() -> TierLimit {
    TierLimit::per_minute(100)
}

fn default_store_timeout_ms() -> u64 {
    250
}

fn default_enabled() -> bool {
    true
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            auth: default_auth(),
            payment: default_payment(),
            webhook: default_webhook(),
            general: default_general(),
            store_timeout_ms: default_store_timeout_ms(),
            enabled: default_enabled(),
        }
    }
}

impl RateLimitConfig {
    pub fn tier(&self, tier: Tier) -> &TierLimit {
        match tier {
            Tier::Auth => &self.auth,
            Tier::Payment => &self.payment,
            Tier::Webhook => &self.webhook,
            Tier::General => &self.general,
        }
    }

    pub fn tier_mut(&mut self, tier: Tier) -> &mut TierLimit {
        match tier {
            Tier::Auth => &mut self.auth,
            Tier::Payment => &mut self.payment,
            Tier::Webhook => &mut self.webhook,
            Tier::General => &mut self.general,
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Validate for RateLimitConfig {
    fn validate(&self) -> config_engine::Result<()> {
        for tier in Tier::ALL {
            let limit = self.tier(tier);
            if limit.limit == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "rate limit for tier '{tier}' must be positive"
                )));
            }
            if limit.window.is_zero() {
                return Err(ConfigError::ValidationError(format!(
                    "rate limit window for tier '{tier}' must be at least one second"
                )));
            }
        }
        if self.store_timeout_ms == 0 || self.store_timeout_ms >= 1000 {
            return Err(ConfigError::ValidationError(
                "store_timeout_ms must be between 1 and 999".to_string(),
            ));
        }
        Ok(())
    }
}
