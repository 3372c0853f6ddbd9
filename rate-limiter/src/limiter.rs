use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use config_engine::ConfigStore;
use error_common::{AuthError, DenialContext, Result};

use crate::config::{RateLimitConfig, TierLimit};
use crate::store::CounterStore;
use crate::tier::{RateLimitDecision, RequestIdentity, Tier};

/// Tiered fixed-window rate limiter.
///
/// Limits are read from the injected config store on every call. Counter
/// store faults and timeouts fail open unless the tier is marked
/// `fail_closed`.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: Arc<dyn ConfigStore<RateLimitConfig>>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: Arc<dyn ConfigStore<RateLimitConfig>>) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> Arc<RateLimitConfig> {
        self.config.snapshot()
    }

    /// Count one request against `tier` and report whether it fits.
    ///
    /// Only returns `Err` for a store fault on a fail-closed tier.
    pub async fn check(&self, tier: Tier, who: &RequestIdentity) -> Result<RateLimitDecision> {
        let config = self.config.snapshot();
        let budget = config.tier(tier);

        if !config.enabled {
            return Ok(unconstrained(budget));
        }

        let key = who.key_for(tier);
        let counted = tokio::time::timeout(
            config.store_timeout(),
            self.store.increment(&key, budget.window),
        )
        .await;

        let window = match counted {
            Ok(Ok(window)) => window,
            Ok(Err(e)) => return self.on_store_fault(tier, budget, e.to_string()),
            Err(_) => {
                return self.on_store_fault(
                    tier,
                    budget,
                    format!("counter store timed out after {}ms", config.store_timeout_ms),
                )
            }
        };

        let limit = u64::from(budget.limit);
        let reset_at = Utc::now()
            + ChronoDuration::from_std(window.ttl).unwrap_or_else(|_| ChronoDuration::seconds(0));
        let decision = RateLimitDecision {
            allowed: window.count <= limit,
            limit: budget.limit,
            remaining: limit.saturating_sub(window.count) as u32,
            reset_at,
        };

        if !decision.allowed {
            let identifier = logger_redacted::redact(who.identifier());
            let mut audit = DenialContext::new(identifier)
                .with_tier(tier.as_str())
                .add_context("count", window.count.to_string());
            if let Some(role) = who.role {
                audit = audit.with_role(role.as_str());
            }
            audit.log(&denied(&decision));
        }

        Ok(decision)
    }

    /// Like [`check`](Self::check) but turns a denial into `RateLimited`
    pub async fn enforce(&self, tier: Tier, who: &RequestIdentity) -> Result<RateLimitDecision> {
        let decision = self.check(tier, who).await?;
        if decision.allowed {
            Ok(decision)
        } else {
            Err(denied(&decision))
        }
    }

    fn on_store_fault(&self, tier: Tier, budget: &TierLimit, reason: String) -> Result<RateLimitDecision> {
        if budget.fail_closed {
            tracing::error!(tier = %tier, error = %reason, "Rate limit store unavailable, failing closed");
            return Err(AuthError::StoreUnavailable(reason));
        }
        tracing::error!(tier = %tier, error = %reason, "Rate limit store unavailable, failing open");
        Ok(unconstrained(budget))
    }
}

fn unconstrained(budget: &TierLimit) -> RateLimitDecision {
    RateLimitDecision {
        allowed: true,
        limit: budget.limit,
        remaining: budget.limit,
        reset_at: Utc::now()
            + ChronoDuration::from_std(budget.window).unwrap_or_else(|_| ChronoDuration::seconds(60)),
    }
}

fn denied(decision: &RateLimitDecision) -> AuthError {
    AuthError::RateLimited {
        retry_after: decision.retry_after(),
        limit: decision.limit,
        reset_at: decision.reset_at,
    }
}
