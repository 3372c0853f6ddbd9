use std::fmt;
use std::time::Duration;

use auth_rbac::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Endpoint class sharing one budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Auth,
    Payment,
    Webhook,
    #[default]
    General,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Auth, Tier::Payment, Tier::Webhook, Tier::General];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Auth => "auth",
            Tier::Payment => "payment",
            Tier::Webhook => "webhook",
            Tier::General => "general",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a request is attributed to
#[derive(Debug, Clone, Default)]
pub struct RequestIdentity {
    pub identity_id: Option<String>,
    pub client_addr: Option<String>,
    /// Only used for audit logging
    pub role: Option<Role>,
}

impl RequestIdentity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_client(addr: impl Into<String>) -> Self {
        Self {
            client_addr: Some(addr.into()),
            ..Self::default()
        }
    }

    pub fn from_identity(id: impl Into<String>, role: Role) -> Self {
        Self {
            identity_id: Some(id.into()),
            role: Some(role),
            ..Self::default()
        }
    }

    pub fn with_client_addr(mut self, addr: impl Into<String>) -> Self {
        self.client_addr = Some(addr.into());
        self
    }

    /// Identity id, else client address, else `anonymous`
    pub fn identifier(&self) -> &str {
        self.identity_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or_else(|| self.client_addr.as_deref().filter(|addr| !addr.is_empty()))
            .unwrap_or("anonymous")
    }

    /// Counter key for `tier`, `{tier}:{identifier}`
    pub fn key_for(&self, tier: Tier) -> String {
        format!("{}:{}", tier.as_str(), self.identifier())
    }
}

/// Outcome of one rate limit check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Time until the window resets, never below one second
    pub fn retry_after(&self) -> Duration {
        let millis = (self.reset_at - Utc::now()).num_milliseconds().max(0) as u64;
        Duration::from_millis(millis).max(Duration::from_secs(1))
    }

    pub fn reset_at_unix(&self) -> i64 {
        self.reset_at.timestamp()
    }
}
