use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::AuthError;

/// Audit context attached to every denied request.
///
/// Carries who was denied and where, never secrets, hashes or token values.
/// The identifier is expected to be redacted by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DenialContext {
    pub identifier: String,
    pub role: Option<String>,
    pub tier: Option<String>,
    pub additional: HashMap<String, String>,
}

impl DenialContext {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = Some(tier.into());
        self
    }

    pub fn add_context<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.additional.insert(key.into(), value.into());
        self
    }

    /// Emit the audit line for a denial
    pub fn log(&self, error: &AuthError) {
        tracing::warn!(
            identifier = %self.identifier,
            role = self.role.as_deref().unwrap_or("anonymous"),
            tier = self.tier.as_deref().unwrap_or("-"),
            error_code = error.code(),
            extra = ?self.additional,
            "Request denied"
        );
    }
}
