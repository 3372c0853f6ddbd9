// Configuration validation run before a snapshot becomes visible
use crate::error::Result;

pub trait Validate {
    /// Reject values that must never reach a reader.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::ValidationError`] describing the first violation.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}
