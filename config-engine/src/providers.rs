// Layered configuration sources: defaults, optional file, environment
use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::validation::Validate;

/// Environment prefix used by the server binary, e.g. `CARENET__TOKENS__ISSUER`
pub const DEFAULT_ENV_PREFIX: &str = "CARENET";

/// Load `T` from an optional file (format by extension) overlaid by
/// `{prefix}__SECTION__KEY` environment variables.
///
/// Fields absent from every source fall back to the serde defaults of `T`.
///
/// # Errors
///
/// Fails when the file is missing, a value cannot be parsed, or the result
/// does not pass [`Validate`].
pub fn load_config<T>(path: Option<&Path>, env_prefix: &str) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let mut builder = Config::builder();

    if let Some(path) = path {
        tracing::info!(path = %path.display(), "Loading configuration file");
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(env_prefix)
            .separator("__")
            .try_parsing(true),
    );

    let value: T = builder.build()?.try_deserialize()?;
    value.validate()?;
    Ok(value)
}

/// Load `T` from an in-memory TOML document, without environment overlay.
///
/// # Errors
///
/// Fails when the document cannot be parsed or does not pass [`Validate`].
pub fn load_from_toml<T>(document: &str) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let value: T = Config::builder()
        .add_source(File::from_str(document, FileFormat::Toml))
        .build()?
        .try_deserialize()?;
    value.validate()?;
    Ok(value)
}
