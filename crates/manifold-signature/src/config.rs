//! Verifier configuration.
//!
//! All configuration is driven by environment variables.

use std::time::Duration;

use crate::chain::MANIFOLD_MASTER_KEY;
use crate::error::ConfigError;

/// Environment variable holding the base64 master public key.
pub const MASTER_KEY_ENV: &str = "SIGNATURE_MASTER_KEY";

/// Environment variable holding the permitted clock skew, in seconds.
pub const PERMITTED_SKEW_ENV: &str = "SIGNATURE_PERMITTED_SKEW_SECS";

/// Configuration for a [`Verifier`](crate::Verifier).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierConfig {
    /// Base64 encoded Ed25519 master public key.
    pub master_key: String,
    /// Maximum accepted difference between the request date and now, in seconds.
    pub permitted_skew_secs: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            master_key: MANIFOLD_MASTER_KEY.to_owned(),
            permitted_skew_secs: 300,
        }
    }
}

impl VerifierConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the skew is not a whole number
    /// of seconds.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// Missing variables keep their default value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the skew is not a whole number
    /// of seconds.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = lookup(MASTER_KEY_ENV) {
            config.master_key = v;
        }
        if let Some(v) = lookup(PERMITTED_SKEW_ENV) {
            config.permitted_skew_secs =
                v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    name: PERMITTED_SKEW_ENV,
                    value: v,
                })?;
        }

        Ok(config)
    }

    /// The permitted skew as a [`Duration`].
    #[must_use]
    pub fn permitted_skew(&self) -> Duration {
        Duration::from_secs(self.permitted_skew_secs)
    }
}
