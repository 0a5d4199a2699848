//! Server configuration, driven by environment variables.

use anyhow::{Context, Result};
use manifold_signature::VerifierConfig;

/// Runtime configuration for the server.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Bind address for the gateway.
    pub gateway_listen: String,
    /// Log level, used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Signature verification settings.
    pub verifier: VerifierConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            gateway_listen: "0.0.0.0:4567".to_owned(),
            log_level: "info".to_owned(),
            verifier: VerifierConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        config.verifier =
            VerifierConfig::from_env().context("invalid signature verification settings")?;

        Ok(config)
    }

    /// The address health checks should connect to.
    ///
    /// A wildcard bind address is not connectable, so it is replaced by loopback.
    #[must_use]
    pub fn health_check_addr(&self) -> String {
        self.gateway_listen.replace("0.0.0.0", "127.0.0.1")
    }
}
