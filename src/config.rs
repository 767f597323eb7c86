//! Wallet configuration

use crate::error::WasmAlgoError;
use crate::network::{default_networks, find_by_genesis_hash, Network};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// When the signing authority asks the user before signing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningPolicy {
    /// Prompt to connect origins without a covering session; reject when false
    pub prompt_unknown_origins: bool,
    /// Prompt for each request even when a session covers the origin
    pub confirm_known_origins: bool,
}

impl Default for SigningPolicy {
    fn default() -> Self {
        SigningPolicy {
            prompt_unknown_origins: true,
            confirm_known_origins: true,
        }
    }
}

fn default_timeout_ms() -> u64 {
    300_000
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConfig {
    #[serde(default = "default_networks")]
    pub networks: Vec<Network>,
    #[serde(default)]
    pub policy: SigningPolicy,
    /// How long a sign request may wait for its response
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
    /// `EnvFilter` directive, e.g. "info" or "wasm_algo=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        WalletConfig {
            networks: default_networks(),
            policy: SigningPolicy::default(),
            request_timeout_ms: default_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

impl WalletConfig {
    /// Parse from camelCase JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, WasmAlgoError> {
        let config: WalletConfig = serde_json::from_str(json)
            .map_err(|e| WasmAlgoError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), WasmAlgoError> {
        if self.networks.is_empty() {
            return Err(WasmAlgoError::Config("At least one network is required".to_string()));
        }
        for network in &self.networks {
            network.genesis_hash_bytes()?;
        }
        if self.request_timeout_ms == 0 {
            return Err(WasmAlgoError::Config("requestTimeoutMs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn network(&self, genesis_hash: &str) -> Option<&Network> {
        find_by_genesis_hash(&self.networks, genesis_hash)
    }
}
