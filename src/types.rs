//! Shared types for Algorand transactions

use core::fmt;
use serde::{Deserialize, Serialize};

/// Minimum fee in microAlgos
pub const MIN_TXN_FEE: u64 = 1000;

/// Maximum number of transactions in one group
pub const MAX_GROUP_SIZE: usize = 16;

/// Transaction types the wallet builds and signs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionType {
    AssetConfig,
    AssetCreate,
    AssetDestroy,
    AssetFreeze,
    AssetTransfer,
}

impl TransactionType {
    /// The `type` field used on the wire
    pub fn wire_type(self) -> &'static str {
        match self {
            TransactionType::AssetConfig
            | TransactionType::AssetCreate
            | TransactionType::AssetDestroy => "acfg",
            TransactionType::AssetFreeze => "afrz",
            TransactionType::AssetTransfer => "axfer",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionType::AssetConfig => "assetConfig",
            TransactionType::AssetCreate => "assetCreate",
            TransactionType::AssetDestroy => "assetDestroy",
            TransactionType::AssetFreeze => "assetFreeze",
            TransactionType::AssetTransfer => "assetTransfer",
        };
        f.write_str(name)
    }
}

/// Suggested parameters fetched by the caller from an algod node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedParams {
    /// Fee per byte, or the total fee when `flat_fee` is set
    pub fee: u64,
    #[serde(default = "default_min_fee")]
    pub min_fee: u64,
    #[serde(default)]
    pub flat_fee: bool,
    pub first_valid: u64,
    pub last_valid: u64,
}

fn default_min_fee() -> u64 {
    MIN_TXN_FEE
}

/// Asset parameters, addresses as raw public keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetParams {
    pub total: u64,
    pub decimals: u32,
    pub default_frozen: bool,
    pub unit_name: Option<String>,
    pub asset_name: Option<String>,
    pub url: Option<String>,
    pub metadata_hash: Option<[u8; 32]>,
    pub manager: Option<[u8; 32]>,
    pub reserve: Option<[u8; 32]>,
    pub freeze: Option<[u8; 32]>,
    pub clawback: Option<[u8; 32]>,
}
