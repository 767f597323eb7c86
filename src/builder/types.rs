//! Intent types for transaction building
//!
//! Matches the wallet pattern: buildTransaction(intent, context)
//! - intent: what to do (transfer, freeze, etc.) - single operation
//! - context: how to build it (sender, network, note, suggested params)

use crate::network::Network;
use crate::types::SuggestedParams;
use serde::{de, Deserialize, Deserializer, Serialize};

/// Deserialize an optional asset id from either a number or a string
fn deserialize_asset_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct AssetIdVisitor;

    impl<'de> de::Visitor<'de> for AssetIdVisitor {
        type Value = Option<u64>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("an asset id as number or string")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Option<u64>, E>
        where
            E: de::Error,
        {
            Ok(Some(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Option<u64>, E>
        where
            E: de::Error,
        {
            u64::try_from(value)
                .map(Some)
                .map_err(|_| E::custom("negative asset ids not allowed"))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Option<u64>, E>
        where
            E: de::Error,
        {
            if value >= 0.0 && value.fract() == 0.0 && value < u64::MAX as f64 {
                Ok(Some(value as u64))
            } else {
                Err(E::custom("asset id must be a non-negative integer"))
            }
        }

        fn visit_str<E>(self, value: &str) -> Result<Option<u64>, E>
        where
            E: de::Error,
        {
            if value.is_empty() {
                return Ok(None);
            }
            value.parse().map(Some).map_err(E::custom)
        }

        fn visit_none<E>(self) -> Result<Option<u64>, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Option<u64>, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Option<u64>, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(AssetIdVisitor)
        }
    }

    deserializer.deserialize_any(AssetIdVisitor)
}

/// Deserialize u64 from either a number or string
fn deserialize_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum U64OrString {
        Number(u64),
        String(String),
    }

    match U64OrString::deserialize(deserializer)? {
        U64OrString::Number(n) => Ok(n),
        U64OrString::String(s) => s.parse().map_err(de::Error::custom),
    }
}

/// Transaction intent - what to do
///
/// Asset ids are optional at the type level so that a missing id is reported
/// as a validation error by the builder rather than a parse failure.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TransactionIntent {
    /// Reconfigure an asset's management addresses
    #[serde(rename_all = "camelCase")]
    AssetConfig {
        #[serde(default, deserialize_with = "deserialize_asset_id")]
        asset_id: Option<u64>,
        /// Addresses default to the sender when omitted
        #[serde(default)]
        manager: Option<String>,
        #[serde(default)]
        reserve: Option<String>,
        #[serde(default)]
        freeze: Option<String>,
        #[serde(default)]
        clawback: Option<String>,
    },
    /// Create a new asset
    #[serde(rename_all = "camelCase")]
    AssetCreate {
        /// Total supply in atomic units
        #[serde(deserialize_with = "deserialize_u64")]
        total: u64,
        #[serde(default)]
        decimals: u32,
        #[serde(default)]
        default_frozen: bool,
        #[serde(default)]
        unit_name: Option<String>,
        #[serde(default)]
        asset_name: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
    /// Destroy an asset (sender must be the manager)
    #[serde(rename_all = "camelCase")]
    AssetDestroy {
        #[serde(default, deserialize_with = "deserialize_asset_id")]
        asset_id: Option<u64>,
    },
    /// Freeze an account's holding of an asset
    #[serde(rename_all = "camelCase")]
    AssetFreeze {
        #[serde(default, deserialize_with = "deserialize_asset_id")]
        asset_id: Option<u64>,
        /// Defaults to the sender
        #[serde(default)]
        freeze_target: Option<String>,
    },
    /// Unfreeze an account's holding of an asset
    #[serde(rename_all = "camelCase")]
    AssetUnfreeze {
        #[serde(default, deserialize_with = "deserialize_asset_id")]
        asset_id: Option<u64>,
        /// Defaults to the sender
        #[serde(default)]
        freeze_target: Option<String>,
    },
    /// Transfer an asset; zero to self is an opt-in
    #[serde(rename_all = "camelCase")]
    AssetTransfer {
        #[serde(default, deserialize_with = "deserialize_asset_id")]
        asset_id: Option<u64>,
        /// Amount in standard units (e.g., "1.5")
        #[serde(default = "default_amount")]
        amount: String,
        /// Decimal places of the asset
        #[serde(default)]
        decimals: u32,
        /// Receiver, defaults to the sender
        #[serde(default)]
        to: Option<String>,
    },
}

fn default_amount() -> String {
    "0".to_string()
}

/// Build context - how to build the transaction
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildContext {
    /// Sender address
    pub sender: String,
    /// Target network (genesis id and hash come from here)
    pub network: Network,
    /// Optional UTF-8 note
    #[serde(default)]
    pub note: Option<String>,
    /// Suggested params from algod
    pub suggested_params: SuggestedParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_transfer_intent() {
        let json = r#"{
            "type": "assetTransfer",
            "assetId": "31566704",
            "amount": "1.5",
            "decimals": 6
        }"#;

        let intent: TransactionIntent = serde_json::from_str(json).unwrap();
        match intent {
            TransactionIntent::AssetTransfer {
                asset_id,
                amount,
                decimals,
                to,
            } => {
                assert_eq!(asset_id, Some(31566704));
                assert_eq!(amount, "1.5");
                assert_eq!(decimals, 6);
                assert!(to.is_none());
            }
            _ => panic!("Expected AssetTransfer"),
        }
    }

    #[test]
    fn test_deserialize_missing_asset_id() {
        let json = r#"{ "type": "assetDestroy" }"#;
        let intent: TransactionIntent = serde_json::from_str(json).unwrap();
        assert!(matches!(
            intent,
            TransactionIntent::AssetDestroy { asset_id: None }
        ));

        let json = r#"{ "type": "assetFreeze", "assetId": null }"#;
        let intent: TransactionIntent = serde_json::from_str(json).unwrap();
        assert!(matches!(
            intent,
            TransactionIntent::AssetFreeze { asset_id: None, .. }
        ));
    }

    #[test]
    fn test_deserialize_float_asset_id() {
        let json = r#"{ "type": "assetDestroy", "assetId": 12.0 }"#;
        let intent: TransactionIntent = serde_json::from_str(json).unwrap();
        assert!(matches!(
            intent,
            TransactionIntent::AssetDestroy { asset_id: Some(12) }
        ));

        // 2^64 would saturate to u64::MAX
        let json = r#"{ "type": "assetDestroy", "assetId": 18446744073709551616.0 }"#;
        assert!(serde_json::from_str::<TransactionIntent>(json).is_err());

        let json = r#"{ "type": "assetDestroy", "assetId": 1.5 }"#;
        assert!(serde_json::from_str::<TransactionIntent>(json).is_err());
    }

    #[test]
    fn test_deserialize_create_intent() {
        let json = r#"{
            "type": "assetCreate",
            "total": "1000000000",
            "decimals": 6,
            "unitName": "TST"
        }"#;

        let intent: TransactionIntent = serde_json::from_str(json).unwrap();
        match intent {
            TransactionIntent::AssetCreate {
                total, unit_name, ..
            } => {
                assert_eq!(total, 1_000_000_000);
                assert_eq!(unit_name.as_deref(), Some("TST"));
            }
            _ => panic!("Expected AssetCreate"),
        }
    }

    #[test]
    fn test_deserialize_unknown_type() {
        let json = r#"{ "type": "keyreg" }"#;
        assert!(serde_json::from_str::<TransactionIntent>(json).is_err());
    }
}
