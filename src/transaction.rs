//! Core transaction types and canonical encoding for Algorand
//!
//! Transactions are MessagePack maps with keys in lexicographic order and
//! zero-valued fields omitted. The bytes signed are `"TX" || encoded`.

use crate::address::encode_address;
use crate::error::WasmAlgoError;
use crate::types::{AssetParams, TransactionType};
use data_encoding::BASE32_NOPAD;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use sha2::{Digest, Sha512_256};

/// Domain separation prefix for transaction signatures and ids
const TX_TAG: &[u8] = b"TX";

/// Bytes added by wrapping a transaction in `{sig, txn}`
const SIGNATURE_OVERHEAD: usize = 75;

/// Fields common to every transaction type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHeader {
    pub sender: [u8; 32],
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
    pub note: Option<Vec<u8>>,
    pub group: Option<[u8; 32]>,
    pub lease: Option<[u8; 32]>,
    pub rekey_to: Option<[u8; 32]>,
}

/// Type-specific transaction fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    AssetConfig {
        asset_id: u64,
        params: AssetParams,
    },
    AssetCreate {
        params: AssetParams,
    },
    AssetDestroy {
        asset_id: u64,
    },
    AssetFreeze {
        asset_id: u64,
        freeze_target: [u8; 32],
        freezing: bool,
    },
    AssetTransfer {
        asset_id: u64,
        amount: u64,
        receiver: [u8; 32],
        close_to: Option<[u8; 32]>,
    },
}

/// An unsigned Algorand transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub header: TransactionHeader,
    pub kind: TransactionKind,
}

impl UnsignedTransaction {
    pub fn tx_type(&self) -> TransactionType {
        match self.kind {
            TransactionKind::AssetConfig { .. } => TransactionType::AssetConfig,
            TransactionKind::AssetCreate { .. } => TransactionType::AssetCreate,
            TransactionKind::AssetDestroy { .. } => TransactionType::AssetDestroy,
            TransactionKind::AssetFreeze { .. } => TransactionType::AssetFreeze,
            TransactionKind::AssetTransfer { .. } => TransactionType::AssetTransfer,
        }
    }

    /// Sender address
    pub fn sender(&self) -> String {
        // A 32-byte key always encodes
        encode_address(&self.header.sender).unwrap_or_default()
    }

    /// Canonical MessagePack encoding
    pub fn encode(&self) -> Result<Vec<u8>, WasmAlgoError> {
        let wire = WireTransaction::from(self);
        rmp_serde::to_vec_named(&wire)
            .map_err(|e| WasmAlgoError::InvalidTransaction(format!("Encode failed: {}", e)))
    }

    /// Decode a transaction from its MessagePack encoding
    pub fn decode(bytes: &[u8]) -> Result<Self, WasmAlgoError> {
        if bytes.is_empty() {
            return Err(WasmAlgoError::InvalidTransaction(
                "Empty transaction".to_string(),
            ));
        }
        let wire: WireTransaction = rmp_serde::from_slice(bytes)
            .map_err(|e| WasmAlgoError::InvalidTransaction(format!("Decode failed: {}", e)))?;
        UnsignedTransaction::try_from(wire)
    }

    /// Bytes covered by the signature
    pub fn bytes_to_sign(&self) -> Result<Vec<u8>, WasmAlgoError> {
        Ok(tagged(&self.encode()?))
    }

    /// Transaction id (base32 of SHA-512/256 of the signed bytes)
    pub fn id(&self) -> Result<String, WasmAlgoError> {
        Ok(transaction_id(&self.encode()?))
    }

    /// Estimated size in bytes once signed
    pub fn estimate_size(&self) -> Result<usize, WasmAlgoError> {
        Ok(self.encode()?.len() + SIGNATURE_OVERHEAD)
    }
}

/// Id of an encoded transaction
pub fn transaction_id(txn_bytes: &[u8]) -> String {
    BASE32_NOPAD.encode(&Sha512_256::digest(tagged(txn_bytes)))
}

fn tagged(txn_bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(TX_TAG.len() + txn_bytes.len());
    out.extend_from_slice(TX_TAG);
    out.extend_from_slice(txn_bytes);
    out
}

/// A transaction together with a single Ed25519 signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Exact transaction bytes that were signed
    txn_bytes: Vec<u8>,
    transaction: UnsignedTransaction,
    signature: [u8; 64],
}

impl SignedTransaction {
    /// Sign encoded transaction bytes as-is
    pub fn sign(txn_bytes: &[u8], key: &SigningKey) -> Result<Self, WasmAlgoError> {
        let transaction = UnsignedTransaction::decode(txn_bytes)?;
        let signature = key.sign(&tagged(txn_bytes));
        Ok(SignedTransaction {
            txn_bytes: txn_bytes.to_vec(),
            transaction,
            signature: signature.to_bytes(),
        })
    }

    /// Encode as `{sig, txn}`, embedding the signed bytes unchanged
    pub fn encode(&self) -> Result<Vec<u8>, WasmAlgoError> {
        let err = |e: rmp::encode::ValueWriteError| {
            WasmAlgoError::InvalidTransaction(format!("Encode failed: {}", e))
        };
        let mut out = Vec::with_capacity(self.txn_bytes.len() + SIGNATURE_OVERHEAD);
        rmp::encode::write_map_len(&mut out, 2).map_err(err)?;
        rmp::encode::write_str(&mut out, "sig").map_err(err)?;
        rmp::encode::write_bin(&mut out, &self.signature).map_err(err)?;
        rmp::encode::write_str(&mut out, "txn").map_err(err)?;
        out.extend_from_slice(&self.txn_bytes);
        Ok(out)
    }

    /// Decode a signed transaction
    ///
    /// The inner transaction is re-encoded canonically, so fields this crate
    /// does not model are not preserved.
    pub fn decode(bytes: &[u8]) -> Result<Self, WasmAlgoError> {
        let wire: WireSignedTransaction = rmp_serde::from_slice(bytes)
            .map_err(|e| WasmAlgoError::InvalidTransaction(format!("Decode failed: {}", e)))?;
        let signature: [u8; 64] = wire.sig.into_vec().try_into().map_err(|s: Vec<u8>| {
            WasmAlgoError::InvalidTransaction(format!(
                "Signature must be 64 bytes, got {}",
                s.len()
            ))
        })?;
        let transaction = UnsignedTransaction::try_from(wire.txn)?;
        let txn_bytes = transaction.encode()?;
        Ok(SignedTransaction {
            txn_bytes,
            transaction,
            signature,
        })
    }

    pub fn transaction(&self) -> &UnsignedTransaction {
        &self.transaction
    }

    pub fn signature(&self) -> &[u8; 64] {
        &self.signature
    }

    /// Signature as uppercase hex, the form shown to users
    pub fn signature_hex(&self) -> String {
        hex::encode_upper(self.signature)
    }

    pub fn id(&self) -> String {
        transaction_id(&self.txn_bytes)
    }

    /// Check the signature against the sender's public key
    pub fn verify(&self) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.transaction.header.sender) else {
            return false;
        };
        key.verify(&tagged(&self.txn_bytes), &Signature::from_bytes(&self.signature))
            .is_ok()
    }
}

// =============================================================================
// Wire format (field order is the canonical key order)
// =============================================================================

fn is_zero(value: &u64) -> bool {
    *value == 0
}

fn is_zero_u32(value: &u32) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct WireAssetParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    am: Option<ByteBuf>,
    #[serde(skip_serializing_if = "String::is_empty")]
    an: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    au: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    c: Option<ByteBuf>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    dc: u32,
    #[serde(skip_serializing_if = "is_false")]
    df: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    f: Option<ByteBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    m: Option<ByteBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    r: Option<ByteBuf>,
    #[serde(skip_serializing_if = "is_zero")]
    t: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    un: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct WireTransaction {
    #[serde(skip_serializing_if = "is_zero")]
    aamt: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    aclose: Option<ByteBuf>,
    #[serde(skip_serializing_if = "is_false")]
    afrz: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    apar: Option<WireAssetParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    arcv: Option<ByteBuf>,
    #[serde(skip_serializing_if = "is_zero")]
    caid: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    fadd: Option<ByteBuf>,
    #[serde(skip_serializing_if = "is_zero")]
    faid: u64,
    #[serde(skip_serializing_if = "is_zero")]
    fee: u64,
    #[serde(skip_serializing_if = "is_zero")]
    fv: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    gen: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    gh: Option<ByteBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    grp: Option<ByteBuf>,
    #[serde(skip_serializing_if = "is_zero")]
    lv: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    lx: Option<ByteBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<ByteBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rekey: Option<ByteBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snd: Option<ByteBuf>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "is_zero")]
    xaid: u64,
}

#[derive(Debug, Deserialize)]
struct WireSignedTransaction {
    sig: ByteBuf,
    txn: WireTransaction,
}

/// Zero keys are the zero value and are omitted
fn key_field(key: &[u8; 32]) -> Option<ByteBuf> {
    if key.iter().all(|b| *b == 0) {
        None
    } else {
        Some(ByteBuf::from(key.to_vec()))
    }
}

fn optional_key_field(key: &Option<[u8; 32]>) -> Option<ByteBuf> {
    key.as_ref().and_then(key_field)
}

fn read_key(field: Option<ByteBuf>, name: &str) -> Result<Option<[u8; 32]>, WasmAlgoError> {
    field
        .map(|buf| {
            buf.into_vec().try_into().map_err(|b: Vec<u8>| {
                WasmAlgoError::InvalidTransaction(format!(
                    "Field {} must be 32 bytes, got {}",
                    name,
                    b.len()
                ))
            })
        })
        .transpose()
}

fn non_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn optional_string(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl From<&AssetParams> for WireAssetParams {
    fn from(params: &AssetParams) -> Self {
        WireAssetParams {
            am: optional_key_field(&params.metadata_hash),
            an: non_empty(&params.asset_name),
            au: non_empty(&params.url),
            c: optional_key_field(&params.clawback),
            dc: params.decimals,
            df: params.default_frozen,
            f: optional_key_field(&params.freeze),
            m: optional_key_field(&params.manager),
            r: optional_key_field(&params.reserve),
            t: params.total,
            un: non_empty(&params.unit_name),
        }
    }
}

impl TryFrom<WireAssetParams> for AssetParams {
    type Error = WasmAlgoError;

    fn try_from(wire: WireAssetParams) -> Result<Self, Self::Error> {
        Ok(AssetParams {
            total: wire.t,
            decimals: wire.dc,
            default_frozen: wire.df,
            unit_name: optional_string(wire.un),
            asset_name: optional_string(wire.an),
            url: optional_string(wire.au),
            metadata_hash: read_key(wire.am, "am")?,
            manager: read_key(wire.m, "m")?,
            reserve: read_key(wire.r, "r")?,
            freeze: read_key(wire.f, "f")?,
            clawback: read_key(wire.c, "c")?,
        })
    }
}

impl From<&UnsignedTransaction> for WireTransaction {
    fn from(tx: &UnsignedTransaction) -> Self {
        let header = &tx.header;
        let mut wire = WireTransaction {
            fee: header.fee,
            fv: header.first_valid,
            lv: header.last_valid,
            gen: header.genesis_id.clone(),
            gh: Some(ByteBuf::from(header.genesis_hash.to_vec())),
            grp: optional_key_field(&header.group),
            lx: optional_key_field(&header.lease),
            note: header
                .note
                .as_ref()
                .filter(|n| !n.is_empty())
                .map(|n| ByteBuf::from(n.clone())),
            rekey: optional_key_field(&header.rekey_to),
            snd: key_field(&header.sender),
            kind: tx.tx_type().wire_type().to_string(),
            ..Default::default()
        };

        match &tx.kind {
            TransactionKind::AssetConfig { asset_id, params } => {
                wire.caid = *asset_id;
                wire.apar = Some(params.into());
            }
            TransactionKind::AssetCreate { params } => {
                wire.apar = Some(params.into());
            }
            TransactionKind::AssetDestroy { asset_id } => {
                wire.caid = *asset_id;
            }
            TransactionKind::AssetFreeze {
                asset_id,
                freeze_target,
                freezing,
            } => {
                wire.faid = *asset_id;
                wire.fadd = key_field(freeze_target);
                wire.afrz = *freezing;
            }
            TransactionKind::AssetTransfer {
                asset_id,
                amount,
                receiver,
                close_to,
            } => {
                wire.xaid = *asset_id;
                wire.aamt = *amount;
                wire.arcv = key_field(receiver);
                wire.aclose = optional_key_field(close_to);
            }
        }

        wire
    }
}

impl TryFrom<WireTransaction> for UnsignedTransaction {
    type Error = WasmAlgoError;

    fn try_from(wire: WireTransaction) -> Result<Self, Self::Error> {
        let sender = read_key(wire.snd, "snd")?
            .ok_or_else(|| WasmAlgoError::InvalidTransaction("Missing sender".to_string()))?;
        let genesis_hash = read_key(wire.gh, "gh")?
            .ok_or_else(|| WasmAlgoError::InvalidTransaction("Missing genesis hash".to_string()))?;

        let kind = match wire.kind.as_str() {
            "axfer" => {
                if wire.xaid == 0 {
                    return Err(WasmAlgoError::InvalidTransaction(
                        "Asset transfer without asset id".to_string(),
                    ));
                }
                TransactionKind::AssetTransfer {
                    asset_id: wire.xaid,
                    amount: wire.aamt,
                    receiver: read_key(wire.arcv, "arcv")?.unwrap_or([0u8; 32]),
                    close_to: read_key(wire.aclose, "aclose")?,
                }
            }
            "afrz" => {
                if wire.faid == 0 {
                    return Err(WasmAlgoError::InvalidTransaction(
                        "Asset freeze without asset id".to_string(),
                    ));
                }
                TransactionKind::AssetFreeze {
                    asset_id: wire.faid,
                    freeze_target: read_key(wire.fadd, "fadd")?.unwrap_or([0u8; 32]),
                    freezing: wire.afrz,
                }
            }
            "acfg" => match (wire.caid, wire.apar) {
                (0, Some(params)) => TransactionKind::AssetCreate {
                    params: params.try_into()?,
                },
                (0, None) => {
                    return Err(WasmAlgoError::InvalidTransaction(
                        "Asset config without asset id or params".to_string(),
                    ))
                }
                (asset_id, Some(params)) => TransactionKind::AssetConfig {
                    asset_id,
                    params: params.try_into()?,
                },
                (asset_id, None) => TransactionKind::AssetDestroy { asset_id },
            },
            other => return Err(WasmAlgoError::UnknownTransactionType(other.to_string())),
        };

        Ok(UnsignedTransaction {
            header: TransactionHeader {
                sender,
                fee: wire.fee,
                first_valid: wire.fv,
                last_valid: wire.lv,
                genesis_id: wire.gen,
                genesis_hash,
                note: wire.note.map(ByteBuf::into_vec),
                group: read_key(wire.grp, "grp")?,
                lease: read_key(wire.lx, "lx")?,
                rekey_to: read_key(wire.rekey, "rekey")?,
            },
            kind,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    pub(crate) fn test_header(sender: [u8; 32]) -> TransactionHeader {
        TransactionHeader {
            sender,
            fee: 1000,
            first_valid: 1,
            last_valid: 1001,
            genesis_id: "testnet-v1.0".to_string(),
            genesis_hash: [9u8; 32],
            note: None,
            group: None,
            lease: None,
            rekey_to: None,
        }
    }

    fn opt_in(sender: [u8; 32]) -> UnsignedTransaction {
        UnsignedTransaction {
            header: test_header(sender),
            kind: TransactionKind::AssetTransfer {
                asset_id: 10,
                amount: 0,
                receiver: sender,
                close_to: None,
            },
        }
    }

    #[test]
    fn test_canonical_opt_in_encoding() {
        let tx = opt_in([1u8; 32]);
        let expected = concat!(
            "89",
            "a461726376", "c420", "0101010101010101010101010101010101010101010101010101010101010101",
            "a3666565", "cd03e8",
            "a26676", "01",
            "a367656e", "ac", "746573746e65742d76312e30",
            "a26768", "c420", "0909090909090909090909090909090909090909090909090909090909090909",
            "a26c76", "cd03e9",
            "a3736e64", "c420", "0101010101010101010101010101010101010101010101010101010101010101",
            "a474797065", "a56178666572",
            "a478616964", "0a",
        );
        assert_eq!(hex::encode(tx.encode().unwrap()), expected);
    }

    #[test]
    fn test_decode_each_kind() {
        let sender = [3u8; 32];
        let kinds = vec![
            TransactionKind::AssetCreate {
                params: AssetParams {
                    total: 1_000_000,
                    decimals: 6,
                    unit_name: Some("TST".to_string()),
                    asset_name: Some("Test".to_string()),
                    manager: Some(sender),
                    ..Default::default()
                },
            },
            TransactionKind::AssetConfig {
                asset_id: 5,
                params: AssetParams {
                    manager: Some(sender),
                    ..Default::default()
                },
            },
            TransactionKind::AssetDestroy { asset_id: 5 },
            TransactionKind::AssetFreeze {
                asset_id: 5,
                freeze_target: [4u8; 32],
                freezing: true,
            },
        ];

        for kind in kinds {
            let tx = UnsignedTransaction {
                header: test_header(sender),
                kind,
            };
            let decoded = UnsignedTransaction::decode(&tx.encode().unwrap()).unwrap();
            assert_eq!(decoded, tx);
        }
    }

    #[test]
    fn test_unfreeze_omits_flag() {
        let tx = UnsignedTransaction {
            header: test_header([3u8; 32]),
            kind: TransactionKind::AssetFreeze {
                asset_id: 5,
                freeze_target: [4u8; 32],
                freezing: false,
            },
        };
        let decoded = UnsignedTransaction::decode(&tx.encode().unwrap()).unwrap();
        assert!(matches!(
            decoded.kind,
            TransactionKind::AssetFreeze { freezing: false, .. }
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(UnsignedTransaction::decode(&[]).is_err());
        assert!(UnsignedTransaction::decode(&[0xff, 0x00]).is_err());
    }

    #[test]
    fn test_decode_unknown_type() {
        let mut wire = WireTransaction::from(&opt_in([1u8; 32]));
        wire.kind = "pay".to_string();
        let bytes = rmp_serde::to_vec_named(&wire).unwrap();
        assert!(matches!(
            UnsignedTransaction::decode(&bytes),
            Err(WasmAlgoError::UnknownTransactionType(t)) if t == "pay"
        ));
    }

    #[test]
    fn test_sign_and_verify() {
        let key = test_key();
        let tx = opt_in(key.verifying_key().to_bytes());
        let bytes = tx.encode().unwrap();

        let signed = SignedTransaction::sign(&bytes, &key).unwrap();
        assert!(signed.verify());
        assert_eq!(signed.id(), tx.id().unwrap());
        assert_eq!(signed.signature_hex().len(), 128);
        assert_eq!(signed.signature_hex(), signed.signature_hex().to_uppercase());

        let decoded = SignedTransaction::decode(&signed.encode().unwrap()).unwrap();
        assert_eq!(decoded, signed);
        assert!(decoded.verify());
    }

    #[test]
    fn test_wrong_key_fails_verification() {
        let tx = opt_in([1u8; 32]);
        let signed = SignedTransaction::sign(&tx.encode().unwrap(), &test_key()).unwrap();
        assert!(!signed.verify());
    }

    #[test]
    fn test_id_shape() {
        let id = opt_in([1u8; 32]).id().unwrap();
        assert_eq!(id.len(), 52);
    }
}
