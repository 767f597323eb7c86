//! WASM bindings for unsigned and signed transactions
//!
//! Thin wrappers around the core transaction types with #[wasm_bindgen]

use crate::address::encode_address;
use crate::error::WasmAlgoError;
use crate::js_obj;
use crate::transaction::{SignedTransaction, TransactionKind, UnsignedTransaction};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use wasm_bindgen::prelude::*;

fn decode_base64(encoded: &str) -> Result<Vec<u8>, WasmAlgoError> {
    BASE64
        .decode(encoded)
        .map_err(|e| WasmAlgoError::InvalidTransaction(format!("Invalid base64: {}", e)))
}

fn address(key: &[u8; 32]) -> Result<String, WasmAlgoError> {
    encode_address(key)
}

/// WASM-exposed unsigned transaction
#[wasm_bindgen]
pub struct WasmTransaction {
    inner: UnsignedTransaction,
}

#[wasm_bindgen]
impl WasmTransaction {
    /// Decode from canonical MessagePack bytes
    #[wasm_bindgen(js_name = fromBytes)]
    pub fn from_bytes(bytes: &[u8]) -> Result<WasmTransaction, JsValue> {
        let inner = UnsignedTransaction::decode(bytes)?;
        Ok(WasmTransaction { inner })
    }

    /// Decode from base64, the form used in sign requests
    #[wasm_bindgen(js_name = fromBase64)]
    pub fn from_base64(encoded: &str) -> Result<WasmTransaction, JsValue> {
        let bytes = decode_base64(encoded)?;
        Self::from_bytes(&bytes)
    }

    /// Transaction id
    #[wasm_bindgen(getter)]
    pub fn id(&self) -> Result<String, JsValue> {
        self.inner.id().map_err(|e| e.into())
    }

    /// Transaction type (assetTransfer, assetFreeze, ...)
    #[wasm_bindgen(getter, js_name = "type")]
    pub fn tx_type(&self) -> String {
        self.inner.tx_type().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn sender(&self) -> String {
        self.inner.sender()
    }

    /// Fee in microAlgos as BigInt
    #[wasm_bindgen(getter)]
    pub fn fee(&self) -> js_sys::BigInt {
        js_sys::BigInt::from(self.inner.header.fee)
    }

    /// Note bytes, if any
    #[wasm_bindgen(getter)]
    pub fn note(&self) -> Option<Vec<u8>> {
        self.inner.header.note.clone()
    }

    /// Serialize to canonical bytes
    #[wasm_bindgen(js_name = toBytes)]
    pub fn to_bytes(&self) -> Result<Vec<u8>, JsValue> {
        self.inner.encode().map_err(|e| e.into())
    }

    /// Serialize to base64
    #[wasm_bindgen(js_name = toBase64)]
    pub fn to_base64(&self) -> Result<String, JsValue> {
        Ok(BASE64.encode(self.inner.encode()?))
    }

    /// Bytes an Ed25519 key signs ("TX" prefix plus canonical bytes)
    #[wasm_bindgen(js_name = signablePayload)]
    pub fn signable_payload(&self) -> Result<Vec<u8>, JsValue> {
        self.inner.bytes_to_sign().map_err(|e| e.into())
    }

    /// Size in bytes once signed
    #[wasm_bindgen(js_name = estimateSize)]
    pub fn estimate_size(&self) -> Result<u32, JsValue> {
        Ok(self.inner.estimate_size()? as u32)
    }

    /// Human-readable summary as a JS object
    #[wasm_bindgen]
    pub fn explain(&self) -> Result<JsValue, JsValue> {
        let tx = &self.inner;
        let header = js_obj! {
            "id" => tx.id()?,
            "type" => tx.tx_type(),
            "sender" => tx.sender(),
            "fee" => tx.header.fee,
            "firstValid" => tx.header.first_valid,
            "lastValid" => tx.header.last_valid,
            "genesisId" => tx.header.genesis_id.clone(),
        }?;

        let details = match &tx.kind {
            TransactionKind::AssetTransfer {
                asset_id,
                amount,
                receiver,
                close_to,
            } => js_obj! {
                "assetId" => *asset_id,
                "amount" => *amount,
                "receiver" => address(receiver)?,
                "closeTo" => close_to.as_ref().map(address).transpose()?,
            }?,
            TransactionKind::AssetFreeze {
                asset_id,
                freeze_target,
                freezing,
            } => js_obj! {
                "assetId" => *asset_id,
                "freezeTarget" => address(freeze_target)?,
                "freezing" => *freezing,
            }?,
            TransactionKind::AssetDestroy { asset_id } => js_obj! {
                "assetId" => *asset_id,
            }?,
            TransactionKind::AssetConfig { asset_id, params } => js_obj! {
                "assetId" => *asset_id,
                "manager" => params.manager.as_ref().map(address).transpose()?,
                "reserve" => params.reserve.as_ref().map(address).transpose()?,
                "freeze" => params.freeze.as_ref().map(address).transpose()?,
                "clawback" => params.clawback.as_ref().map(address).transpose()?,
            }?,
            TransactionKind::AssetCreate { params } => js_obj! {
                "total" => params.total,
                "decimals" => params.decimals,
                "defaultFrozen" => params.default_frozen,
                "unitName" => params.unit_name.clone(),
                "assetName" => params.asset_name.clone(),
                "url" => params.url.clone(),
            }?,
        };

        js_sys::Reflect::set(&header, &"details".into(), &details)?;
        Ok(header)
    }
}

impl WasmTransaction {
    pub fn from_inner(inner: UnsignedTransaction) -> Self {
        WasmTransaction { inner }
    }

    pub fn inner(&self) -> &UnsignedTransaction {
        &self.inner
    }
}

/// WASM-exposed signed transaction
#[wasm_bindgen]
pub struct WasmSignedTransaction {
    inner: SignedTransaction,
}

#[wasm_bindgen]
impl WasmSignedTransaction {
    #[wasm_bindgen(js_name = fromBytes)]
    pub fn from_bytes(bytes: &[u8]) -> Result<WasmSignedTransaction, JsValue> {
        let inner = SignedTransaction::decode(bytes)?;
        Ok(WasmSignedTransaction { inner })
    }

    /// Decode from base64, the form returned by signTxns
    #[wasm_bindgen(js_name = fromBase64)]
    pub fn from_base64(encoded: &str) -> Result<WasmSignedTransaction, JsValue> {
        let bytes = decode_base64(encoded)?;
        Self::from_bytes(&bytes)
    }

    #[wasm_bindgen(getter)]
    pub fn id(&self) -> String {
        self.inner.id()
    }

    /// Signature as uppercase hex
    #[wasm_bindgen(getter, js_name = signatureHex)]
    pub fn signature_hex(&self) -> String {
        self.inner.signature_hex()
    }

    #[wasm_bindgen(getter)]
    pub fn signature(&self) -> Vec<u8> {
        self.inner.signature().to_vec()
    }

    /// Whether the signature matches the sender
    #[wasm_bindgen]
    pub fn verify(&self) -> bool {
        self.inner.verify()
    }

    /// The transaction that was signed
    #[wasm_bindgen]
    pub fn transaction(&self) -> WasmTransaction {
        WasmTransaction::from_inner(self.inner.transaction().clone())
    }

    #[wasm_bindgen(js_name = toBytes)]
    pub fn to_bytes(&self) -> Result<Vec<u8>, JsValue> {
        self.inner.encode().map_err(|e| e.into())
    }

    #[wasm_bindgen(js_name = toBase64)]
    pub fn to_base64(&self) -> Result<String, JsValue> {
        Ok(BASE64.encode(self.inner.encode()?))
    }
}
