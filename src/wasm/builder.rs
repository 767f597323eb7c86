//! WASM bindings for transaction building
//!
//! BuilderNamespace provides the entry point for building Algorand asset
//! transactions: buildTransaction(intent, context)

use crate::builder::{
    build_transaction,
    types::{BuildContext, TransactionIntent},
};
use crate::wasm::transaction::WasmTransaction;
use wasm_bindgen::prelude::*;

/// Namespace for building operations
#[wasm_bindgen]
pub struct BuilderNamespace;

#[wasm_bindgen]
impl BuilderNamespace {
    /// Build a transaction from an intent and context
    ///
    /// # Arguments
    /// * `intent` - What to do (JSON object with type field)
    /// * `context` - Sender, network, optional note and suggested params
    ///
    /// # Example Intent (Transfer)
    /// ```json
    /// { "type": "assetTransfer", "assetId": "31566704", "amount": "1.5", "decimals": 6, "to": "..." }
    /// ```
    ///
    /// # Example Context
    /// ```json
    /// {
    ///   "sender": "Y76M3MSY6DKBRHBL7C3NNDXGS5IIMQVQVUAB6MP4XEMMGVF2QWNPL226CA",
    ///   "network": { "name": "Algorand TestNet", "genesisId": "testnet-v1.0", "genesisHash": "SGO1...", "algods": [], "indexers": [] },
    ///   "note": "hello",
    ///   "suggestedParams": { "fee": 0, "minFee": 1000, "firstValid": 1000, "lastValid": 2000 }
    /// }
    /// ```
    ///
    /// # Intent Types
    /// - `assetConfig`: Change manager/reserve/freeze/clawback (assetId)
    /// - `assetCreate`: Create an asset (total, decimals, unitName, assetName, url)
    /// - `assetDestroy`: Destroy an asset (assetId)
    /// - `assetFreeze` / `assetUnfreeze`: (assetId, freezeTarget)
    /// - `assetTransfer`: Send or opt in (assetId, amount, decimals, to)
    #[wasm_bindgen(js_name = buildTransaction)]
    pub fn build_transaction_wasm(
        intent: JsValue,
        context: JsValue,
    ) -> Result<WasmTransaction, JsValue> {
        let intent: TransactionIntent = serde_wasm_bindgen::from_value(intent)
            .map_err(|e| JsValue::from_str(&format!("Invalid intent: {}", e)))?;

        let context: BuildContext = serde_wasm_bindgen::from_value(context)
            .map_err(|e| JsValue::from_str(&format!("Invalid context: {}", e)))?;

        let tx = build_transaction(intent, context)?;

        Ok(WasmTransaction::from_inner(tx))
    }
}
