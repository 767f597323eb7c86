//! WASM bindings for Algorand addresses

use crate::address::{
    convert_public_key_to_algorand_address, decode_address, encode_address, validate_address,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct AddressNamespace;

#[wasm_bindgen]
impl AddressNamespace {
    /// Encode a 32-byte public key as an address
    #[wasm_bindgen]
    pub fn encode(public_key: &[u8]) -> Result<String, JsValue> {
        encode_address(public_key).map_err(|e| e.into())
    }

    /// Decode an address to its 32-byte public key
    #[wasm_bindgen]
    pub fn decode(address: &str) -> Result<Vec<u8>, JsValue> {
        Ok(decode_address(address)?.to_vec())
    }

    #[wasm_bindgen]
    pub fn validate(address: &str) -> bool {
        validate_address(address)
    }

    /// Address for a hex public key, as stored with accounts
    #[wasm_bindgen(js_name = convertPublicKeyToAlgorandAddress)]
    pub fn convert_public_key(public_key_hex: &str) -> Result<String, JsValue> {
        convert_public_key_to_algorand_address(public_key_hex).map_err(|e| e.into())
    }
}
