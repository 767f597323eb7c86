//! Algorand address encoding and decoding
//!
//! An address is the RFC 4648 base32 (no padding) encoding of the 32-byte
//! Ed25519 public key followed by the last 4 bytes of its SHA-512/256 hash.
//! See: https://developer.algorand.org/docs/get-details/accounts/#transformation-public-key-to-algorand-address

use crate::error::WasmAlgoError;
use data_encoding::BASE32_NOPAD;
use sha2::{Digest, Sha512_256};

/// Public key length in bytes
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Checksum length in bytes
const CHECKSUM_LENGTH: usize = 4;

/// Length of a textual address
pub const ADDRESS_LENGTH: usize = 58;

/// Encode a public key to an Algorand address
///
/// # Arguments
/// * `public_key` - 32-byte Ed25519 public key
pub fn encode_address(public_key: &[u8]) -> Result<String, WasmAlgoError> {
    if public_key.len() != PUBLIC_KEY_LENGTH {
        return Err(WasmAlgoError::InvalidAddress(format!(
            "Public key must be 32 bytes, got {}",
            public_key.len()
        )));
    }

    let mut payload = Vec::with_capacity(PUBLIC_KEY_LENGTH + CHECKSUM_LENGTH);
    payload.extend_from_slice(public_key);
    payload.extend_from_slice(&checksum(public_key));

    Ok(BASE32_NOPAD.encode(&payload))
}

/// Decode an Algorand address to its public key
pub fn decode_address(address: &str) -> Result<[u8; 32], WasmAlgoError> {
    if address.len() != ADDRESS_LENGTH {
        return Err(WasmAlgoError::InvalidAddress(format!(
            "Address must be {} characters, got {}",
            ADDRESS_LENGTH,
            address.len()
        )));
    }

    let decoded = BASE32_NOPAD
        .decode(address.as_bytes())
        .map_err(|e| WasmAlgoError::InvalidAddress(format!("Invalid base32: {}", e)))?;

    if decoded.len() != PUBLIC_KEY_LENGTH + CHECKSUM_LENGTH {
        return Err(WasmAlgoError::InvalidAddress(format!(
            "Invalid decoded length: {}",
            decoded.len()
        )));
    }

    let (public_key, expected) = decoded.split_at(PUBLIC_KEY_LENGTH);
    if checksum(public_key) != expected {
        return Err(WasmAlgoError::InvalidAddress("Invalid checksum".to_string()));
    }

    let mut key = [0u8; PUBLIC_KEY_LENGTH];
    key.copy_from_slice(public_key);
    Ok(key)
}

/// Validate an Algorand address
pub fn validate_address(address: &str) -> bool {
    decode_address(address).is_ok()
}

/// Convert a hex-encoded public key, as stored with accounts, into an address
pub fn convert_public_key_to_algorand_address(public_key_hex: &str) -> Result<String, WasmAlgoError> {
    let bytes = hex::decode(public_key_hex)
        .map_err(|e| WasmAlgoError::InvalidAddress(format!("Invalid public key hex: {}", e)))?;
    encode_address(&bytes)
}

/// Last 4 bytes of SHA-512/256(public key)
fn checksum(public_key: &[u8]) -> [u8; CHECKSUM_LENGTH] {
    let hash = Sha512_256::digest(public_key);
    let mut out = [0u8; CHECKSUM_LENGTH];
    out.copy_from_slice(&hash[hash.len() - CHECKSUM_LENGTH..]);
    out
}
