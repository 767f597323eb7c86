//! wasm-algo: WASM module for an Algorand browser-extension wallet
//!
//! This crate provides:
//! - Address encoding and decoding
//! - Asset transaction building from intents
//! - Canonical transaction encoding and Ed25519 signing
//! - The `signTxns` sign protocol between page and background contexts
//! - Session and account persistence
//! - Amount conversion between standard and atomic units
//!
//! # Architecture
//!
//! The crate follows a two-layer architecture:
//! - **Core layer** (`src/*.rs`): Pure Rust logic, no WASM dependencies
//! - **WASM layer** (`src/wasm/*.rs`): Thin wrappers with `#[wasm_bindgen]`

pub mod address;
pub mod amount;
pub mod builder;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod logging;
pub mod network;
pub mod provider;
pub mod session;
pub mod storage;
pub mod transaction;
pub mod types;
pub mod wasm;

// Re-export main types for convenience
pub use address::{
    convert_public_key_to_algorand_address, decode_address, encode_address, validate_address,
};
pub use amount::{convert_to_atomic_unit, convert_to_standard_unit, StandardAmount};
pub use builder::build_transaction;
pub use config::{SigningPolicy, WalletConfig};
pub use error::{ProviderError, ProviderErrorKind, WasmAlgoError};
pub use format::format_currency_unit;
pub use network::{Network, Node};
pub use session::{Account, AccountService, Session, SessionService};
pub use transaction::{SignedTransaction, UnsignedTransaction};
pub use types::{AssetParams, SuggestedParams, TransactionType};
