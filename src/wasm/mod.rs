//! WASM bindings for wasm-algo
//!
//! This module contains thin wrappers with #[wasm_bindgen] that delegate
//! to the core Rust implementations.

pub mod address;
pub mod amount;
pub mod authority;
pub mod builder;
pub mod provider;
pub mod transaction;
pub mod try_into_js_value;

use wasm_bindgen::prelude::*;

// Re-export WASM types
pub use address::AddressNamespace;
pub use amount::AmountNamespace;
pub use authority::WasmSigningAuthority;
pub use builder::BuilderNamespace;
pub use provider::WasmProvider;
pub use transaction::{WasmSignedTransaction, WasmTransaction};

/// Route `tracing` output to the browser console
///
/// `level` is a filter directive such as "info" or "wasm_algo=debug".
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: Option<String>) -> Result<(), JsValue> {
    crate::logging::init_logging(level.as_deref().unwrap_or("info")).map_err(|e| e.into())
}
