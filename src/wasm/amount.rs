//! WASM bindings for amount conversion and display
//!
//! Amounts cross as decimal strings so no precision is lost in JS numbers.

use crate::amount::{convert_to_atomic_unit, convert_to_standard_unit, StandardAmount};
use crate::error::WasmAlgoError;
use crate::format::format_currency_unit;
use num_bigint::BigUint;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct AmountNamespace;

#[wasm_bindgen]
impl AmountNamespace {
    /// "1.5" with 6 decimals -> "1500000"
    #[wasm_bindgen(js_name = convertToAtomicUnit)]
    pub fn convert_to_atomic_unit(amount: &str, decimals: u32) -> Result<String, JsValue> {
        let amount: StandardAmount = amount.parse()?;
        Ok(convert_to_atomic_unit(&amount, decimals)?.to_string())
    }

    /// "1500000" with 6 decimals -> "1.5"
    #[wasm_bindgen(js_name = convertToStandardUnit)]
    pub fn convert_to_standard_unit(atomic: &str, decimals: u32) -> Result<String, JsValue> {
        let atomic: BigUint = atomic
            .parse()
            .map_err(|e| WasmAlgoError::InvalidAmount(format!("{}: {}", atomic, e)))?;
        Ok(convert_to_standard_unit(&atomic, decimals)?.to_string())
    }

    /// Display form, e.g. "1,234.57" or "12.3457m"
    #[wasm_bindgen(js_name = formatCurrencyUnit)]
    pub fn format_currency_unit(amount: &str) -> Result<String, JsValue> {
        let amount: StandardAmount = amount.parse()?;
        Ok(format_currency_unit(&amount))
    }
}
