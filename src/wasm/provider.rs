//! WASM bindings for the requesting side of the sign protocol

use crate::error::{ProviderError, WasmAlgoError};
use crate::provider::{BridgeMessage, CorrelationId, ProviderBridge, SignRequest, Transport};
use crate::wasm::try_into_js_value::to_js_object;
use async_trait::async_trait;
use js_sys::{Function, Promise};
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

/// Default time a sign request may wait, matching the wallet config default
const DEFAULT_TIMEOUT_MS: u32 = 300_000;

/// Posts messages through a JS callback, e.g. `chrome.runtime.sendMessage`
///
/// A callback that returns a Promise is awaited.
pub struct JsTransport {
    post: Function,
}

impl JsTransport {
    pub fn new(post: Function) -> Self {
        JsTransport { post }
    }
}

#[async_trait(?Send)]
impl Transport for JsTransport {
    async fn send(&self, message: BridgeMessage) -> Result<(), WasmAlgoError> {
        let value = to_js_object(&message).map_err(|e| WasmAlgoError::Transport(e.to_string()))?;
        let returned = self
            .post
            .call1(&JsValue::NULL, &value)
            .map_err(|e| WasmAlgoError::Transport(format!("{:?}", e)))?;
        if let Ok(promise) = returned.dyn_into::<Promise>() {
            JsFuture::from(promise)
                .await
                .map_err(|e| WasmAlgoError::Transport(format!("{:?}", e)))?;
        }
        Ok(())
    }
}

/// Reject value for a failed sign request: a plain `{code, name, message}` object
pub(crate) fn provider_error_to_js(err: &ProviderError) -> JsValue {
    to_js_object(err).unwrap_or_else(|_| js_sys::Error::new(&err.to_string()).into())
}

/// dApp-facing provider exposing `signTxns`
#[wasm_bindgen]
pub struct WasmProvider {
    inner: Rc<ProviderBridge<JsTransport>>,
}

#[wasm_bindgen]
impl WasmProvider {
    /// # Arguments
    /// * `post` - Function delivering a message object to the signing authority
    /// * `origin` - Origin of the requesting page
    /// * `timeout_ms` - How long a request may wait (default 5 minutes)
    #[wasm_bindgen(constructor)]
    pub fn new(post: Function, origin: String, timeout_ms: Option<u32>) -> WasmProvider {
        let timeout = Duration::from_millis(timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS) as u64);
        WasmProvider {
            inner: Rc::new(ProviderBridge::new(JsTransport::new(post), origin, timeout)),
        }
    }

    /// Request signatures for `{ txns: [{ txn, signers?, message? }] }`
    ///
    /// Resolves to `{ id, stxns }`; rejects with `{ code, name, message }`.
    #[wasm_bindgen(js_name = signTxns)]
    pub fn sign_txns(&self, request: JsValue, id: Option<String>) -> Promise {
        let bridge = Rc::clone(&self.inner);
        future_to_promise(async move {
            let request: SignRequest = serde_wasm_bindgen::from_value(request).map_err(|e| {
                provider_error_to_js(&ProviderError::bad_request(format!("Invalid request: {}", e)))
            })?;
            let result = bridge
                .sign_txns_with_id(id.map(CorrelationId::from), request)
                .await
                .map_err(|e| provider_error_to_js(&e))?;
            to_js_object(&result).map_err(JsValue::from)
        })
    }

    /// Feed a message received from the signing authority
    ///
    /// Returns true if it completed a pending request.
    #[wasm_bindgen(js_name = handleMessage)]
    pub fn handle_message(&self, message: JsValue) -> Result<bool, JsValue> {
        let message: BridgeMessage = serde_wasm_bindgen::from_value(message)
            .map_err(|e| JsValue::from_str(&format!("Invalid message: {}", e)))?;
        Ok(self.inner.handle_message(message))
    }

    /// Reject requests that outlived the timeout; call periodically
    #[wasm_bindgen(js_name = sweepExpired)]
    pub fn sweep_expired(&self) -> u32 {
        self.inner.sweep_expired() as u32
    }

    #[wasm_bindgen(getter, js_name = pendingCount)]
    pub fn pending_count(&self) -> u32 {
        self.inner.pending().pending_count() as u32
    }

    #[wasm_bindgen(getter)]
    pub fn origin(&self) -> String {
        self.inner.origin().to_string()
    }
}
