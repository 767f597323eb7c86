//! WASM bindings for the signing authority (extension background context)

use crate::config::WalletConfig;
use crate::error::WasmAlgoError;
use crate::events::{send_extension_ready, send_registration_completed};
use crate::provider::{
    ApprovalPrompt, ApprovalRequest, BridgeMessage, CorrelationId, MemoryKeyring,
    SigningAuthority,
};
use crate::wasm::provider::JsTransport;
use crate::wasm::try_into_js_value::to_js_object;
use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use js_sys::{Function, Promise};
use std::rc::Rc;
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

#[cfg(target_arch = "wasm32")]
type BrowserStorage = crate::storage::LocalStorage;
#[cfg(not(target_arch = "wasm32"))]
type BrowserStorage = crate::storage::MemoryStorage;

type Authority = SigningAuthority<BrowserStorage, MemoryKeyring, JsPrompt>;

/// Shows an approval request through a JS callback resolving to a boolean
pub struct JsPrompt {
    callback: Function,
}

#[async_trait(?Send)]
impl ApprovalPrompt for JsPrompt {
    async fn request_approval(&self, request: &ApprovalRequest) -> bool {
        let value = match to_js_object(request) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Could not convert approval request");
                return false;
            }
        };
        let returned = match self.callback.call1(&JsValue::NULL, &value) {
            Ok(returned) => returned,
            Err(e) => {
                warn!(error = ?e, "Approval callback threw");
                return false;
            }
        };
        let answer = match returned.dyn_into::<Promise>() {
            Ok(promise) => JsFuture::from(promise).await,
            Err(value) => Ok(value),
        };
        matches!(answer.map(|v| v.as_bool()), Ok(Some(true)))
    }
}

/// The privileged signer: owns sessions, accounts and keys
#[wasm_bindgen]
pub struct WasmSigningAuthority {
    inner: Rc<Authority>,
    transport: Rc<JsTransport>,
}

#[wasm_bindgen]
impl WasmSigningAuthority {
    /// # Arguments
    /// * `config` - Wallet config object, or undefined for defaults
    /// * `post` - Function broadcasting event messages to other contexts
    /// * `prompt` - Function shown each approval request, resolving to a boolean
    #[wasm_bindgen(constructor)]
    pub fn new(
        config: JsValue,
        post: Function,
        prompt: Function,
    ) -> Result<WasmSigningAuthority, JsValue> {
        let config = if config.is_undefined() || config.is_null() {
            WalletConfig::default()
        } else {
            let config: WalletConfig = serde_wasm_bindgen::from_value(config)
                .map_err(|e| WasmAlgoError::Config(e.to_string()))?;
            config.validate()?;
            config
        };

        let authority = SigningAuthority::new(
            BrowserStorage::default(),
            MemoryKeyring::new(),
            JsPrompt { callback: prompt },
            config.policy,
        );
        Ok(WasmSigningAuthority {
            inner: Rc::new(authority),
            transport: Rc::new(JsTransport::new(post)),
        })
    }

    /// Handle a message from a provider
    ///
    /// Resolves to the `signResponse` message for a sign request, or
    /// undefined for anything else.
    #[wasm_bindgen(js_name = handleMessage)]
    pub fn handle_message(&self, message: JsValue) -> Promise {
        let authority = Rc::clone(&self.inner);
        future_to_promise(async move {
            let message: BridgeMessage = serde_wasm_bindgen::from_value(message)
                .map_err(|e| JsValue::from_str(&format!("Invalid message: {}", e)))?;
            match message {
                BridgeMessage::SignRequest {
                    id,
                    origin,
                    request,
                } => {
                    let outcome = authority.handle_sign_request(id.clone(), &origin, request).await;
                    let response = BridgeMessage::SignResponse { id, outcome };
                    to_js_object(&response).map_err(JsValue::from)
                }
                _ => Ok(JsValue::UNDEFINED),
            }
        })
    }

    /// Current state of a request (idle, awaitingUserApproval, signing, rejected)
    #[wasm_bindgen]
    pub fn state(&self, id: String) -> Result<JsValue, JsValue> {
        let state = self.inner.state(&CorrelationId::from(id));
        to_js_object(&state).map_err(JsValue::from)
    }

    /// Store an account and its 32-byte Ed25519 secret key
    ///
    /// Returns the account's address.
    #[wasm_bindgen(js_name = addAccount)]
    pub fn add_account(
        &self,
        id: &str,
        name: Option<String>,
        secret_key: &[u8],
    ) -> Result<String, JsValue> {
        let secret: [u8; 32] = secret_key.try_into().map_err(|_| {
            WasmAlgoError::Validation(format!(
                "Secret key must be 32 bytes, got {}",
                secret_key.len()
            ))
        })?;
        let account = self
            .inner
            .add_account(id, name, SigningKey::from_bytes(&secret))?;
        Ok(account.address()?)
    }

    /// Remove an account and revoke the sessions that authorize it
    #[wasm_bindgen(js_name = removeAccount)]
    pub fn remove_account(&self, id: String) -> Promise {
        let authority = Rc::clone(&self.inner);
        let transport = Rc::clone(&self.transport);
        future_to_promise(async move {
            let revoked = authority.remove_account(&id, transport.as_ref()).await?;
            to_js_object(&revoked).map_err(JsValue::from)
        })
    }

    /// Revoke one session; resolves to whether it existed
    #[wasm_bindgen(js_name = revokeSession)]
    pub fn revoke_session(&self, id: String) -> Promise {
        let authority = Rc::clone(&self.inner);
        let transport = Rc::clone(&self.transport);
        future_to_promise(async move {
            let existed = authority.revoke_session(&id, transport.as_ref()).await?;
            Ok(JsValue::from_bool(existed))
        })
    }

    #[wasm_bindgen]
    pub fn sessions(&self) -> Result<JsValue, JsValue> {
        let sessions = self.inner.sessions().get_all()?;
        to_js_object(&sessions).map_err(JsValue::from)
    }

    #[wasm_bindgen]
    pub fn accounts(&self) -> Result<JsValue, JsValue> {
        let accounts = self.inner.accounts().get_all()?;
        to_js_object(&accounts).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = isAccountKnown)]
    pub fn is_account_known(&self, address: &str) -> Result<bool, JsValue> {
        self.inner
            .accounts()
            .is_account_known(address)
            .map_err(|e| e.into())
    }

    /// Announce that the background context is ready
    #[wasm_bindgen(js_name = sendExtensionReady)]
    pub fn send_extension_ready(&self) -> Promise {
        let transport = Rc::clone(&self.transport);
        future_to_promise(async move {
            send_extension_ready(transport.as_ref()).await;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Announce that account registration finished
    #[wasm_bindgen(js_name = sendRegistrationCompleted)]
    pub fn send_registration_completed(&self) -> Promise {
        let transport = Rc::clone(&self.transport);
        future_to_promise(async move {
            send_registration_completed(transport.as_ref()).await;
            Ok(JsValue::UNDEFINED)
        })
    }
}
