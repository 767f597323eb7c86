//! Error types for wasm-algo

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::prelude::*;

/// Main error type for wasm-algo operations
#[derive(Debug, Clone, Error)]
pub enum WasmAlgoError {
    /// Invalid Algorand address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    /// Builder input failed validation
    #[error("Validation error: {0}")]
    Validation(String),
    /// Transaction bytes could not be encoded or decoded
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    /// Transaction type the wallet does not handle
    #[error("Unknown transaction type: {0}")]
    UnknownTransactionType(String),
    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),
    /// A message could not be delivered to another context
    #[error("Transport error: {0}")]
    Transport(String),
    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Config(String),
    /// Sign protocol rejection
    #[error("{0}")]
    Provider(ProviderError),
    /// Generic string error
    #[error("{0}")]
    StringError(String),
}

impl From<&str> for WasmAlgoError {
    fn from(s: &str) -> Self {
        WasmAlgoError::StringError(s.to_string())
    }
}

impl From<String> for WasmAlgoError {
    fn from(s: String) -> Self {
        WasmAlgoError::StringError(s)
    }
}

impl From<serde_json::Error> for WasmAlgoError {
    fn from(err: serde_json::Error) -> Self {
        WasmAlgoError::Storage(format!("JSON error: {}", err))
    }
}

impl From<ProviderError> for WasmAlgoError {
    fn from(err: ProviderError) -> Self {
        WasmAlgoError::Provider(err)
    }
}

// REQUIRED: Converts to JS Error with stack trace
impl From<WasmAlgoError> for JsValue {
    fn from(err: WasmAlgoError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}

/// Kinds of sign protocol failures, each with a stable numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderErrorKind {
    Unknown,
    UserRejected,
    MethodTimedOut,
    UnknownTransactionType,
    KeyNotFound,
    BadRequest,
    Validation,
}

impl ProviderErrorKind {
    pub fn code(self) -> u32 {
        match self {
            ProviderErrorKind::Unknown => 4000,
            ProviderErrorKind::UserRejected => 4001,
            ProviderErrorKind::MethodTimedOut => 4002,
            ProviderErrorKind::UnknownTransactionType => 4003,
            ProviderErrorKind::KeyNotFound => 4100,
            ProviderErrorKind::BadRequest => 4300,
            ProviderErrorKind::Validation => 4301,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProviderErrorKind::Unknown => "UnknownError",
            ProviderErrorKind::UserRejected => "UserRejectedError",
            ProviderErrorKind::MethodTimedOut => "MethodTimedOutError",
            ProviderErrorKind::UnknownTransactionType => "UnknownTransactionTypeError",
            ProviderErrorKind::KeyNotFound => "KeyNotFoundError",
            ProviderErrorKind::BadRequest => "BadRequestError",
            ProviderErrorKind::Validation => "ValidationError",
        }
    }
}

/// Error returned across the provider boundary as `{code, name, message}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {name}: {message}")]
pub struct ProviderError {
    pub code: u32,
    pub name: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        ProviderError {
            code: kind.code(),
            name: kind.name().to_string(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::BadRequest, message)
    }

    pub fn user_rejected(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::UserRejected, message)
    }

    pub fn key_not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::KeyNotFound, message)
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::MethodTimedOut, message)
    }

    /// Returns the kind matching this error's code, if the code is known
    pub fn kind(&self) -> Option<ProviderErrorKind> {
        [
            ProviderErrorKind::Unknown,
            ProviderErrorKind::UserRejected,
            ProviderErrorKind::MethodTimedOut,
            ProviderErrorKind::UnknownTransactionType,
            ProviderErrorKind::KeyNotFound,
            ProviderErrorKind::BadRequest,
            ProviderErrorKind::Validation,
        ]
        .into_iter()
        .find(|kind| kind.code() == self.code)
    }
}

impl From<WasmAlgoError> for ProviderError {
    fn from(err: WasmAlgoError) -> Self {
        match err {
            WasmAlgoError::Provider(inner) => inner,
            WasmAlgoError::Validation(msg) | WasmAlgoError::InvalidAmount(msg) => {
                ProviderError::new(ProviderErrorKind::Validation, msg)
            }
            WasmAlgoError::InvalidAddress(_) | WasmAlgoError::InvalidTransaction(_) => {
                ProviderError::bad_request(err.to_string())
            }
            WasmAlgoError::UnknownTransactionType(msg) => {
                ProviderError::new(ProviderErrorKind::UnknownTransactionType, msg)
            }
            other => ProviderError::new(ProviderErrorKind::Unknown, other.to_string()),
        }
    }
}
