//! Messages exchanged over the provider bridge

use crate::error::ProviderError;
use crate::events::BridgeEvent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque token pairing a sign request with its response
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a new random correlation id
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One transaction in a sign request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    /// Base64 of the canonical unsigned transaction
    pub txn: String,
    /// Addresses expected to sign; an empty list means "do not sign"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signers: Option<Vec<String>>,
    /// Message shown to the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WalletTransaction {
    pub fn new(txn: impl Into<String>) -> Self {
        WalletTransaction {
            txn: txn.into(),
            signers: None,
            message: None,
        }
    }

    /// Whether the caller asked for this entry to be skipped
    pub fn is_skipped(&self) -> bool {
        matches!(&self.signers, Some(signers) if signers.is_empty())
    }
}

/// Request to sign one or more transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRequest {
    pub txns: Vec<WalletTransaction>,
}

/// Signed transactions, positionally aligned with the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignResult {
    pub id: CorrelationId,
    /// Base64 of each signed transaction, `None` for skipped entries
    pub stxns: Vec<Option<String>>,
}

/// Terminal outcome of a sign request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignOutcome {
    Signed(SignResult),
    Rejected(ProviderError),
}

impl SignOutcome {
    pub fn into_result(self) -> Result<SignResult, ProviderError> {
        match self {
            SignOutcome::Signed(result) => Ok(result),
            SignOutcome::Rejected(err) => Err(err),
        }
    }
}

impl From<Result<SignResult, ProviderError>> for SignOutcome {
    fn from(result: Result<SignResult, ProviderError>) -> Self {
        match result {
            Ok(result) => SignOutcome::Signed(result),
            Err(err) => SignOutcome::Rejected(err),
        }
    }
}

/// Envelope for everything that crosses between contexts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BridgeMessage {
    Event(BridgeEvent),
    SignRequest {
        id: CorrelationId,
        origin: String,
        request: SignRequest,
    },
    SignResponse {
        id: CorrelationId,
        outcome: SignOutcome,
    },
}

impl BridgeMessage {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeMessage::Event(_) => "event",
            BridgeMessage::SignRequest { .. } => "signRequest",
            BridgeMessage::SignResponse { .. } => "signResponse",
        }
    }
}
