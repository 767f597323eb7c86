//! The `signTxns` sign protocol
//!
//! [`ProviderBridge`] runs in the requesting context (page or popup) and
//! [`SigningAuthority`] in the privileged background context. They exchange
//! [`BridgeMessage`]s over a [`Transport`] and match responses to requests by
//! correlation id only.

pub mod authority;
pub mod bridge;
pub mod messages;
pub mod pending;
pub mod transport;

pub use authority::{
    ApprovalPrompt, ApprovalRequest, Keyring, MemoryKeyring, SignState, SigningAuthority,
    TransactionSummary,
};
pub use bridge::ProviderBridge;
pub use messages::{
    BridgeMessage, CorrelationId, SignOutcome, SignRequest, SignResult, WalletTransaction,
};
pub use pending::{PendingRequestStore, PendingStats};
pub use transport::{ChannelTransport, Transport};
