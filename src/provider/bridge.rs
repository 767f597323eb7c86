//! Requesting side of the sign protocol

use crate::error::{ProviderError, ProviderErrorKind};
use crate::provider::messages::{BridgeMessage, CorrelationId, SignRequest, SignResult};
use crate::provider::pending::PendingRequestStore;
use crate::provider::transport::Transport;
use crate::types::MAX_GROUP_SIZE;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sends sign requests to the signing authority and awaits their outcomes
///
/// Responses are routed back through [`ProviderBridge::handle_message`] and
/// matched only by correlation id.
pub struct ProviderBridge<T: Transport> {
    transport: T,
    origin: String,
    pending: PendingRequestStore,
}

impl<T: Transport> ProviderBridge<T> {
    pub fn new(transport: T, origin: impl Into<String>, timeout: Duration) -> Self {
        ProviderBridge {
            transport,
            origin: origin.into(),
            pending: PendingRequestStore::new(timeout),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn pending(&self) -> &PendingRequestStore {
        &self.pending
    }

    /// Request signatures under a generated correlation id
    pub async fn sign_txns(&self, request: SignRequest) -> Result<SignResult, ProviderError> {
        self.sign_txns_with_id(None, request).await
    }

    /// Request signatures, optionally under a caller-supplied correlation id
    pub async fn sign_txns_with_id(
        &self,
        id: Option<CorrelationId>,
        request: SignRequest,
    ) -> Result<SignResult, ProviderError> {
        if request.txns.is_empty() {
            return Err(ProviderError::bad_request("No transactions to sign"));
        }
        if request.txns.len() > MAX_GROUP_SIZE {
            return Err(ProviderError::bad_request(format!(
                "At most {} transactions per request, got {}",
                MAX_GROUP_SIZE,
                request.txns.len()
            )));
        }

        let txn_count = request.txns.len();
        let (id, receiver) = self.pending.register(id, &self.origin, None)?;

        let message = BridgeMessage::SignRequest {
            id: id.clone(),
            origin: self.origin.clone(),
            request,
        };
        if let Err(e) = self.transport.send(message).await {
            self.pending.cancel(&id);
            warn!(correlation_id = %id, error = %e, "Failed to post sign request");
            return Err(ProviderError::new(ProviderErrorKind::Unknown, e.to_string()));
        }

        info!(correlation_id = %id, txns = txn_count, "Sign request sent");

        let result = receiver
            .await
            .map_err(|_| {
                ProviderError::new(ProviderErrorKind::Unknown, "Request abandoned before a response")
            })?
            .into_result()?;

        if result.stxns.len() != txn_count {
            return Err(ProviderError::new(
                ProviderErrorKind::Unknown,
                format!(
                    "Expected {} signed entries, got {}",
                    txn_count,
                    result.stxns.len()
                ),
            ));
        }

        Ok(result)
    }

    /// Route an incoming message. Returns true if it completed a request.
    pub fn handle_message(&self, message: BridgeMessage) -> bool {
        match message {
            BridgeMessage::SignResponse { id, outcome } => self.pending.complete(&id, outcome),
            BridgeMessage::Event(event) => {
                debug!(event = ?event.event, "Bridge event received");
                false
            }
            other => {
                warn!(kind = other.kind(), "Ignoring message not addressed to the provider");
                false
            }
        }
    }

    /// Reject requests that outlived the timeout
    pub fn sweep_expired(&self) -> usize {
        let removed = self.pending.remove_expired();
        if removed > 0 {
            debug!(removed = removed, "Swept expired sign requests");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::messages::{SignOutcome, WalletTransaction};
    use crate::provider::transport::ChannelTransport;
    use futures::executor::block_on;
    use futures::StreamExt;

    fn request(n: usize) -> SignRequest {
        SignRequest {
            txns: (0..n).map(|_| WalletTransaction::new("AA==")).collect(),
        }
    }

    #[test]
    fn test_empty_request_is_bad_request() {
        let (transport, _rx) = ChannelTransport::new();
        let bridge = ProviderBridge::new(transport, "https://dapp.example", Duration::from_secs(5));
        let err = block_on(bridge.sign_txns(request(0))).unwrap_err();
        assert_eq!(err.kind(), Some(ProviderErrorKind::BadRequest));
        assert_eq!(bridge.pending().pending_count(), 0);
    }

    #[test]
    fn test_response_routed_by_id() {
        let (transport, mut rx) = ChannelTransport::new();
        let bridge = ProviderBridge::new(transport, "https://dapp.example", Duration::from_secs(5));

        let responder = async {
            let Some(BridgeMessage::SignRequest { id, origin, request }) = rx.next().await else {
                panic!("Expected sign request");
            };
            assert_eq!(origin, "https://dapp.example");
            let outcome = SignOutcome::Signed(SignResult {
                id: id.clone(),
                stxns: vec![None; request.txns.len()],
            });
            assert!(bridge.handle_message(BridgeMessage::SignResponse { id, outcome }));
        };

        let (result, ()) = block_on(futures::future::join(
            bridge.sign_txns_with_id(Some("req-1".into()), request(2)),
            responder,
        ));
        let result = result.unwrap();
        assert_eq!(result.id, CorrelationId::from("req-1"));
        assert_eq!(result.stxns.len(), 2);
    }

    #[test]
    fn test_closed_transport() {
        let (transport, rx) = ChannelTransport::new();
        drop(rx);
        let bridge = ProviderBridge::new(transport, "https://dapp.example", Duration::from_secs(5));
        let err = block_on(bridge.sign_txns(request(1))).unwrap_err();
        assert_eq!(err.kind(), Some(ProviderErrorKind::Unknown));
        assert_eq!(bridge.pending().pending_count(), 0);
    }

    #[test]
    fn test_unknown_response_dropped() {
        let (transport, _rx) = ChannelTransport::new();
        let bridge = ProviderBridge::new(transport, "https://dapp.example", Duration::from_secs(5));
        let outcome = SignOutcome::Rejected(ProviderError::user_rejected("no"));
        assert!(!bridge.handle_message(BridgeMessage::SignResponse {
            id: "nobody".into(),
            outcome,
        }));
    }
}
