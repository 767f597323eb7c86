//! Message transport between execution contexts

use crate::error::WasmAlgoError;
use crate::provider::messages::BridgeMessage;
use async_trait::async_trait;
use futures::channel::mpsc;

/// Delivers a message to another context
///
/// Delivery is one-way; replies arrive as separate messages.
#[async_trait(?Send)]
pub trait Transport {
    async fn send(&self, message: BridgeMessage) -> Result<(), WasmAlgoError>;
}

#[async_trait(?Send)]
impl<T: Transport + ?Sized> Transport for &T {
    async fn send(&self, message: BridgeMessage) -> Result<(), WasmAlgoError> {
        (**self).send(message).await
    }
}

/// In-process transport over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: mpsc::UnboundedSender<BridgeMessage>,
}

impl ChannelTransport {
    /// Create a transport and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BridgeMessage>) {
        let (sender, receiver) = mpsc::unbounded();
        (ChannelTransport { sender }, receiver)
    }
}

#[async_trait(?Send)]
impl Transport for ChannelTransport {
    async fn send(&self, message: BridgeMessage) -> Result<(), WasmAlgoError> {
        self.sender
            .unbounded_send(message)
            .map_err(|e| WasmAlgoError::Transport(format!("Channel closed: {}", e)))
    }
}
