//! Fire-and-forget events between extension contexts

use crate::provider::messages::BridgeMessage;
use crate::provider::transport::Transport;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Version stamped on every event
pub const PROTOCOL_VERSION: u32 = 1;

/// What happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EventKind {
    /// Account registration finished in the popup
    ExtensionRegistrationCompleted,
    /// The background context is ready to serve requests
    ExtensionReady,
    #[serde(rename_all = "camelCase")]
    SessionRevoked { session_id: String, origin: String },
}

/// A typed, versioned event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeEvent {
    pub version: u32,
    pub event: EventKind,
}

impl BridgeEvent {
    pub fn new(event: EventKind) -> Self {
        BridgeEvent {
            version: PROTOCOL_VERSION,
            event,
        }
    }
}

/// Post an event. Delivery failures are logged, never returned.
pub async fn send_event<T: Transport + ?Sized>(transport: &T, event: BridgeEvent) {
    let kind = format!("{:?}", event.event);
    match transport.send(BridgeMessage::Event(event)).await {
        Ok(()) => debug!(event = %kind, "Sent event"),
        Err(e) => warn!(event = %kind, error = %e, "Failed to send event"),
    }
}

pub async fn send_registration_completed<T: Transport + ?Sized>(transport: &T) {
    send_event(transport, BridgeEvent::new(EventKind::ExtensionRegistrationCompleted)).await
}

pub async fn send_extension_ready<T: Transport + ?Sized>(transport: &T) {
    send_event(transport, BridgeEvent::new(EventKind::ExtensionReady)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::transport::ChannelTransport;
    use futures::executor::block_on;
    use futures::StreamExt;

    #[test]
    fn test_registration_completed() {
        let (transport, mut rx) = ChannelTransport::new();
        block_on(send_registration_completed(&transport));

        let message = block_on(rx.next()).unwrap();
        assert_eq!(
            message,
            BridgeMessage::Event(BridgeEvent {
                version: PROTOCOL_VERSION,
                event: EventKind::ExtensionRegistrationCompleted,
            })
        );
    }

    #[test]
    fn test_send_failure_is_swallowed() {
        let (transport, rx) = ChannelTransport::new();
        drop(rx);
        block_on(send_extension_ready(&transport));
    }

    #[test]
    fn test_event_json() {
        let event = BridgeEvent::new(EventKind::SessionRevoked {
            session_id: "s1".to_string(),
            origin: "https://dapp.example".to_string(),
        });
        let json = serde_json::to_value(BridgeMessage::Event(event)).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["version"], 1);
        assert_eq!(json["event"]["kind"], "sessionRevoked");
        assert_eq!(json["event"]["sessionId"], "s1");
    }
}
