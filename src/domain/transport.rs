// src/domain/transport.rs

//! Port abstraction.
//!
//! A port is one end of a one-way-per-direction message channel between the
//! caller and a single worker. It offers exactly two primitives to the
//! dispatchers: post a message (fire-and-forget, with an optional list of
//! transferable buffers) and receive the messages the peer posts.
//!
//! Ports know nothing about correlation, timeouts or frame kinds. Those live
//! in the client and server layers.
//!
//! Concrete implementations live under `src/transport/`.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::{collect_transferables, Result, WireFrame};

/// One message on a port: a frame plus the buffers to move by reference.
///
/// `transfer` is a hint for the port. The buffers are also still reachable
/// through `frame.data`; a port that cannot move buffers by reference may
/// ignore the list.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    // ---
    pub frame: WireFrame,
    pub transfer: Vec<Bytes>,
}

impl Envelope {
    // ---
    /// Wrap a frame without any transfer list.
    pub fn new(frame: WireFrame) -> Self {
        Self {
            frame,
            transfer: Vec::new(),
        }
    }

    /// Wrap a frame with an explicit transfer list.
    pub fn with_transfer(frame: WireFrame, transfer: Vec<Bytes>) -> Self {
        Self { frame, transfer }
    }

    /// Wrap a frame, hoisting every buffer found in its `data` into the
    /// transfer list.
    pub fn transferring(frame: WireFrame) -> Self {
        // ---
        let transfer = frame.data().map(collect_transferables).unwrap_or_default();
        Self { frame, transfer }
    }
}

/// Receiving side of a port subscription.
///
/// The inbox yields envelopes in the order the peer posted them and returns
/// `None` once the port is closed and drained.
pub struct SubscriptionHandle {
    // ---
    pub inbox: mpsc::UnboundedReceiver<Envelope>,
}

/// Transport endpoint used by both dispatchers.
///
/// Implementations must ensure that:
/// - `post()` never blocks and preserves order per port.
/// - Delivery is at most once. Nothing is retried.
/// - Messages posted before the peer subscribes are either queued or
///   dropped, and the choice is documented.
///
/// The in-memory channel is the reference implementation.
///
/// # Notes
///
/// This trait uses `async_trait` for `subscribe` and `close`; `post` is
/// synchronous so a call can be dispatched without awaiting.
#[async_trait::async_trait]
pub trait Port: Send + Sync {
    // ---
    /// Identifier of this port, used in logs.
    fn port_id(&self) -> &str;

    /// Post an envelope to the peer.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::Transport` if the port is closed.
    fn post(&self, env: Envelope) -> Result<()>;

    /// Start receiving what the peer posts to this port.
    async fn subscribe(&self) -> Result<SubscriptionHandle>;

    /// Close the port. Both directions stop delivering.
    async fn close(&self) -> Result<()>;
}

/// Shared port pointer.
///
/// `.clone()` only bumps a reference count; all clones talk to the same
/// underlying channel.
pub type PortPtr = Arc<dyn Port>;

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::{CorrelationId, Payload};

    #[test]
    fn test_transferring_hoists_buffers() {
        // ---
        let blob = Bytes::from_static(b"abc");
        let frame = WireFrame::request(
            "upload",
            CorrelationId::generate(),
            Payload::object([("blob", Payload::Buffer(blob.clone()))]),
        );

        let env = Envelope::transferring(frame);
        assert_eq!(env.transfer, vec![blob]);
    }

    #[test]
    fn test_transferring_without_data() {
        // ---
        let env = Envelope::transferring(WireFrame::error(CorrelationId::generate(), "nope"));
        assert!(env.transfer.is_empty());
    }
}
