// src/transport/memory/transport.rs

//! In-memory duplex channel.
//!
//! Concrete implementation of the domain-level `Port` trait using in-process
//! data structures only. This is the reference implementation of port
//! semantics.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::lock::lock_ignore_poison;
use crate::{
    // ---
    log_debug,
    Envelope,
    Port,
    PortPtr,
    Result,
    RpcError,
    SubscriptionHandle,
};

/// One direction of a channel.
///
/// The receiver is parked here until the receiving port subscribes, so
/// envelopes posted earlier are queued rather than lost.
struct Lane {
    tx: Mutex<Option<mpsc::UnboundedSender<Envelope>>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Envelope>>>,
}

impl Lane {
    fn new() -> Self {
        // ---
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        }
    }

    fn shut(&self) {
        lock_ignore_poison(&self.tx).take();
        lock_ignore_poison(&self.rx).take();
    }
}

/// State shared by both ends of one channel.
struct Channel {
    /// Envelopes posted by the caller end, read by the worker end.
    to_worker: Lane,
    /// Envelopes posted by the worker end, read by the caller end.
    to_caller: Lane,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Caller,
    Worker,
}

/// In-memory port.
///
/// ## Semantics
///
/// - `post()` enqueues immediately and never blocks.
/// - Envelopes are delivered in post order.
/// - Envelopes posted before the peer subscribes are queued.
/// - Each port may be subscribed once.
/// - `close()` on either end shuts both directions; inboxes drain what was
///   already queued and then end, further posts fail.
///
/// ## Non-Goals
///
/// - Serialization (buffers move by reference, frames are not encoded)
/// - Failure injection or latency simulation
struct MemoryPort {
    // ---
    id: String,
    side: Side,
    channel: Arc<Channel>,
}

impl MemoryPort {
    fn outgoing(&self) -> &Lane {
        match self.side {
            Side::Caller => &self.channel.to_worker,
            Side::Worker => &self.channel.to_caller,
        }
    }

    fn incoming(&self) -> &Lane {
        match self.side {
            Side::Caller => &self.channel.to_caller,
            Side::Worker => &self.channel.to_worker,
        }
    }
}

#[async_trait::async_trait]
impl Port for MemoryPort {
    // ---
    fn port_id(&self) -> &str {
        &self.id
    }

    fn post(&self, env: Envelope) -> Result<()> {
        // ---
        let tx = lock_ignore_poison(&self.outgoing().tx);

        match tx.as_ref() {
            Some(tx) => tx
                .send(env)
                .map_err(|_| RpcError::Transport(format!("peer of port {} is gone", self.id))),
            None => Err(RpcError::Transport(format!("port {} is closed", self.id))),
        }
    }

    async fn subscribe(&self) -> Result<SubscriptionHandle> {
        // ---
        let rx = lock_ignore_poison(&self.incoming().rx).take();

        match rx {
            Some(inbox) => {
                log_debug!("port {} subscribed", self.id);
                Ok(SubscriptionHandle { inbox })
            }
            None => Err(RpcError::Transport(format!(
                "port {} is closed or already subscribed",
                self.id
            ))),
        }
    }

    async fn close(&self) -> Result<()> {
        // ---
        self.channel.to_worker.shut();
        self.channel.to_caller.shut();
        log_debug!("port {} closed", self.id);
        Ok(())
    }
}

/// Create an in-memory channel to one worker.
///
/// Returns `(caller_end, worker_end)`. Hand the caller end to an
/// [`RpcClient`](crate::RpcClient) as one of its workers and the worker end
/// to an [`RpcServer`](crate::RpcServer).
pub fn create_memory_channel(name: impl Into<String>) -> (PortPtr, PortPtr) {
    // ---
    let name = name.into();
    let channel = Arc::new(Channel {
        to_worker: Lane::new(),
        to_caller: Lane::new(),
    });

    let caller = MemoryPort {
        id: format!("{name}/caller"),
        side: Side::Caller,
        channel: channel.clone(),
    };
    let worker = MemoryPort {
        id: format!("{name}/worker"),
        side: Side::Worker,
        channel,
    };

    (Arc::new(caller), Arc::new(worker))
}
