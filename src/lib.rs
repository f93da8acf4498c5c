//! Correlated RPC over one-way worker message channels.
//!
//! Workers that can only post messages to each other get promise-style
//! calls from this crate. The caller side ([`RpcClient`]) spreads calls
//! round-robin across a pool of worker ports, tags each with a correlation
//! id, applies a per-call timeout, and matches replies back by id. The callee
//! side ([`RpcServer`]) routes requests to registered handlers and can push
//! unsolicited events, which the client republishes to local listeners.
//!
//! ```no_run
//! use worker_rpc::{create_memory_channel, CallOptions, MethodTable, Payload, RpcClient, RpcConfig, RpcServer};
//!
//! # async fn example() -> worker_rpc::Result<()> {
//! let (caller, worker) = create_memory_channel("math");
//!
//! let methods = MethodTable::new().register_sync("double", |data: Payload| {
//!     Ok(Payload::from(data.as_i64().unwrap_or_default() * 2))
//! });
//! let _server = RpcServer::new(worker, methods).await?;
//!
//! let client = RpcClient::new(vec![caller], RpcConfig::default()).await?;
//! let answer = client.call("double", 21, CallOptions::default()).await?;
//! assert_eq!(answer.as_i64(), Some(42));
//! # Ok(())
//! # }
//! ```

// Logging macros first so every module below can use them.
mod macros;
pub(crate) use macros::{log_debug, log_error, log_info, log_trace, log_warn};

mod client;
mod domain;
mod events;
mod lock;
mod payload;
mod protocol;
mod rpc_config;
mod server;
mod transfer;
mod transport;

mod correlation;
mod error;

// Re-export main types
pub use client::{PendingReply, RpcClient, RpcClientBuilder};
pub use server::{Emitter, HandlerError, HandlerResult, MethodTable, RpcServer};

pub use rpc_config::{CallOptions, RpcConfig, DEFAULT_REQUEST_TIMEOUT};

pub use correlation::CorrelationId;
pub use error::{Result, RpcError};

pub use events::{EventHub, Listener, ListenerId};
pub use payload::{Payload, PayloadMap};
pub use protocol::{Inbound, Request, WireFrame};
pub use transfer::collect_transferables;

pub use transport::create_memory_channel;

// --- public re-exports
pub use domain::{
    //
    Envelope,
    Port,
    PortPtr,
    SubscriptionHandle,
};
