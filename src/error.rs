// src/error.rs

//! Error types surfaced by the caller and callee dispatchers.

use thiserror::Error;

/// Errors that can occur during RPC operations.
///
/// Only strings cross the wire. A failure reported by the callee arrives as
/// [`RpcError::Remote`] carrying the raw error text of the Error frame.
#[derive(Error, Debug)]
pub enum RpcError {
    // ---
    /// No frame arrived for the call within its timeout window.
    #[error("Timeout exceeded for RPC method \"{method}\"")]
    Timeout { method: String },

    /// The callee answered with an Error frame.
    #[error("{0}")]
    Remote(String),

    /// `call()` was issued with an empty method name.
    #[error("RPC method name must not be empty")]
    EmptyMethod,

    /// A client was constructed without any worker ports.
    #[error("worker pool must contain at least one worker")]
    EmptyWorkerPool,

    /// The underlying port refused or failed an operation.
    #[error("transport error: {0}")]
    Transport(String),

    /// A received frame matched none of the known frame shapes.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The dispatcher went away before the call settled.
    #[error("pending call dropped before settlement")]
    Cancelled,

    /// JSON conversion of a typed request or response failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for RPC operations
pub type Result<T> = std::result::Result<T, RpcError>;
