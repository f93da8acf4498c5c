// src/transport/memory/mod.rs

//! In-memory channel implementation.
//!
//! A pure in-process implementation of the domain-level `Port` trait. It
//! stands in for a worker boundary in tests and single-process setups, and
//! defines the reference semantics for ports:
//!
//! - Per-port FIFO delivery.
//! - Nothing is dropped because of timing: envelopes posted before the peer
//!   subscribes wait in the queue.
//! - Buffers travel by reference; nothing is serialized.

mod transport;

pub use transport::create_memory_channel;
