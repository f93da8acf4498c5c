//! Wire protocol for correlated calls and push events.
//!
//! This module defines the four frame shapes exchanged between the caller
//! and callee dispatchers, and the typed views each side parses them into on
//! receipt.
mod message;

pub use message::{Inbound, Request, WireFrame};
