//! Port implementations.
//!
//! Concrete implementations of the domain-level `Port` trait, exposed only
//! through constructor functions. Dispatcher code must not depend on
//! implementation types.

mod memory;

pub use memory::create_memory_channel;
