//! Domain layer public interface.
//!
//! Transport-level abstractions shared by the client and server layers,
//! independent of any concrete channel implementation.
//!
//! All consumers import through this module, never from individual files.

mod transport;

pub use transport::{
    //
    Envelope,
    Port,
    PortPtr,
    SubscriptionHandle,
};
