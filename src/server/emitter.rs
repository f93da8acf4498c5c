use crate::{Envelope, Payload, PortPtr, Result, WireFrame};

/// Sends unsolicited Event frames to the caller.
///
/// Cheap to clone; hand one to handlers or background tasks that need to
/// push progress or notifications.
#[derive(Clone)]
pub struct Emitter {
    port: PortPtr,
}

impl Emitter {
    pub fn new(port: PortPtr) -> Self {
        Self { port }
    }

    /// Post `{eventName, data}` to the caller.
    ///
    /// Buffers inside `data` are listed as transferables.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::Transport` if the port is closed.
    pub fn emit(&self, event_name: &str, data: impl Into<Payload>) -> Result<()> {
        // ---
        let frame = WireFrame::event(event_name, data.into());
        self.port.post(Envelope::transferring(frame))
    }
}
