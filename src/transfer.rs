//! Transferable discovery.
//!
//! Walks a [`Payload`] and collects every embedded [`Bytes`] buffer so the
//! port can move them by reference alongside the frame. The scan is
//! recomputed for every send and never cached.

use bytes::Bytes;

use crate::Payload;

/// Collect the transferable buffers embedded in `payload`.
///
/// Depth-first, in array order and object key order. A buffer is reported
/// once and not descended into. Scalars contribute nothing.
///
/// `Payload` is an owned tree, so the walk always terminates.
pub fn collect_transferables(payload: &Payload) -> Vec<Bytes> {
    // ---
    let mut found = Vec::new();
    scan_into(payload, &mut found);
    found
}

fn scan_into(node: &Payload, found: &mut Vec<Bytes>) {
    match node {
        // Cloning `Bytes` bumps a refcount; the buffer itself is not copied.
        Payload::Buffer(bytes) => found.push(bytes.clone()),
        Payload::Array(items) => items.iter().for_each(|item| scan_into(item, found)),
        Payload::Object(members) => members.values().for_each(|value| scan_into(value, found)),
        Payload::Null | Payload::Bool(_) | Payload::Number(_) | Payload::String(_) => {}
    }
}
