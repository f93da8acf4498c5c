use serde::{Deserialize, Serialize};

use crate::{CorrelationId, Payload, RpcError};

/// A frame exactly as it travels on the wire.
///
/// There is no type tag: the kind of a frame follows from which fields are
/// present. Four shapes are defined:
///
/// | kind    | direction       | fields                 |
/// |---------|-----------------|------------------------|
/// | Request | caller → callee | `method`, `uid`, `data` |
/// | Reply   | callee → caller | `uid`, `method`, `data` |
/// | Error   | callee → caller | `uid`, `error`          |
/// | Event   | callee → caller | `eventName`, `data`     |
///
/// Receivers parse a `WireFrame` into [`Request`] or [`Inbound`] right away
/// and work with those instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<CorrelationId>,

    #[serde(
        rename = "eventName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub event_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WireFrame {
    // ---
    pub fn request(method: impl Into<String>, uid: CorrelationId, data: Payload) -> Self {
        Self {
            method: Some(method.into()),
            uid: Some(uid),
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn reply(uid: CorrelationId, method: impl Into<String>, data: Payload) -> Self {
        Self {
            method: Some(method.into()),
            uid: Some(uid),
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn error(uid: CorrelationId, error: impl Into<String>) -> Self {
        Self {
            uid: Some(uid),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn event(event_name: impl Into<String>, data: Payload) -> Self {
        Self {
            event_name: Some(event_name.into()),
            data: Some(data),
            ..Self::default()
        }
    }

    /// Borrow the `data` field, if any.
    pub fn data(&self) -> Option<&Payload> {
        self.data.as_ref()
    }
}

/// A Request frame as seen by the callee.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub uid: CorrelationId,
    pub data: Payload,
}

impl TryFrom<WireFrame> for Request {
    type Error = RpcError;

    fn try_from(frame: WireFrame) -> Result<Self, Self::Error> {
        // ---
        let uid = frame
            .uid
            .ok_or_else(|| RpcError::MalformedFrame("request without uid".into()))?;
        let method = frame
            .method
            .ok_or_else(|| RpcError::MalformedFrame(format!("request {uid} without method")))?;

        Ok(Request {
            method,
            uid,
            data: frame.data.unwrap_or_default(),
        })
    }
}

impl From<Request> for WireFrame {
    fn from(req: Request) -> Self {
        WireFrame::request(req.method, req.uid, req.data)
    }
}

/// A frame received by the caller, classified by field presence.
///
/// Precedence: `error` present means [`Inbound::Error`]; otherwise `method`
/// present means [`Inbound::Reply`]; otherwise `eventName` present means
/// [`Inbound::Event`].
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Reply {
        uid: CorrelationId,
        method: String,
        data: Payload,
    },
    Error {
        uid: CorrelationId,
        error: String,
    },
    Event {
        event_name: String,
        data: Payload,
    },
}

impl TryFrom<WireFrame> for Inbound {
    type Error = RpcError;

    fn try_from(frame: WireFrame) -> Result<Self, RpcError> {
        // ---
        let WireFrame {
            method,
            uid,
            event_name,
            data,
            error,
        } = frame;

        if let Some(error) = error {
            let uid = uid.ok_or_else(|| RpcError::MalformedFrame("error frame without uid".into()))?;
            return Ok(Inbound::Error { uid, error });
        }

        if let Some(method) = method {
            let uid = uid.ok_or_else(|| {
                RpcError::MalformedFrame(format!("reply for {method:?} without uid"))
            })?;
            return Ok(Inbound::Reply {
                uid,
                method,
                data: data.unwrap_or_default(),
            });
        }

        if let Some(event_name) = event_name {
            return Ok(Inbound::Event {
                event_name,
                data: data.unwrap_or_default(),
            });
        }

        Err(RpcError::MalformedFrame(
            "frame has none of error, method, eventName".into(),
        ))
    }
}

impl From<Inbound> for WireFrame {
    fn from(inbound: Inbound) -> Self {
        match inbound {
            Inbound::Reply { uid, method, data } => WireFrame::reply(uid, method, data),
            Inbound::Error { uid, error } => WireFrame::error(uid, error),
            Inbound::Event { event_name, data } => WireFrame::event(event_name, data),
        }
    }
}
