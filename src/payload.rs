// src/payload.rs

//! Dynamic payload values carried in the `data` field of frames.
//!
//! A [`Payload`] is a JSON-like tree with one extra leaf kind,
//! [`Payload::Buffer`], which holds a reference-counted byte buffer. Buffers
//! are the transferable parts of a payload: ports may hand them to the peer
//! by reference instead of copying (see [`collect_transferables`]).
//!
//! Typed code converts through serde with [`Payload::from_serialize`] and
//! [`Payload::deserialize_into`].
//!
//! [`collect_transferables`]: crate::collect_transferables

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{Number, Value};

use crate::Result;

/// Members of a [`Payload::Object`], ordered by key.
pub type PayloadMap = BTreeMap<String, Payload>;

/// A dynamically typed payload tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Payload>),
    Object(PayloadMap),
    /// Transferable byte buffer. Serializes as a byte sequence.
    Buffer(Bytes),
}

impl Payload {
    // ---

    /// Convert any serializable value into a payload.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::Serialization` if `value` cannot be represented as
    /// JSON (e.g. a map with non-string keys).
    pub fn from_serialize<T>(value: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        // ---
        Ok(serde_json::to_value(value)?.into())
    }

    /// Deserialize the payload into a typed value.
    ///
    /// Buffers are presented to the deserializer as arrays of bytes.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::Serialization` if the payload does not match `T`.
    pub fn deserialize_into<T>(self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        // ---
        Ok(serde_json::from_value(self.into_json())?)
    }

    /// Build an object payload from key/value pairs.
    pub fn object<I, K, V>(members: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Payload>,
    {
        Payload::Object(
            members
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Lossy conversion to a plain JSON value; buffers become byte arrays.
    pub fn into_json(self) -> Value {
        // ---
        match self {
            Payload::Null => Value::Null,
            Payload::Bool(b) => Value::Bool(b),
            Payload::Number(n) => Value::Number(n),
            Payload::String(s) => Value::String(s),
            Payload::Array(items) => Value::Array(items.into_iter().map(Payload::into_json).collect()),
            Payload::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, v.into_json())).collect())
            }
            Payload::Buffer(bytes) => {
                Value::Array(bytes.iter().map(|b| Value::Number((*b).into())).collect())
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Payload::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Payload::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Payload::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Payload::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Payload::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Payload::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&Bytes> {
        match self {
            Payload::Buffer(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Payload]> {
        match self {
            Payload::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&PayloadMap> {
        match self {
            Payload::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a member of an object payload.
    pub fn get(&self, key: &str) -> Option<&Payload> {
        self.as_object().and_then(|map| map.get(key))
    }
}

impl Serialize for Payload {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // ---
        match self {
            Payload::Null => serializer.serialize_unit(),
            Payload::Bool(b) => serializer.serialize_bool(*b),
            Payload::Number(n) => n.serialize(serializer),
            Payload::String(s) => serializer.serialize_str(s),
            Payload::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Payload::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            Payload::Buffer(bytes) => serializer.serialize_bytes(bytes),
        }
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Payload::from)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        // ---
        match value {
            Value::Null => Payload::Null,
            Value::Bool(b) => Payload::Bool(b),
            Value::Number(n) => Payload::Number(n),
            Value::String(s) => Payload::String(s),
            Value::Array(items) => Payload::Array(items.into_iter().map(Payload::from).collect()),
            Value::Object(map) => {
                Payload::Object(map.into_iter().map(|(k, v)| (k, Payload::from(v))).collect())
            }
        }
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Payload::Null
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Payload::Bool(value)
    }
}

macro_rules! payload_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Payload {
                fn from(value: $ty) -> Self {
                    Payload::Number(Number::from(value))
                }
            }
        )*
    };
}

payload_from_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<f64> for Payload {
    /// Non-finite floats have no JSON representation and become `Null`.
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Payload::Null, Payload::Number)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::String(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::String(value)
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Payload::Buffer(value)
    }
}

impl From<Vec<Payload>> for Payload {
    fn from(value: Vec<Payload>) -> Self {
        Payload::Array(value)
    }
}

impl From<PayloadMap> for Payload {
    fn from(value: PayloadMap) -> Self {
        Payload::Object(value)
    }
}

impl<T> From<Option<T>> for Payload
where
    T: Into<Payload>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Payload::Null, Into::into)
    }
}
