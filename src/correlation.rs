use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlation identifier linking a Request frame to its Reply or Error frame.
///
/// Carried in-band as the `uid` field of every correlated frame and opaque to
/// the transport. Serialized as a plain string so peers written in other
/// languages see the same wire shape.
///
/// UUID v4 keeps collisions negligible among the calls in flight on one
/// dispatcher; no global uniqueness is claimed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh correlation id.
    pub fn generate() -> Self {
        // ---
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_unique_across_burst() {
        // ---
        let ids: HashSet<CorrelationId> = (0..2_000).map(|_| CorrelationId::generate()).collect();
        assert_eq!(ids.len(), 2_000);
    }

    #[test]
    fn test_format() {
        // ---
        let id = CorrelationId::generate();
        assert_eq!(id.as_str().len(), 36);
    }

    #[test]
    fn test_serializes_as_bare_string() {
        // ---
        let id = CorrelationId::from("abc-123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc-123\"");
    }
}
