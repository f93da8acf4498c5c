//! Dispatcher configuration.
//!
//! Contains no transport-specific settings; ports are configured where they
//! are created.

use std::time::Duration;

/// Timeout applied to a call when neither [`CallOptions`] nor
/// [`RpcConfig::with_request_timeout`] say otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(2000);

/// Caller-side configuration.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    // ---
    /// Time a call waits for its Reply or Error frame before it fails with
    /// [`RpcError::Timeout`](crate::RpcError::Timeout).
    ///
    /// Default: 2 seconds
    pub request_timeout: Duration,
}

impl RpcConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default per-call timeout.
    ///
    /// # Example
    ///
    /// ```
    /// use worker_rpc::RpcConfig;
    /// use std::time::Duration;
    ///
    /// let config = RpcConfig::new().with_request_timeout(Duration::from_millis(250));
    /// assert_eq!(config.request_timeout, Duration::from_millis(250));
    /// ```
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Per-call options for [`RpcClient::call`](crate::RpcClient::call).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Overrides [`RpcConfig::request_timeout`] for this call.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_default_timeout_is_two_seconds() {
        // ---
        assert_eq!(RpcConfig::default().request_timeout, Duration::from_secs(2));
        assert_eq!(CallOptions::default().timeout, None);
    }
}
