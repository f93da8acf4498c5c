//! Client builder.
//!
//! Fluent construction of an [`RpcClient`] from a set of worker ports and
//! timeout settings.

use std::time::Duration;

use super::RpcClient;
use crate::{PortPtr, Result, RpcConfig};

/// Builder for [`RpcClient`].
///
/// Workers are used in the order they are added.
///
/// # Example
///
/// ```no_run
/// use worker_rpc::{create_memory_channel, RpcClient};
/// use std::time::Duration;
///
/// # async fn example() -> worker_rpc::Result<()> {
/// let (caller_a, _worker_a) = create_memory_channel("a");
/// let (caller_b, _worker_b) = create_memory_channel("b");
///
/// let client = RpcClient::builder()
///     .worker(caller_a)
///     .worker(caller_b)
///     .request_timeout(Duration::from_millis(500))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct RpcClientBuilder {
    // ---
    workers: Vec<PortPtr>,
    config: Option<RpcConfig>,

    // Overrides config.request_timeout when set
    request_timeout: Option<Duration>,
}

impl RpcClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one worker port to the pool.
    pub fn worker(mut self, port: PortPtr) -> Self {
        self.workers.push(port);
        self
    }

    /// Append several worker ports to the pool.
    pub fn workers(mut self, ports: impl IntoIterator<Item = PortPtr>) -> Self {
        self.workers.extend(ports);
        self
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: RpcConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Default timeout for calls that don't set one.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build the client (consumes self).
    ///
    /// # Errors
    ///
    /// Returns `RpcError::EmptyWorkerPool` if no worker was added, or the
    /// first subscription error reported by a port.
    pub async fn build(self) -> Result<RpcClient> {
        // ---
        let mut config = self.config.unwrap_or_default();
        if let Some(timeout) = self.request_timeout {
            config.request_timeout = timeout;
        }

        RpcClient::new(self.workers, config).await
    }
}
