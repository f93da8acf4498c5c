// src/client/mod.rs
//! Caller-side dispatcher.
//!
//! [`RpcClient`] turns one-way worker ports into correlated calls. It holds
//! a fixed pool of ports, sends each call to the next port in round-robin
//! order, and runs one receive loop per port. All loops feed the same frame
//! handler, which settles pending calls by uid and republishes Event frames
//! through the client's [`EventHub`].
//!
//! # Concurrency
//!
//! Many calls may be in flight at once. The pending table sits behind a
//! mutex that is only held for a `HashMap` insert or remove; the round-robin
//! cursor is an atomic.

mod builder;
mod pending;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub use builder::RpcClientBuilder;
use pending::{PendingCalls, Settlement};

use crate::lock::lock_ignore_poison;
use crate::{
    // ---
    collect_transferables,
    log_debug,
    log_error,
    log_info,
    log_trace,
    log_warn,
    CallOptions,
    CorrelationId,
    Envelope,
    EventHub,
    Inbound,
    ListenerId,
    Payload,
    PortPtr,
    Result,
    RpcConfig,
    RpcError,
    SubscriptionHandle,
    WireFrame,
};

/// Caller dispatcher over a pool of worker ports.
///
/// Cheap to clone (internally `Arc`-backed).
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<Inner>,
}

struct Inner {
    // ---
    workers: Vec<PortPtr>,
    /// Index of the worker that receives the next call; always `< workers.len()`.
    cursor: AtomicUsize,
    pending: Arc<PendingCalls>,
    events: EventHub,
    config: RpcConfig,
    rx_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RpcClient {
    // ---
    /// Create a client over `workers`.
    ///
    /// Subscribes to every port and starts one receive loop per port.
    ///
    /// # Errors
    ///
    /// - `RpcError::EmptyWorkerPool` if `workers` is empty.
    /// - `RpcError::Transport` if a port refuses the subscription.
    pub async fn new(workers: Vec<PortPtr>, config: RpcConfig) -> Result<Self> {
        // ---
        if workers.is_empty() {
            return Err(RpcError::EmptyWorkerPool);
        }

        let mut inboxes = Vec::with_capacity(workers.len());
        for worker in &workers {
            inboxes.push(worker.subscribe().await?);
        }

        let inner = Arc::new(Inner {
            workers,
            cursor: AtomicUsize::new(0),
            pending: PendingCalls::new(),
            events: EventHub::new(),
            config,
            rx_tasks: Mutex::new(Vec::new()),
        });

        let tasks: Vec<JoinHandle<()>> = inboxes
            .into_iter()
            .zip(inner.workers.iter())
            .map(|(handle, worker)| {
                tokio::spawn(receive_loop(
                    Arc::downgrade(&inner),
                    handle,
                    worker.port_id().to_string(),
                ))
            })
            .collect();

        *lock_ignore_poison(&inner.rx_tasks) = tasks;

        log_debug!("rpc client started with {} worker(s)", inner.workers.len());

        Ok(Self { inner })
    }

    pub fn builder() -> RpcClientBuilder {
        RpcClientBuilder::new()
    }

    /// Issue a call and return the reply future.
    ///
    /// The Request frame is posted before this returns; awaiting the
    /// returned [`PendingReply`] only waits for the outcome. The call times
    /// out after `options.timeout`, or the configured `request_timeout`.
    ///
    /// The reply resolves with the Reply frame's `data`, or fails with:
    /// - `RpcError::Remote` carrying the Error frame's message
    /// - `RpcError::Timeout` if nothing arrived in time
    /// - `RpcError::EmptyMethod` if `method` is empty (nothing is sent)
    /// - `RpcError::Transport` if the port refused the post
    ///
    /// Must be called within a Tokio runtime.
    pub fn call(&self, method: &str, data: impl Into<Payload>, options: CallOptions) -> PendingReply {
        // ---
        let uid = CorrelationId::generate();

        if method.is_empty() {
            return PendingReply::settled(uid, Err(RpcError::EmptyMethod));
        }

        let data = data.into();
        let transfer = collect_transferables(&data);
        let worker = &self.inner.workers[self.inner.next_worker()];
        let timeout = options.timeout.unwrap_or(self.inner.config.request_timeout);

        let rx = self.inner.pending.register(uid.clone(), method, timeout);

        log_trace!(
            "call {uid} {method:?} -> {} ({} transferable(s))",
            worker.port_id(),
            transfer.len()
        );

        let env = Envelope::with_transfer(WireFrame::request(method, uid.clone(), data), transfer);

        if let Err(err) = worker.post(env) {
            log_error!("failed to post {method:?} to {}: {err}", worker.port_id());
            self.inner.pending.settle(&uid, Err(err));
        }

        PendingReply { uid, rx }
    }

    /// Send a typed request and deserialize the reply.
    ///
    /// # Errors
    ///
    /// Everything [`call`](Self::call) can fail with, plus
    /// `RpcError::Serialization` if either side of the conversion fails.
    pub async fn request<TReq, TResp>(&self, method: &str, req: TReq) -> Result<TResp>
    where
        TReq: Serialize,
        TResp: DeserializeOwned,
    {
        self.request_with_options(method, req, CallOptions::default()).await
    }

    /// Like [`request`](Self::request) with an explicit timeout.
    pub async fn request_with_timeout<TReq, TResp>(
        &self,
        method: &str,
        req: TReq,
        timeout: Duration,
    ) -> Result<TResp>
    where
        TReq: Serialize,
        TResp: DeserializeOwned,
    {
        self.request_with_options(method, req, CallOptions::with_timeout(timeout))
            .await
    }

    async fn request_with_options<TReq, TResp>(
        &self,
        method: &str,
        req: TReq,
        options: CallOptions,
    ) -> Result<TResp>
    where
        TReq: Serialize,
        TResp: DeserializeOwned,
    {
        // ---
        let data = Payload::from_serialize(&req)?;
        let reply = self.call(method, data, options).await?;
        reply.deserialize_into()
    }

    /// Subscribe to push events named `event_name`.
    pub fn on<F>(&self, event_name: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        self.inner.events.on(event_name, listener)
    }

    /// Remove a listener added with [`on`](Self::on).
    pub fn off(&self, event_name: &str, id: ListenerId) -> bool {
        self.inner.events.off(event_name, id)
    }

    /// Number of calls still waiting for a frame or their timeout.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn worker_count(&self) -> usize {
        self.inner.workers.len()
    }

    pub fn config(&self) -> &RpcConfig {
        &self.inner.config
    }

    /// Stop receiving, fail every pending call with `RpcError::Cancelled`,
    /// and close all worker ports.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by a port's `close()`.
    pub async fn shutdown(&self) -> Result<()> {
        // ---
        self.inner.stop();

        for worker in &self.inner.workers {
            worker.close().await?;
        }

        log_info!("rpc client shut down ({} worker(s) closed)", self.inner.workers.len());
        Ok(())
    }
}

impl Inner {
    // ---

    /// Return the current cursor and advance it modulo the pool size.
    fn next_worker(&self) -> usize {
        // ---
        let len = self.workers.len();
        self.cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                Some((cursor + 1) % len)
            })
            .unwrap_or_else(|cursor| cursor)
    }

    fn handle_envelope(&self, env: Envelope) {
        // ---
        match Inbound::try_from(env.frame) {
            Ok(Inbound::Error { uid, error }) => self.settle(&uid, Err(RpcError::Remote(error))),
            Ok(Inbound::Reply { uid, data, .. }) => self.settle(&uid, Ok(data)),
            Ok(Inbound::Event { event_name, data }) => {
                self.events.emit(&event_name, &data);
            }
            Err(err) => log_warn!("dropping inbound frame: {err}"),
        }
    }

    fn settle(&self, uid: &CorrelationId, outcome: Settlement) {
        if !self.pending.settle(uid, outcome) {
            log_debug!("no pending call for {uid}, frame dropped");
        }
    }

    fn stop(&self) {
        // ---
        let tasks: Vec<JoinHandle<()>> = lock_ignore_poison(&self.rx_tasks).drain(..).collect();
        for task in tasks {
            task.abort();
        }

        for call in self.pending.drain() {
            call.settle(Err(RpcError::Cancelled));
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn receive_loop(inner: Weak<Inner>, mut handle: SubscriptionHandle, port_id: String) {
    // ---
    while let Some(env) = handle.inbox.recv().await {
        match inner.upgrade() {
            Some(inner) => inner.handle_envelope(env),
            None => break,
        }
    }

    log_debug!("receive loop for {port_id} stopped");
}

/// Future returned by [`RpcClient::call`].
///
/// Resolves with the reply data or the call's failure. Dropping it does not
/// cancel the call; the entry stays pending until a frame or the timer
/// settles it.
#[must_use = "a call's outcome is only observable by awaiting its PendingReply"]
pub struct PendingReply {
    uid: CorrelationId,
    rx: oneshot::Receiver<Settlement>,
}

impl PendingReply {
    fn settled(uid: CorrelationId, outcome: Settlement) -> Self {
        // ---
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(outcome);
        Self { uid, rx }
    }

    /// Correlation id carried by this call's Request frame.
    pub fn uid(&self) -> &CorrelationId {
        &self.uid
    }
}

impl Future for PendingReply {
    type Output = Result<Payload>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(outcome) => outcome,
            Err(_) => Err(RpcError::Cancelled),
        })
    }
}
