// src/server/mod.rs
//! Callee-side dispatcher.
//!
//! [`RpcServer`] runs inside a worker. It listens on one injected port,
//! routes each Request frame to the handler registered under its method
//! name, and posts back a Reply or Error frame. Several servers can share a
//! process, each on its own port.
//!
//! Every request runs in its own task. Whatever the handler does (returns a
//! value, returns an error, panics before or after its first await) ends up
//! as exactly one Reply or Error frame; nothing propagates into the receive
//! loop.

mod emitter;
mod handler;

use std::future::Future;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::{JoinError, JoinHandle};

pub use emitter::Emitter;
pub use handler::{HandlerError, HandlerResult, MethodTable};

use crate::lock::lock_ignore_poison;
use crate::{
    // ---
    log_debug,
    log_error,
    log_info,
    log_warn,
    Envelope,
    Payload,
    PortPtr,
    Request,
    Result,
    SubscriptionHandle,
    WireFrame,
};

/// Callee dispatcher bound to a single port.
///
/// The receive loop keeps running after every `RpcServer` clone is dropped,
/// until the port closes or [`shutdown`](Self::shutdown) is called.
#[derive(Clone)]
pub struct RpcServer {
    inner: Arc<Inner>,
}

struct Inner {
    // ---
    port: PortPtr,
    methods: Mutex<MethodTable>,
    rx_task: Mutex<Option<JoinHandle<()>>>,
}

impl RpcServer {
    // ---
    /// Start serving `methods` on `port`.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::Transport` if the port refuses the subscription.
    pub async fn new(port: PortPtr, methods: MethodTable) -> Result<Self> {
        // ---
        let handle = port.subscribe().await?;

        log_debug!(
            "rpc server on {} serving {} method(s)",
            port.port_id(),
            methods.len()
        );

        let inner = Arc::new(Inner {
            port,
            methods: Mutex::new(methods),
            rx_task: Mutex::new(None),
        });

        let task = tokio::spawn(receive_loop(inner.clone(), handle));
        *lock_ignore_poison(&inner.rx_task) = Some(task);

        Ok(Self { inner })
    }

    /// Add or replace an async handler on the running server.
    pub fn register<F, Fut>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        lock_ignore_poison(&self.inner.methods).insert(method.into(), handler::wrap_async(handler));
    }

    /// Add or replace a synchronous handler on the running server.
    pub fn register_sync<F>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(Payload) -> HandlerResult + Send + Sync + 'static,
    {
        lock_ignore_poison(&self.inner.methods).insert(method.into(), handler::wrap_sync(handler));
    }

    /// Add or replace a serde-typed handler on the running server.
    pub fn register_typed<TReq, TResp, F, Fut>(&self, method: impl Into<String>, handler: F)
    where
        TReq: DeserializeOwned + Send + 'static,
        TResp: Serialize + Send + 'static,
        F: Fn(TReq) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<TResp, HandlerError>> + Send + 'static,
    {
        lock_ignore_poison(&self.inner.methods).insert(method.into(), handler::wrap_typed(handler));
    }

    pub fn has_method(&self, method: &str) -> bool {
        lock_ignore_poison(&self.inner.methods).contains(method)
    }

    /// Push an Event frame `{eventName, data}` to the caller.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::Transport` if the port is closed.
    pub fn emit(&self, event_name: &str, data: impl Into<Payload>) -> Result<()> {
        self.emitter().emit(event_name, data)
    }

    /// Cloneable handle for emitting events from handlers or other tasks.
    pub fn emitter(&self) -> Emitter {
        Emitter::new(self.inner.port.clone())
    }

    pub fn port_id(&self) -> &str {
        self.inner.port.port_id()
    }

    /// Stop the receive loop and close the port.
    ///
    /// Handlers already running finish, but their replies are dropped by
    /// the closed port.
    pub async fn shutdown(&self) -> Result<()> {
        // ---
        let task = lock_ignore_poison(&self.inner.rx_task).take();
        if let Some(task) = task {
            task.abort();
        }

        self.inner.port.close().await?;
        log_info!("rpc server on {} shut down", self.inner.port.port_id());
        Ok(())
    }
}

impl Inner {
    // ---
    fn dispatch(&self, req: Request) {
        // ---
        let Request { method, uid, data } = req;

        let handler = lock_ignore_poison(&self.methods).get(&method);

        let Some(handler) = handler else {
            log_warn!("unknown RPC method {method:?} (uid {uid})");
            let frame = WireFrame::error(uid, format!("Unknown RPC method \"{method}\""));
            post_or_log(&self.port, Envelope::new(frame));
            return;
        };

        let port = self.port.clone();

        tokio::spawn(async move {
            // ---
            // Calling the handler inside its own task turns a panic, even one
            // raised before the first await, into a JoinError.
            let outcome = tokio::spawn(async move { handler(data).await }).await;

            let env = match outcome {
                Ok(Ok(result)) => Envelope::transferring(WireFrame::reply(uid, method, result)),
                Ok(Err(err)) => Envelope::new(WireFrame::error(uid, err.to_string())),
                Err(join_err) => {
                    let msg = panic_message(join_err);
                    log_error!("RPC method {method:?} panicked: {msg}");
                    Envelope::new(WireFrame::error(
                        uid,
                        format!("RPC method \"{method}\" panicked: {msg}"),
                    ))
                }
            };

            post_or_log(&port, env);
        });
    }
}

fn post_or_log(port: &PortPtr, env: Envelope) {
    if let Err(err) = port.post(env) {
        log_error!("failed to post response on {}: {err}", port.port_id());
    }
}

fn panic_message(err: JoinError) -> String {
    // ---
    match err.try_into_panic() {
        Ok(panic) => panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string()),
        Err(err) => err.to_string(),
    }
}

async fn receive_loop(inner: Arc<Inner>, mut handle: SubscriptionHandle) {
    // ---
    while let Some(env) = handle.inbox.recv().await {
        match Request::try_from(env.frame) {
            Ok(req) => inner.dispatch(req),
            Err(err) => log_warn!("dropping frame on {}: {err}", inner.port.port_id()),
        }
    }

    log_debug!("rpc server on {} stopped", inner.port.port_id());
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::{create_memory_channel, CorrelationId, Inbound};

    async fn next_inbound(handle: &mut SubscriptionHandle) -> Inbound {
        // ---
        let env = handle.inbox.recv().await.unwrap();
        Inbound::try_from(env.frame).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_method_error_frame() {
        // ---
        let (caller, worker) = create_memory_channel("unknown");
        let _server = RpcServer::new(worker, MethodTable::new()).await.unwrap();
        let mut replies = caller.subscribe().await.unwrap();

        let uid = CorrelationId::generate();
        caller
            .post(Envelope::new(WireFrame::request("missing", uid.clone(), Payload::Null)))
            .unwrap();

        assert_eq!(
            next_inbound(&mut replies).await,
            Inbound::Error {
                uid,
                error: "Unknown RPC method \"missing\"".into()
            }
        );
    }

    #[tokio::test]
    async fn test_panicking_handler_becomes_error_frame() {
        // ---
        let (caller, worker) = create_memory_channel("panic");
        let methods = MethodTable::new().register_sync("explode", |_| panic!("kaboom"));
        let _server = RpcServer::new(worker, methods).await.unwrap();
        let mut replies = caller.subscribe().await.unwrap();

        let uid = CorrelationId::generate();
        caller
            .post(Envelope::new(WireFrame::request("explode", uid.clone(), Payload::Null)))
            .unwrap();

        match next_inbound(&mut replies).await {
            Inbound::Error { uid: got, error } => {
                assert_eq!(got, uid);
                assert_eq!(error, "RPC method \"explode\" panicked: kaboom");
            }
            other => panic!("expected error frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reply_carries_method_and_uid() {
        // ---
        let (caller, worker) = create_memory_channel("reply");
        let methods = MethodTable::new().register("echo", |data: Payload| async move { Ok(data) });
        let _server = RpcServer::new(worker, methods).await.unwrap();
        let mut replies = caller.subscribe().await.unwrap();

        let uid = CorrelationId::generate();
        caller
            .post(Envelope::new(WireFrame::request("echo", uid.clone(), "hi".into())))
            .unwrap();

        assert_eq!(
            next_inbound(&mut replies).await,
            Inbound::Reply {
                uid,
                method: "echo".into(),
                data: "hi".into()
            }
        );
    }

    #[tokio::test]
    async fn test_dynamic_registration() {
        // ---
        let (_caller, worker) = create_memory_channel("dynamic");
        let server = RpcServer::new(worker, MethodTable::new()).await.unwrap();

        assert!(!server.has_method("late"));
        server.register_sync("late", |_| Ok(Payload::Null));
        assert!(server.has_method("late"));
    }

    #[tokio::test]
    async fn test_emit_posts_event_frame() {
        // ---
        let (caller, worker) = create_memory_channel("emit");
        let server = RpcServer::new(worker, MethodTable::new()).await.unwrap();
        let mut inbox = caller.subscribe().await.unwrap();

        server.emit("progress", 50).unwrap();

        assert_eq!(
            next_inbound(&mut inbox).await,
            Inbound::Event {
                event_name: "progress".into(),
                data: Payload::from(50)
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_frame_does_not_stop_loop() {
        // ---
        let (caller, worker) = create_memory_channel("malformed");
        let methods = MethodTable::new().register_sync("ping", |_| Ok("pong".into()));
        let _server = RpcServer::new(worker, methods).await.unwrap();
        let mut replies = caller.subscribe().await.unwrap();

        caller.post(Envelope::new(WireFrame::default())).unwrap();

        let uid = CorrelationId::generate();
        caller
            .post(Envelope::new(WireFrame::request("ping", uid, Payload::Null)))
            .unwrap();

        assert!(matches!(
            next_inbound(&mut replies).await,
            Inbound::Reply { .. }
        ));
    }
}
