use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Payload;

/// Failure returned by a method handler.
///
/// Only the message crosses the wire, as the `error` field of the Error
/// frame. Any `std::error::Error` converts into it, so handlers can use `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error,
{
    fn from(err: E) -> Self {
        Self::new(err.to_string())
    }
}

/// What a handler produces: reply data or a failure message.
pub type HandlerResult = std::result::Result<Payload, HandlerError>;

pub(super) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Type-erased handler.
///
/// Wrapped in Arc so the dispatcher can clone it into the task that runs it.
pub(super) type BoxedHandler = Arc<dyn Fn(Payload) -> BoxFuture<HandlerResult> + Send + Sync>;

pub(super) fn wrap_async<F, Fut>(handler: F) -> BoxedHandler
where
    F: Fn(Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |data: Payload| Box::pin(handler(data)) as BoxFuture<HandlerResult>)
}

pub(super) fn wrap_sync<F>(handler: F) -> BoxedHandler
where
    F: Fn(Payload) -> HandlerResult + Send + Sync + 'static,
{
    // ---
    Arc::new(move |data: Payload| {
        let outcome = handler(data);
        Box::pin(async move { outcome }) as BoxFuture<HandlerResult>
    })
}

/// Wrap a handler working on serde types.
///
/// The request payload is deserialized into `TReq` before the handler runs;
/// a mismatch fails the call without invoking it.
pub(super) fn wrap_typed<TReq, TResp, F, Fut>(handler: F) -> BoxedHandler
where
    TReq: DeserializeOwned + Send + 'static,
    TResp: Serialize + Send + 'static,
    F: Fn(TReq) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<TResp, HandlerError>> + Send + 'static,
{
    // ---
    Arc::new(move |data: Payload| {
        let req: TReq = match data.deserialize_into() {
            Ok(req) => req,
            Err(err) => {
                let err = HandlerError::from(err);
                return Box::pin(async move { Err(err) }) as BoxFuture<HandlerResult>;
            }
        };

        let fut = handler(req);

        Box::pin(async move {
            let resp = fut.await?;
            let data = Payload::from_serialize(&resp)?;
            HandlerResult::Ok(data)
        }) as BoxFuture<HandlerResult>
    })
}

/// Mapping from method name to handler, consumed by
/// [`RpcServer::new`](crate::RpcServer::new).
///
/// # Example
///
/// ```
/// use worker_rpc::{HandlerError, MethodTable, Payload};
///
/// let methods = MethodTable::new()
///     .register_sync("double", |data: Payload| {
///         let n = data.as_i64().ok_or_else(|| HandlerError::new("expected an integer"))?;
///         Ok(Payload::from(n * 2))
///     })
///     .register("echo", |data: Payload| async move { Ok(data) });
///
/// assert!(methods.contains("double"));
/// assert_eq!(methods.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct MethodTable {
    handlers: HashMap<String, BoxedHandler>,
}

impl MethodTable {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async handler. Replaces any handler of the same name.
    pub fn register<F, Fut>(mut self, method: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.insert(method.into(), wrap_async(handler));
        self
    }

    /// Register a handler that computes its result synchronously.
    pub fn register_sync<F>(mut self, method: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(method.into(), wrap_sync(handler));
        self
    }

    /// Register a handler taking and returning serde types.
    pub fn register_typed<TReq, TResp, F, Fut>(mut self, method: impl Into<String>, handler: F) -> Self
    where
        TReq: DeserializeOwned + Send + 'static,
        TResp: Serialize + Send + 'static,
        F: Fn(TReq) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<TResp, HandlerError>> + Send + 'static,
    {
        self.insert(method.into(), wrap_typed(handler));
        self
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered method names, in no particular order.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub(super) fn insert(&mut self, method: String, handler: BoxedHandler) {
        self.handlers.insert(method, handler);
    }

    pub(super) fn get(&self, method: &str) -> Option<BoxedHandler> {
        self.handlers.get(method).cloned()
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct AddRequest {
        a: i64,
        b: i64,
    }

    #[derive(Serialize)]
    struct AddResponse {
        sum: i64,
    }

    #[tokio::test]
    async fn test_sync_handler_result() {
        // ---
        let handler = wrap_sync(|data: Payload| Ok(Payload::from(data.as_i64().unwrap_or(0) * 2)));
        assert_eq!(handler(Payload::from(21)).await.unwrap().as_i64(), Some(42));
    }

    #[tokio::test]
    async fn test_typed_handler_round_trip() {
        // ---
        let handler = wrap_typed(|req: AddRequest| async move { Ok(AddResponse { sum: req.a + req.b }) });

        let data = Payload::object([("a", 2), ("b", 3)]);
        let result = handler(data).await.unwrap();
        assert_eq!(result.get("sum").and_then(Payload::as_i64), Some(5));
    }

    #[tokio::test]
    async fn test_typed_handler_rejects_bad_payload() {
        // ---
        let handler = wrap_typed(|req: AddRequest| async move { Ok(AddResponse { sum: req.a + req.b }) });

        let err = handler(Payload::from("not an object")).await.unwrap_err();
        assert!(err.message().starts_with("serialization error"));
    }

    #[test]
    fn test_std_errors_convert() {
        // ---
        let parse: std::result::Result<i32, _> = "x".parse::<i32>();
        let err = HandlerError::from(parse.unwrap_err());
        assert_eq!(err.to_string(), "invalid digit found in string");
    }

    #[test]
    fn test_register_replaces_same_name() {
        // ---
        let table = MethodTable::new()
            .register_sync("m", |_| Ok(Payload::from(1)))
            .register_sync("m", |_| Ok(Payload::from(2)));
        assert_eq!(table.len(), 1);
        assert_eq!(table.methods().collect::<Vec<_>>(), vec!["m"]);
    }
}
