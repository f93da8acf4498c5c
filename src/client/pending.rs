use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::lock::lock_ignore_poison;
use crate::{log_debug, CorrelationId, Payload, Result, RpcError};

/// Outcome delivered to the waiting [`PendingReply`](super::PendingReply).
pub(super) type Settlement = Result<Payload>;

/// Bookkeeping for one in-flight call.
pub(super) struct PendingCall {
    // ---
    method: Arc<str>,
    tx: oneshot::Sender<Settlement>,
    timer: JoinHandle<()>,
}

impl PendingCall {
    /// Deliver the outcome and cancel the timer.
    ///
    /// Returns `false` if the caller already dropped its `PendingReply`.
    pub(super) fn settle(self, outcome: Settlement) -> bool {
        // ---
        self.timer.abort();
        self.tx.send(outcome).is_ok()
    }

    /// Deliver the timeout failure. Called from the timer task itself, so
    /// the timer handle is only dropped, not aborted.
    fn expire(self) -> bool {
        // ---
        let err = RpcError::Timeout {
            method: self.method.to_string(),
        };
        self.tx.send(Err(err)).is_ok()
    }
}

/// Tracks calls waiting for a Reply or Error frame.
///
/// Every removal goes through [`take`](Self::take), a single
/// `HashMap::remove` under the lock. Whichever of reply, error or timer gets
/// the entry first settles the call; the others see `None` and do nothing.
pub(super) struct PendingCalls {
    // ---
    calls: Mutex<HashMap<CorrelationId, PendingCall>>,
}

impl PendingCalls {
    // ---

    /// Create an empty pending-call table
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(HashMap::new()),
        })
    }

    /// Register a new call and start its timer.
    ///
    /// Returns the receiver the caller awaits. The timer is spawned while the
    /// table lock is held, so it can never look up the uid before the entry
    /// exists, even for a zero timeout.
    pub fn register(
        self: &Arc<Self>,
        uid: CorrelationId,
        method: &str,
        timeout: Duration,
    ) -> oneshot::Receiver<Settlement> {
        // ---
        let (tx, rx) = oneshot::channel();

        let mut calls = lock_ignore_poison(&self.calls);
        let timer = tokio::spawn(expire_after(Arc::downgrade(self), uid.clone(), timeout));

        calls.insert(
            uid,
            PendingCall {
                method: Arc::from(method),
                tx,
                timer,
            },
        );

        rx
    }

    /// Remove a call, if still pending.
    pub fn take(&self, uid: &CorrelationId) -> Option<PendingCall> {
        lock_ignore_poison(&self.calls).remove(uid)
    }

    /// Settle a call with `outcome`.
    ///
    /// Returns `true` if the uid was pending.
    pub fn settle(&self, uid: &CorrelationId, outcome: Settlement) -> bool {
        // ---
        match self.take(uid) {
            Some(call) => {
                if !call.settle(outcome) {
                    log_debug!("reply for {uid} arrived after caller stopped waiting");
                }
                true
            }
            None => false,
        }
    }

    /// Remove every pending call.
    pub fn drain(&self) -> Vec<PendingCall> {
        lock_ignore_poison(&self.calls)
            .drain()
            .map(|(_, call)| call)
            .collect()
    }

    /// Get the number of pending calls
    pub fn len(&self) -> usize {
        lock_ignore_poison(&self.calls).len()
    }
}

async fn expire_after(calls: Weak<PendingCalls>, uid: CorrelationId, timeout: Duration) {
    // ---
    tokio::time::sleep(timeout).await;

    let Some(calls) = calls.upgrade() else {
        return;
    };

    if let Some(call) = calls.take(&uid) {
        log_debug!("call {uid} to {:?} timed out after {timeout:?}", call.method);
        call.expire();
    }
}
