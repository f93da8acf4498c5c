// tests/transport_memory.rs

use bytes::Bytes;
use tokio::time::{timeout, Duration};

use worker_rpc::{
    // ---
    create_memory_channel,
    CorrelationId,
    Envelope,
    Payload,
    RpcError,
    WireFrame,
};

fn numbered_request(n: i64) -> Envelope {
    Envelope::new(WireFrame::request("n", CorrelationId::generate(), n.into()))
}

#[tokio::test]
async fn memory_post_before_subscribe_is_queued() {
    // ---
    // Arrange
    // ---
    let (caller, worker) = create_memory_channel("queued");

    // ---
    // Act
    // ---
    caller.post(numbered_request(1)).expect("post failed");

    let mut sub = worker.subscribe().await.expect("subscribe failed");

    // ---
    // Assert
    // ---
    let env = timeout(Duration::from_millis(100), sub.inbox.recv())
        .await
        .expect("timed out waiting for envelope")
        .expect("inbox closed");

    assert_eq!(env.frame.data(), Some(&Payload::from(1)));
}

#[tokio::test]
async fn memory_preserves_post_order() {
    // ---
    let (caller, worker) = create_memory_channel("fifo");
    let mut sub = worker.subscribe().await.expect("subscribe failed");

    for n in 0..16 {
        caller.post(numbered_request(n)).expect("post failed");
    }

    for n in 0..16 {
        let env = sub.inbox.recv().await.expect("inbox closed");
        assert_eq!(env.frame.data().and_then(Payload::as_i64), Some(n));
    }
}

#[tokio::test]
async fn memory_directions_are_independent() {
    // ---
    let (caller, worker) = create_memory_channel("duplex");
    let mut to_worker = worker.subscribe().await.expect("worker subscribe failed");
    let mut to_caller = caller.subscribe().await.expect("caller subscribe failed");

    caller.post(numbered_request(1)).expect("caller post failed");
    worker
        .post(Envelope::new(WireFrame::event("tick", 2.into())))
        .expect("worker post failed");

    let env = to_worker.inbox.recv().await.expect("worker inbox closed");
    assert_eq!(env.frame.method.as_deref(), Some("n"));

    let env = to_caller.inbox.recv().await.expect("caller inbox closed");
    assert_eq!(env.frame.event_name.as_deref(), Some("tick"));

    assert!(to_worker.inbox.try_recv().is_err());
    assert!(to_caller.inbox.try_recv().is_err());
}

#[tokio::test]
async fn memory_second_subscribe_fails() {
    // ---
    let (_caller, worker) = create_memory_channel("twice");

    let _sub = worker.subscribe().await.expect("first subscribe failed");
    let second = worker.subscribe().await;

    assert!(matches!(second, Err(RpcError::Transport(_))));
}

#[tokio::test]
async fn memory_buffers_move_by_reference() {
    // ---
    let (caller, worker) = create_memory_channel("zero-copy");
    let mut sub = worker.subscribe().await.expect("subscribe failed");

    let buffer = Bytes::from_static(b"frame-bytes");
    let frame = WireFrame::request(
        "upload",
        CorrelationId::generate(),
        Payload::from(buffer.clone()),
    );
    caller
        .post(Envelope::transferring(frame))
        .expect("post failed");

    let env = sub.inbox.recv().await.expect("inbox closed");
    assert_eq!(env.transfer.len(), 1);
    assert_eq!(env.transfer[0].as_ptr(), buffer.as_ptr());
}

#[tokio::test]
async fn memory_close_drains_then_ends() {
    // ---
    let (caller, worker) = create_memory_channel("close");
    let mut sub = worker.subscribe().await.expect("subscribe failed");

    caller.post(numbered_request(7)).expect("post failed");
    caller.close().await.expect("close failed");

    // Already queued envelopes are still delivered.
    let env = sub.inbox.recv().await.expect("queued envelope lost");
    assert_eq!(env.frame.data().and_then(Payload::as_i64), Some(7));
    assert!(sub.inbox.recv().await.is_none());

    // Closing one end closes both directions.
    assert!(matches!(
        caller.post(numbered_request(8)),
        Err(RpcError::Transport(_))
    ));
    assert!(matches!(
        worker.post(numbered_request(9)),
        Err(RpcError::Transport(_))
    ));
    assert!(worker.subscribe().await.is_err());
}

#[tokio::test]
async fn memory_port_ids_name_both_ends() {
    // ---
    let (caller, worker) = create_memory_channel("ids");

    assert_eq!(caller.port_id(), "ids/caller");
    assert_eq!(worker.port_id(), "ids/worker");
}
