//! Round-robin dispatch over a pool of workers.
//!
//! Spawns four in-memory workers, each answering `whoami` with its index,
//! and fires a batch of concurrent calls from one client.
//!
//! Run with: RUST_LOG=worker_rpc=trace cargo run --example worker_pool

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use tracing_subscriber::{fmt as tracing_format, EnvFilter};
use worker_rpc::{
    // ---
    create_memory_channel,
    CallOptions,
    MethodTable,
    Payload,
    Result,
    RpcClient,
    RpcServer,
};

const WORKERS: usize = 4;
const CALLS: usize = 12;

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    tracing_format()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_line_number(true)
        .init();

    let mut builder = RpcClient::builder().request_timeout(Duration::from_secs(1));
    let mut servers = Vec::with_capacity(WORKERS);

    for index in 0..WORKERS {
        let (caller, worker) = create_memory_channel(format!("worker-{index}"));

        let methods = MethodTable::new().register("whoami", move |data: Payload| async move {
            // ---
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(Payload::object([
                ("worker", Payload::from(index)),
                ("job", data),
            ]))
        });

        servers.push(RpcServer::new(worker, methods).await?);
        builder = builder.worker(caller);
    }

    let client = builder.build().await?;

    let replies: Vec<_> = (0..CALLS)
        .map(|job| client.call("whoami", job, CallOptions::default()))
        .collect();

    println!("{} calls in flight", client.pending_count());

    for reply in replies {
        let reply = reply.await?;
        println!(
            "job {:>2} served by worker {}",
            reply.get("job").and_then(Payload::as_u64).unwrap_or_default(),
            reply.get("worker").and_then(Payload::as_u64).unwrap_or_default(),
        );
    }

    client.shutdown().await?;
    Ok(())
}
