//! Single worker over an in-memory channel.
//!
//! A server registers `double` and `add`, pushes a progress event from a
//! handler, and a client calls both methods, including one that times out.
//!
//! Run with: RUST_LOG=worker_rpc=debug cargo run --example double_memory

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt as tracing_format, EnvFilter};
use worker_rpc::{
    // ---
    create_memory_channel,
    CallOptions,
    HandlerError,
    HandlerResult,
    MethodTable,
    Payload,
    Result,
    RpcClient,
    RpcConfig,
    RpcServer,
};

#[derive(Debug, Serialize, Deserialize)]
struct AddRequest {
    a: i32,
    b: i32,
}

#[derive(Debug, Serialize, Deserialize)]
struct AddResponse {
    sum: i32,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    tracing_format()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_line_number(true)
        .init();

    let (caller, worker) = create_memory_channel("math");

    let methods = MethodTable::new()
        .register_sync("double", |data: Payload| {
            let n = data
                .as_i64()
                .ok_or_else(|| HandlerError::new("double expects an integer"))?;
            Ok(Payload::from(n * 2))
        })
        .register_typed("add", |req: AddRequest| async move {
            // ---
            Ok(AddResponse { sum: req.a + req.b })
        });

    let server = RpcServer::new(worker, methods).await?;

    let emitter = server.emitter();
    server.register("countdown", move |data: Payload| {
        let emitter = emitter.clone();
        async move {
            let from = data.as_i64().unwrap_or(3);
            for n in (1..=from).rev() {
                emitter.emit("tick", n)?;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            HandlerResult::Ok("liftoff".into())
        }
    });
    server.register("stall", |_| std::future::pending::<HandlerResult>());

    let client = RpcClient::new(vec![caller], RpcConfig::default()).await?;
    client.on("tick", |data: &Payload| println!("tick {}", data.as_i64().unwrap_or_default()));

    let doubled = client.call("double", 21, CallOptions::default()).await?;
    println!("double(21) = {}", doubled.as_i64().unwrap_or_default());

    let resp: AddResponse = client.request("add", AddRequest { a: 20, b: 3 }).await?;
    println!("20 + 3 = {}", resp.sum);

    let done = client.call("countdown", 3, CallOptions::default()).await?;
    println!("countdown -> {}", done.as_str().unwrap_or_default());

    match client
        .call(
            "stall",
            Payload::Null,
            CallOptions::with_timeout(Duration::from_millis(50)),
        )
        .await
    {
        Ok(_) => println!("stall unexpectedly answered"),
        Err(err) => println!("stall failed as expected: {err}"),
    }

    if let Err(err) = client.call("missing", Payload::Null, CallOptions::default()).await {
        println!("missing failed as expected: {err}");
    }

    client.shutdown().await?;
    Ok(())
}
