//! Minimal stand-in for the compilation backend
//!
//! Invoked the way the real backend is: `stub-backend [args...] <host> <port>`.
//! Serves `GET /v1/health` with `{"status":"ok"}` until killed. With
//! `--version` anywhere in its arguments it prints a banner and exits, like
//! the backend CLI.

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use warp::Filter;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--version") {
        println!("wasmstan-stub {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let [.., host, port] = args.as_slice() else {
        bail!("usage: stub-backend [args...] <host> <port>");
    };
    let port: u16 = port.parse().with_context(|| format!("invalid port {port:?}"))?;
    let addr: SocketAddr = tokio::net::lookup_host((host.as_str(), port))
        .await
        .with_context(|| format!("resolve {host}"))?
        .next()
        .with_context(|| format!("no address for {host}"))?;

    let health = warp::path!("v1" / "health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({ "status": "ok" })));

    let (_, server) = warp::serve(health)
        .try_bind_ephemeral(addr)
        .with_context(|| format!("bind {addr}"))?;
    server.await;
    Ok(())
}
