//! Service loop (spec.md §4.7): bind once, accept one client at a time,
//! and run exactly one request/dispatch/response cycle per connection.

use anyhow::Context;
use kvd_domain::config::Config;
use kvd_domain::trace::TraceEvent;
use kvd_protocol::{read_frame, write_frame};
use tokio::net::{TcpListener, TcpStream};

use crate::server::Server;

/// Bind the listener and serve forever. Runs on whatever executor the
/// caller is on — the gateway binary drives this from a single-threaded
/// runtime so there is never more than one connection in flight
/// (spec.md §5's single-inflight discipline).
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, model = %config.model.kind, "kvdrived listening");

    let ceiling = config.generation.frame_ceiling_bytes;
    let mut server = Server::new(&config);

    loop {
        let (stream, peer) = listener.accept().await.context("accepting connection")?;
        TraceEvent::ConnectionAccepted {
            peer: peer.to_string(),
        }
        .emit();

        if let Err(e) = handle_connection(stream, &mut server, ceiling).await {
            tracing::warn!(error = %e, %peer, "connection ended with an error");
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    server: &mut Server,
    ceiling: usize,
) -> anyhow::Result<()> {
    let request = read_frame(&mut stream, ceiling).await?;
    TraceEvent::FrameReceived {
        bytes: request.len(),
    }
    .emit();

    let payload = String::from_utf8_lossy(&request);
    let reply = server.handle_payload(&payload).await;

    TraceEvent::FrameSent {
        bytes: reply.len(),
    }
    .emit();
    write_frame(&mut stream, reply.as_bytes()).await?;
    Ok(())
}
