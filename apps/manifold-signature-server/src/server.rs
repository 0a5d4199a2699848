//! The connection accept loop.

use std::future::Future;

use anyhow::Result;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use manifold_signature_http::RequestVerifier;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::gateway::GatewayService;

/// Run the accept loop, serving connections until `shutdown` resolves.
///
/// In-flight requests are drained before returning.
pub async fn serve<V>(
    listener: TcpListener,
    service: GatewayService<V>,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    V: RequestVerifier,
{
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}
