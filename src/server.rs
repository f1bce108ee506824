//! HTTP server for module requests

use crate::error::{Result, RouterError};
use crate::handler::ModuleHandler;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Accepts connections and hands every request to a [`ModuleHandler`]
pub struct RouterServer {
    listener: TcpListener,
    handler: Arc<ModuleHandler>,
}

impl RouterServer {
    /// Bind the listening socket
    ///
    /// Binding to port 0 picks a free port; see [`RouterServer::local_addr`].
    pub async fn bind(addr: SocketAddr, handler: Arc<ModuleHandler>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            RouterError::ConfigError(format!("Failed to bind {}: {}", addr, e))
        })?;
        Ok(RouterServer { listener, handler })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the process ends or accepting fails
    pub async fn run(self) -> Result<()> {
        info!("Registry router listening on http://{}", self.local_addr()?);

        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!("Accepted connection: peer={}", peer);
            let io = TokioIo::new(stream);
            let handler = Arc::clone(&self.handler);

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let handler = Arc::clone(&handler);
                    async move { Ok::<_, Infallible>(handler.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection: peer={}, error={:?}", peer, err);
                }
            });
        }
    }
}
