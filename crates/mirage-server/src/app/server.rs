//! HTTP listener for a [`MockApp`].

use super::MockApp;
use crate::error::StartupError;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Running server. Dropping the handle leaves the server running; call
/// [`ServerHandle::close`] to stop accepting connections.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// `http://host:port` for the bound address.
    pub fn url(&self) -> String {
        base_url(self.local_addr)
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    pub async fn close(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            error!("Mock server task failed: {}", e);
        }
    }
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

/// Base URL shown to users; unspecified hosts print as `localhost`.
pub fn base_url(addr: SocketAddr) -> String {
    if addr.ip().is_unspecified() {
        format!("http://localhost:{}", addr.port())
    } else {
        format!("http://{}", addr)
    }
}

pub async fn bind_listener(host: &str, port: u16) -> Result<TcpListener, StartupError> {
    TcpListener::bind((host, port))
        .await
        .map_err(|source| StartupError::Listen {
            addr: format!("{}:{}", host, port),
            source,
        })
}

/// Serve `app` on `listener` until the handle is closed.
pub fn serve(app: Arc<MockApp>, listener: TcpListener) -> Result<ServerHandle, StartupError> {
    let local_addr = listener
        .local_addr()
        .map_err(|source| StartupError::Listen {
            addr: "listener".to_string(),
            source,
        })?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let mut shutdown_rx = shutdown_tx.subscribe();

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let app = Arc::clone(&app);
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req: Request<Incoming>| {
                                    let app = Arc::clone(&app);
                                    async move { Ok::<_, Infallible>(app.handle(&req)) }
                                });
                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    debug!("Connection error from {}: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error on {}: {}", local_addr, e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Mock server on {} shutting down", local_addr);
                    break;
                }
            }
        }
    });

    info!("Mock server listening on {}", base_url(local_addr));
    Ok(ServerHandle {
        local_addr,
        shutdown_tx,
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        assert_eq!(
            base_url("0.0.0.0:3000".parse().unwrap()),
            "http://localhost:3000"
        );
        assert_eq!(
            base_url("127.0.0.1:8080".parse().unwrap()),
            "http://127.0.0.1:8080"
        );
    }

    #[tokio::test]
    async fn test_bind_reports_address_in_use() {
        let first = bind_listener("127.0.0.1", 0).await.unwrap();
        let port = first.local_addr().unwrap().port();
        let err = bind_listener("127.0.0.1", port).await.unwrap_err();
        assert!(matches!(err, StartupError::Listen { .. }));
        assert!(err.to_string().contains(&port.to_string()));
    }
}
