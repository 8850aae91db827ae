//! TCP listener: accepts connections behind a semaphore-bounded limit
//! and spawns one task per client, grounded on the teacher's
//! `BaseListener` (listener + connection semaphore + broadcast shutdown
//! signal). TLS and the auth handshake are not carried over.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};

use crate::net::connection::ConnectionHandler;
use crate::store::Corestore;
use crate::util::error::{Error, SkyResult};

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
}

pub async fn run(cfg: ServerConfig, store: Corestore, mut shutdown: broadcast::Receiver<()>) -> SkyResult<()> {
    let addr = format!("{}:{}", cfg.host, cfg.port);
    let listener = TcpListener::bind(&addr).await.map_err(Error::Bind)?;
    log::info!("listening on {addr}");
    let climit = Arc::new(Semaphore::new(cfg.max_connections));

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        log::warn!("accept error: {e}");
                        continue;
                    }
                };
                let permit = match climit.clone().try_acquire_owned() {
                    Ok(p) => p,
                    Err(_) => {
                        log::warn!("connection limit reached, rejecting {peer}");
                        drop(stream);
                        continue;
                    }
                };
                log::debug!("accepted connection from {peer}");
                let store = store.clone();
                let conn_shutdown = shutdown.resubscribe();
                tokio::spawn(async move {
                    let _permit = permit;
                    ConnectionHandler::new(stream, store, conn_shutdown).run().await;
                    log::debug!("connection from {peer} closed");
                });
            }
            _ = shutdown.recv() => {
                log::info!("shutdown signal received, no longer accepting connections");
                break;
            }
        }
    }
    Ok(())
}
