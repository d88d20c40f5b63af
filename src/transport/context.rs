//! Transport context
//!
//! `TransportContext` is constructed once at startup and handed to the broker
//! and to every backend adapter. It creates and binds sockets (preparing
//! `ipc://` directories on the way) and carries the process shutdown signal.
//! Clones share the same shutdown state.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;
use zeromq::Socket;

use crate::utils::{RelayError, Result};

#[derive(Debug, Clone)]
pub struct TransportContext {
    shutdown: Arc<watch::Sender<bool>>,
}

impl Default for TransportContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportContext {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown: Arc::new(shutdown),
        }
    }

    /// Ask everything built from this context to stop.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolves once [`TransportContext::shutdown`] has been called.
    pub async fn shutdown_signal(&self) {
        let mut rx = self.shutdown.subscribe();
        let _ = rx.wait_for(|down| *down).await;
    }

    /// Create a socket of type `S` and bind it to `endpoint`.
    pub async fn bind<S: Socket>(&self, endpoint: &str) -> Result<S> {
        prepare_endpoint(endpoint)?;

        let mut socket = S::new();
        socket
            .bind(endpoint)
            .await
            .map_err(|source| RelayError::EndpointBind {
                endpoint: endpoint.to_string(),
                source,
            })?;
        Ok(socket)
    }

    /// Create a socket of type `S` and connect it to `endpoint`.
    pub async fn connect<S: Socket>(&self, endpoint: &str) -> Result<S> {
        let mut socket = S::new();
        socket.connect(endpoint).await?;
        Ok(socket)
    }
}

/// Make sure the directory holding an `ipc://` socket file exists.
/// Other transports need no preparation.
pub fn prepare_endpoint(endpoint: &str) -> Result<()> {
    let Some(path) = endpoint.strip_prefix("ipc://") else {
        return Ok(());
    };

    let Some(dir) = Path::new(path).parent() else {
        return Ok(());
    };
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }

    info!(
        "{} does not exist, creating it for {endpoint}",
        dir.display()
    );
    create_socket_dir(dir).map_err(|source| RelayError::DirectoryCreate {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn create_socket_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o775)
        .create(dir)
}

#[cfg(not(unix))]
fn create_socket_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}
