//! Listener: accepts connections and spawns one handler task each.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::net::TcpListener;

use crate::{error::ServerError, handler::run_connection, registry::Registry};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (e.g., "0.0.0.0:6677").
    pub bind_address: String,
    /// How long to wait for a client's public value before giving up.
    pub handshake_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{}", charla_proto::DEFAULT_PORT),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// The chat server: a bound listener plus the shared session registry.
pub struct Server {
    listener: TcpListener,
    registry: Arc<Registry>,
    config: ServerConfig,
    next_conn_id: AtomicU64,
}

impl Server {
    /// Creates and binds a new server.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] if binding fails. This is the only
    /// fatal error path in the server.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_address).await?;
        Ok(Self {
            listener,
            registry: Arc::new(Registry::new()),
            config,
            next_conn_id: AtomicU64::new(1),
        })
    }

    /// The local address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// A handle to the shared session registry.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Accepts connections forever.
    ///
    /// Every accepted connection gets a fresh id and a detached task; the
    /// listener neither tracks nor joins them. Accept errors are logged and
    /// looped past.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!(address = %self.local_addr()?, "server listening");

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(conn_id, %peer, "connection accepted");

                    let registry = Arc::clone(&self.registry);
                    let handshake_timeout = self.config.handshake_timeout;
                    tokio::spawn(async move {
                        if let Err(e) =
                            run_connection(stream, registry, conn_id, handshake_timeout).await
                        {
                            tracing::debug!(conn_id, error = %e, "connection ended with error");
                        } else {
                            tracing::debug!(conn_id, "connection closed");
                        }
                    });
                },
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                },
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("bind_address", &self.config.bind_address)
            .field("registry", &self.registry)
            .finish()
    }
}
