//! `GreenvestServer` builder and server loop.
//!
//! Ties the layers together: transport → protocol → coordinator.

use std::sync::Arc;

use greenvest_protocol::{Codec, JsonCodec};
use greenvest_room::{CoordinatorHandle, RoomConfig, spawn_coordinator};
use greenvest_transport::{Transport, TransportError, WebSocketTransport};

use crate::GreenvestError;
use crate::handler::handle_connection;

/// Default command channel size for the coordinator actor.
const DEFAULT_CHANNEL_SIZE: usize = 256;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) coordinator: CoordinatorHandle,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Greenvest server.
///
/// # Example
///
/// ```rust,no_run
/// use greenvest::prelude::*;
///
/// # async fn run() -> Result<(), GreenvestError> {
/// let server = GreenvestServer::builder()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct GreenvestServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    channel_size: usize,
}

impl GreenvestServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            room_config: RoomConfig::default(),
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the settings every room is created with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets the coordinator's command queue size.
    pub fn channel_size(mut self, size: usize) -> Self {
        self.channel_size = size.max(1);
        self
    }

    /// Binds the listener and starts the room coordinator.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<GreenvestServer<JsonCodec>, GreenvestError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let coordinator = spawn_coordinator(self.room_config, self.channel_size);

        let state = Arc::new(ServerState {
            coordinator,
            codec: JsonCodec,
        });

        Ok(GreenvestServer { transport, state })
    }
}

impl Default for GreenvestServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Greenvest server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GreenvestServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl GreenvestServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> GreenvestServerBuilder {
        GreenvestServerBuilder::new()
    }
}

impl<C: Codec> GreenvestServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the room coordinator, for diagnostics.
    pub fn coordinator(&self) -> CoordinatorHandle {
        self.state.coordinator.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), GreenvestError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop, spawning a handler task per connection,
    /// until `signal` resolves. The coordinator is stopped on the way out;
    /// connections already open are dropped with the runtime.
    pub async fn run_until(
        mut self,
        signal: impl Future<Output = ()>,
    ) -> Result<(), GreenvestError> {
        let addr = self.local_addr()?;
        tracing::info!(%addr, "Greenvest server listening");

        tokio::pin!(signal);
        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(TransportError::Shutdown) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                () = &mut signal => {
                    tracing::info!("shutdown requested");
                    break;
                }
            }
        }

        let _ = self.transport.shutdown().await;
        let _ = self.state.coordinator.shutdown().await;
        tracing::info!("Greenvest server stopped");
        Ok(())
    }
}
