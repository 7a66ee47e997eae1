//! `QuickdrawServer` builder and server loop.
//!
//! Ties the layers together: transport → protocol → room coordinator.

use std::sync::Arc;
use std::time::Duration;

use quickdraw_protocol::{Codec, JsonCodec};
use quickdraw_room::{Coordinator, RoomConfig};
use quickdraw_transport::{Transport, WebSocketTransport};
use tokio::time::Instant;

use crate::handler::handle_connection;
use crate::{QuickdrawError, ServerConfig};

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) coordinator: Coordinator,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
    started: Instant,
}

impl<C: Codec> ServerState<C> {
    /// Milliseconds since the server started. Used for envelope
    /// timestamps and `server_time` fields.
    pub(crate) fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Builder for configuring and starting a Quickdraw server.
///
/// # Example
///
/// ```rust,no_run
/// use quickdraw::prelude::*;
///
/// # async fn run() -> Result<(), QuickdrawError> {
/// let server = QuickdrawServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct QuickdrawServerBuilder {
    config: ServerConfig,
}

impl QuickdrawServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Sets how often connections are pinged and how long one may stay
    /// silent before it counts as lost.
    pub fn keepalive(mut self, interval: Duration, timeout: Duration) -> Self {
        self.config.keepalive_interval = interval;
        self.config.keepalive_timeout = timeout;
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` over `WebSocketTransport`.
    pub async fn build(self) -> Result<QuickdrawServer<JsonCodec>, QuickdrawError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            coordinator: Coordinator::new(self.config.room.clone()),
            codec: JsonCodec,
            config: self.config,
            started: Instant::now(),
        });

        Ok(QuickdrawServer { transport, state })
    }
}

impl Default for QuickdrawServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Quickdraw server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct QuickdrawServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl QuickdrawServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> QuickdrawServerBuilder {
        QuickdrawServerBuilder::new()
    }
}

impl<C: Codec> QuickdrawServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated, spawning a
    /// handler task per connection.
    pub async fn run(mut self) -> Result<(), QuickdrawError> {
        tracing::info!(
            addr = %self.state.config.bind_addr,
            version = PROTOCOL_VERSION,
            "Quickdraw server running"
        );

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
