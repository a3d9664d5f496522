//! `KeynesServer` builder and server loop.
//!
//! This is the entry point for running a Keynes server. It ties together
//! all the layers: transport → protocol → hub/handler → room registry.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use keynes_protocol::{JsonCodec, PlayerId};
use keynes_room::{RoomConfig, RoomRegistry};
use keynes_transport::{ConnectionId, Transport, WebSocketTransport};

use crate::config::{ServerConfig, SnapshotConfig};
use crate::handler::handle_connection;
use crate::hub::ConnectionHub;
use crate::snapshot::SnapshotStore;
use crate::KeynesError;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) registry: RoomRegistry,
    pub(crate) hub: Arc<ConnectionHub>,
    pub(crate) codec: JsonCodec,
    /// Added to every connection id, so new players never collide with
    /// players restored from a snapshot.
    id_base: u64,
}

impl ServerState {
    pub(crate) fn player_id_for(&self, conn_id: ConnectionId) -> PlayerId {
        PlayerId(self.id_base.saturating_add(conn_id.into_inner()))
    }
}

/// Builder for configuring and starting a Keynes server.
///
/// # Example
///
/// ```rust,no_run
/// use keynes::prelude::*;
///
/// # async fn start() -> Result<(), KeynesError> {
/// let server = KeynesServer::builder()
///     .bind("0.0.0.0:4000")
///     .snapshot(SnapshotConfig::new("rooms.json"))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct KeynesServerBuilder {
    config: ServerConfig,
}

impl KeynesServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the room timings and capacity.
    pub fn room_config(mut self, room: RoomConfig) -> Self {
        self.config.room = room;
        self
    }

    /// Enables snapshots.
    pub fn snapshot(mut self, snapshot: SnapshotConfig) -> Self {
        self.config.snapshot = Some(snapshot);
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and restores saved lobbies.
    ///
    /// An unreadable snapshot is logged and the server starts empty.
    pub async fn build(self) -> Result<KeynesServer, KeynesError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let hub = Arc::new(ConnectionHub::new());
        let registry = RoomRegistry::new(self.config.room.clone(), hub.clone());

        let snapshot = self
            .config
            .snapshot
            .map(|s| (SnapshotStore::new(s.path), s.interval));

        let mut id_base = 0;
        if let Some((store, _)) = &snapshot {
            match store.load().await {
                Ok(states) => {
                    id_base = states
                        .iter()
                        .flat_map(|s| s.member_ids())
                        .map(|id| id.0)
                        .max()
                        .unwrap_or(0);
                    let restored = registry.restore(states).await;
                    tracing::info!(path = %store.path().display(), restored, "rooms restored");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not load snapshot, starting empty");
                }
            }
        }

        let state = Arc::new(ServerState {
            registry,
            hub,
            codec: JsonCodec,
            id_base,
        });

        Ok(KeynesServer {
            transport,
            state,
            snapshot,
        })
    }
}

impl Default for KeynesServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Keynes server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct KeynesServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
    snapshot: Option<(SnapshotStore, Duration)>,
}

impl KeynesServer {
    /// Creates a new builder.
    pub fn builder() -> KeynesServerBuilder {
        KeynesServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, KeynesError> {
        Ok(self.transport.local_addr()?)
    }

    /// The server's rooms.
    pub fn registry(&self) -> &RoomRegistry {
        &self.state.registry
    }

    /// Runs the server until Ctrl-C.
    pub async fn run(self) -> Result<(), KeynesError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Ctrl-C received");
        })
        .await
    }

    /// Runs the accept loop until `shutdown` completes, then saves a
    /// final snapshot and stops every room.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), KeynesError> {
        tracing::info!(addr = %self.local_addr()?, "Keynes server running");

        let saver = self.snapshot.clone().map(|(store, interval)| {
            let state = Arc::clone(&self.state);
            tokio::spawn(save_periodically(state, store, interval))
        });

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) if e.is_per_connection() => {
                        tracing::debug!(error = %e, "incoming connection dropped");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("Keynes server shutting down");
        if let Some(saver) = saver {
            saver.abort();
        }
        if let Some((store, _)) = &self.snapshot {
            save_snapshot(&self.state.registry, store).await;
        }
        self.state.registry.shutdown().await;
        Ok(())
    }
}

async fn save_periodically(state: Arc<ServerState>, store: SnapshotStore, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick fires immediately.
    interval.tick().await;

    loop {
        interval.tick().await;
        save_snapshot(&state.registry, &store).await;
    }
}

async fn save_snapshot(registry: &RoomRegistry, store: &SnapshotStore) {
    let states = registry.snapshots().await;
    if let Err(e) = store.save(&states).await {
        tracing::warn!(error = %e, "snapshot failed");
    }
}
