//! Per-connection handler: registration, decoding and outbound delivery.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register an outbound channel with the coordinator
//!   2. Loop: decode inbound frames and forward their events, while
//!      writing whatever the coordinator pushes back to the socket
//!   3. On close, tell the coordinator the connection is gone

use std::sync::Arc;
use std::time::Instant;

use greenvest_protocol::{ClientEnvelope, Codec, PlayerId, ServerEnvelope, ServerPayload};
use greenvest_room::{CoordinatorHandle, Outbound};
use greenvest_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::GreenvestError;
use crate::server::ServerState;

/// Drop guard that reports the disconnect when the handler exits.
///
/// This ensures cleanup happens even if the handler bails out with an
/// error. Since `Drop` is synchronous, we spawn a fire-and-forget task.
struct ConnectionGuard {
    player_id: PlayerId,
    coordinator: CoordinatorHandle,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            let _ = coordinator.disconnect(player_id).await;
        });
    }
}

/// Numbers and timestamps outgoing frames for one connection.
struct FrameWriter<'a, C: Codec> {
    conn: &'a WebSocketConnection,
    codec: &'a C,
    seq: u64,
    start: Instant,
}

impl<'a, C: Codec> FrameWriter<'a, C> {
    fn new(conn: &'a WebSocketConnection, codec: &'a C) -> Self {
        Self {
            conn,
            codec,
            seq: 1,
            start: Instant::now(),
        }
    }

    async fn send(&mut self, payload: ServerPayload) -> Result<(), GreenvestError> {
        let envelope = ServerEnvelope {
            seq: self.seq,
            timestamp: self.start.elapsed().as_millis() as u64,
            payload,
        };
        self.seq += 1;
        let bytes = self.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), GreenvestError> {
    let conn_id = conn.id();
    let player_id = PlayerId::from(conn_id);
    tracing::info!(%conn_id, %player_id, "client connected");

    let (tx, mut rx) = mpsc::unbounded_channel();
    state.coordinator.connect(player_id, tx).await?;
    let _guard = ConnectionGuard {
        player_id,
        coordinator: state.coordinator.clone(),
    };

    let mut writer = FrameWriter::new(&conn, &state.codec);

    loop {
        tokio::select! {
            inbound = conn.recv() => {
                let data = match inbound {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, %player_id, "client disconnected");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%player_id, error = %e, "recv error");
                        break;
                    }
                };

                let envelope: ClientEnvelope = match state.codec.decode(&data) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::debug!(%player_id, error = %e, "failed to decode frame");
                        writer
                            .send(ServerPayload::Error {
                                code: 400,
                                message: format!("invalid frame: {e}"),
                            })
                            .await?;
                        continue;
                    }
                };

                tracing::debug!(
                    %player_id,
                    event = envelope.event.name(),
                    room_code = envelope.event.room_code().map(|c| c.as_str()),
                    "event received"
                );
                state
                    .coordinator
                    .send_event(player_id, envelope.ack, envelope.event)
                    .await?;
            }

            outbound = rx.recv() => {
                let Some(outbound) = outbound else {
                    tracing::warn!(%player_id, "coordinator dropped the connection");
                    break;
                };
                let payload = match outbound {
                    Outbound::Event(event) => ServerPayload::Event(event),
                    Outbound::Ack { id, response } => ServerPayload::Ack { id, response },
                };
                writer.send(payload).await?;
            }
        }
    }

    let _ = conn.close().await;

    // _guard drops here → coordinator disconnect fires.
    Ok(())
}
