//! Coordinator actor: a single Tokio task that owns every room.
//!
//! Connection handlers never touch room state. They register an outbound
//! channel, forward decoded events through a [`CoordinatorHandle`], and
//! write whatever arrives on their channel back to the socket. Because one
//! task applies every event in arrival order, no two events ever observe
//! a half-applied update.

use std::collections::HashMap;
use std::time::Duration;

use greenvest_protocol::{AckResponse, ClientEvent, PlayerId, RoomCode, ServerEvent};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};

use crate::coordinator::{Broadcast, Coordinator, RoomInfo};
use crate::{RoomConfig, RoomError};

/// Sweeps never run more often than this, whatever the config says.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Something the coordinator wants written to one connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// A broadcast to a room this connection is a member of.
    Event(ServerEvent),
    /// The reply to a client event that carried an ack id.
    Ack { id: u64, response: AckResponse },
}

/// Channel sender for delivering outbound messages to a connection.
pub type ClientSender = mpsc::UnboundedSender<Outbound>;

pub(crate) enum CoordinatorCommand {
    /// Register a connection's outbound channel.
    Connect {
        player: PlayerId,
        sender: ClientSender,
    },

    /// Apply a client event.
    Event {
        player: PlayerId,
        ack: Option<u64>,
        event: ClientEvent,
    },

    /// The connection is gone.
    Disconnect { player: PlayerId },

    RoomInfo {
        code: RoomCode,
        reply: oneshot::Sender<Option<RoomInfo>>,
    },

    RoomCount { reply: oneshot::Sender<usize> },

    Shutdown,
}

/// Handle to the running coordinator. Cheap to clone; every connection
/// handler holds one.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<CoordinatorCommand>,
}

impl CoordinatorHandle {
    /// Registers `sender` as the outbound channel for `player`.
    /// Must happen before the player's first event.
    pub async fn connect(&self, player: PlayerId, sender: ClientSender) -> Result<(), RoomError> {
        self.send(CoordinatorCommand::Connect { player, sender }).await
    }

    /// Forwards a client event (fire-and-forget). Any broadcast and ack
    /// arrive on the player's outbound channel.
    pub async fn send_event(
        &self,
        player: PlayerId,
        ack: Option<u64>,
        event: ClientEvent,
    ) -> Result<(), RoomError> {
        self.send(CoordinatorCommand::Event { player, ack, event })
            .await
    }

    /// Reports that a connection closed.
    pub async fn disconnect(&self, player: PlayerId) -> Result<(), RoomError> {
        self.send(CoordinatorCommand::Disconnect { player }).await
    }

    /// Requests a metadata snapshot of one room.
    pub async fn room_info(&self, code: RoomCode) -> Result<Option<RoomInfo>, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CoordinatorCommand::RoomInfo {
            code,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CoordinatorCommand::RoomCount { reply: reply_tx })
            .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Stops the coordinator. Rooms are dropped with it.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(CoordinatorCommand::Shutdown).await
    }

    async fn send(&self, cmd: CoordinatorCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable)
    }
}

struct CoordinatorActor<R> {
    coordinator: Coordinator<R>,
    senders: HashMap<PlayerId, ClientSender>,
    receiver: mpsc::Receiver<CoordinatorCommand>,
}

impl<R: Rng> CoordinatorActor<R> {
    async fn run(mut self) {
        tracing::info!("room coordinator started");

        let sweeping = self.coordinator.config().idle_ttl.is_some();
        let period = self
            .coordinator
            .config()
            .sweep_interval
            .max(MIN_SWEEP_INTERVAL);
        let mut sweep = tokio::time::interval_at(Instant::now() + period, period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle(cmd) {
                        break;
                    }
                }
                _ = sweep.tick(), if sweeping => {
                    let evicted = self.coordinator.sweep_idle(Instant::now());
                    if !evicted.is_empty() {
                        tracing::debug!(
                            evicted = evicted.len(),
                            remaining = self.coordinator.room_count(),
                            "idle sweep"
                        );
                    }
                }
            }
        }

        tracing::info!(
            rooms = self.coordinator.room_count(),
            "room coordinator stopped"
        );
    }

    /// Returns `false` when the actor should stop.
    fn handle(&mut self, cmd: CoordinatorCommand) -> bool {
        match cmd {
            CoordinatorCommand::Connect { player, sender } => {
                self.senders.insert(player, sender);
            }
            CoordinatorCommand::Event { player, ack, event } => {
                let outcome = self.coordinator.handle_event(player, event);
                if let Some(broadcast) = outcome.broadcast {
                    self.dispatch(broadcast);
                }
                // Acks go out after the broadcast so a joining client sees
                // the player list before its own success.
                if let (Some(id), Some(response)) = (ack, outcome.ack) {
                    self.send_to(player, Outbound::Ack { id, response });
                }
            }
            CoordinatorCommand::Disconnect { player } => {
                self.senders.remove(&player);
                let rooms = self.coordinator.disconnect(player);
                tracing::debug!(%player, rooms = rooms.len(), "connection dropped from rooms");
            }
            CoordinatorCommand::RoomInfo { code, reply } => {
                let _ = reply.send(self.coordinator.room_info(&code));
            }
            CoordinatorCommand::RoomCount { reply } => {
                let _ = reply.send(self.coordinator.room_count());
            }
            CoordinatorCommand::Shutdown => {
                tracing::info!("room coordinator shutting down");
                return false;
            }
        }
        true
    }

    /// Sends a broadcast to every current member of its room.
    fn dispatch(&self, broadcast: Broadcast) {
        tracing::debug!(
            room_code = %broadcast.room,
            event = broadcast.event.name(),
            "broadcast"
        );
        for member in self.coordinator.members(&broadcast.room) {
            self.send_to(*member, Outbound::Event(broadcast.event.clone()));
        }
    }

    /// Silently drops the message if the connection is gone.
    fn send_to(&self, player: PlayerId, msg: Outbound) {
        if let Some(sender) = self.senders.get(&player) {
            let _ = sender.send(msg);
        }
    }
}

/// Spawns the coordinator task and returns a handle to it.
///
/// `channel_size` bounds the command queue; senders wait when it is full.
pub fn spawn_coordinator(config: RoomConfig, channel_size: usize) -> CoordinatorHandle {
    spawn_coordinator_with_rng(config, channel_size, StdRng::from_os_rng())
}

/// Like [`spawn_coordinator`], with a caller-supplied RNG.
pub fn spawn_coordinator_with_rng<R>(
    config: RoomConfig,
    channel_size: usize,
    rng: R,
) -> CoordinatorHandle
where
    R: Rng + Send + 'static,
{
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = CoordinatorActor {
        coordinator: Coordinator::with_rng(config, rng),
        senders: HashMap::new(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    CoordinatorHandle { sender: tx }
}
