//! The room registry and the rules for who may do what to a room.
//!
//! [`Coordinator`] is synchronous and owns every room. It is driven by
//! the coordinator actor (see `actor.rs`), which gives it one event at a
//! time, so no locking is needed here.

use std::collections::HashMap;

use greenvest_protocol::{AckResponse, ClientEvent, Investments, PlayerId, RoomCode, ServerEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;

use crate::room::{Host, Room};
use crate::{RoomConfig, RoomError, RoomPhase};

/// Smallest and largest generated room code.
const CODE_MIN: u16 = 1000;
const CODE_MAX: u16 = 9999;

/// Random draws before falling back to a scan for a free code.
const CODE_ATTEMPTS: usize = 32;

/// An event to deliver to every member of a room.
#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast {
    pub room: RoomCode,
    pub event: ServerEvent,
}

/// What handling one client event produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outcome {
    /// Sent to the room first.
    pub broadcast: Option<Broadcast>,
    /// Then sent to the caller, if it asked for an ack.
    pub ack: Option<AckResponse>,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub phase: RoomPhase,
    pub started: bool,
    pub player_count: usize,
    pub max_players: usize,
    pub member_count: usize,
}

/// Owns every room, keyed by code.
pub struct Coordinator<R = StdRng> {
    config: RoomConfig,
    rooms: HashMap<RoomCode, Room>,
    rng: R,
}

impl Coordinator<StdRng> {
    /// Creates an empty coordinator seeded from the OS.
    pub fn new(config: RoomConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }
}

impl<R: Rng> Coordinator<R> {
    /// Creates an empty coordinator with a caller-supplied RNG (tests use
    /// a seeded one for repeatable shuffles).
    pub fn with_rng(config: RoomConfig, rng: R) -> Self {
        Self {
            config,
            rooms: HashMap::new(),
            rng,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn room(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_info(&self, code: &RoomCode) -> Option<RoomInfo> {
        self.rooms.get(code).map(|room| RoomInfo {
            code: room.code().clone(),
            phase: room.phase(),
            started: room.is_started(),
            player_count: room.players().len(),
            max_players: self.config.max_players,
            member_count: room.members().len(),
        })
    }

    /// The connections that receive broadcasts for `code`.
    pub fn members(&self, code: &RoomCode) -> &[PlayerId] {
        self.rooms.get(code).map(Room::members).unwrap_or(&[])
    }

    // -----------------------------------------------------------------
    // Event routing
    // -----------------------------------------------------------------

    /// Applies one client event.
    ///
    /// `createRoom` and `joinRoom` always produce an ack (the code, or
    /// success/error). Every other event either broadcasts or, if the room
    /// is unknown or the caller lacks the right, is dropped without a
    /// word to the client.
    pub fn handle_event(&mut self, caller: PlayerId, event: ClientEvent) -> Outcome {
        let name = event.name();
        match event {
            ClientEvent::CreateRoom { host_name } => match self.create_room(caller, host_name) {
                Ok(code) => Outcome {
                    broadcast: None,
                    ack: Some(AckResponse::RoomCode(code)),
                },
                Err(e) => {
                    tracing::warn!(%caller, error = %e, "room creation failed");
                    Outcome {
                        broadcast: None,
                        ack: Some(AckResponse::error(e.to_string())),
                    }
                }
            },

            ClientEvent::JoinRoom {
                room_code,
                player_name,
                avatar,
            } => match self.join_room(caller, &room_code, player_name, avatar) {
                Ok(broadcast) => Outcome {
                    broadcast: Some(broadcast),
                    ack: Some(AckResponse::success()),
                },
                Err(e) => {
                    tracing::debug!(%caller, %room_code, error = %e, "join rejected");
                    Outcome {
                        broadcast: None,
                        ack: Some(AckResponse::error(e.to_string())),
                    }
                }
            },

            ClientEvent::StartGame { room_code } => {
                let result = self.start_game(caller, &room_code);
                Self::silent(name, caller, result)
            }
            ClientEvent::Invest {
                room_code,
                investments,
            } => {
                let result = self.invest(caller, &room_code, investments);
                Self::silent(name, caller, result)
            }
            ClientEvent::FlashNews { room_code, message } => {
                let result = self.flash_news(caller, &room_code, message);
                Self::silent(name, caller, result)
            }
            ClientEvent::UnlockSectors { room_code } => {
                let result = self.unlock_sectors(caller, &room_code);
                Self::silent(name, caller, result)
            }
            ClientEvent::EndGame { room_code } => {
                let result = self.end_game(caller, &room_code);
                Self::silent(name, caller, result)
            }
        }
    }

    /// Turns a result into a broadcast-only outcome; failures are logged
    /// and swallowed.
    fn silent(
        event: &'static str,
        caller: PlayerId,
        result: Result<Broadcast, RoomError>,
    ) -> Outcome {
        match result {
            Ok(broadcast) => Outcome {
                broadcast: Some(broadcast),
                ack: None,
            },
            Err(e) => {
                tracing::debug!(event, %caller, error = %e, "event dropped");
                Outcome::default()
            }
        }
    }

    // -----------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------

    /// Opens a room with `caller` as host and returns its code.
    pub fn create_room(
        &mut self,
        caller: PlayerId,
        host_name: String,
    ) -> Result<RoomCode, RoomError> {
        let code = self.free_code()?;
        let host = Host {
            id: caller,
            name: host_name,
        };
        let room = Room::new(code.clone(), host, &self.config);
        self.rooms.insert(code.clone(), room);
        tracing::info!(room_code = %code, host = %caller, "room created");
        Ok(code)
    }

    /// Adds `caller` as a player and broadcasts the new player list.
    pub fn join_room(
        &mut self,
        caller: PlayerId,
        code: &RoomCode,
        player_name: String,
        avatar: String,
    ) -> Result<Broadcast, RoomError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        room.add_player(caller, player_name, avatar, &self.config)?;
        room.touch();
        tracing::info!(
            room_code = %code,
            player_id = %caller,
            players = room.players().len(),
            "player joined"
        );
        Ok(Broadcast {
            room: code.clone(),
            event: ServerEvent::UpdatePlayers {
                players: room.player_views(),
            },
        })
    }

    /// Host only. Deals roles and announces the impostors' ids.
    pub fn start_game(&mut self, caller: PlayerId, code: &RoomCode) -> Result<Broadcast, RoomError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        room.require_host(caller)?;
        room.start(&mut self.rng, self.config.impostor_count);
        room.touch();

        let impostors: Vec<PlayerId> = room.impostors().map(|p| p.id).collect();
        tracing::info!(
            room_code = %code,
            players = room.players().len(),
            impostors = impostors.len(),
            "game started"
        );
        Ok(Broadcast {
            room: code.clone(),
            event: ServerEvent::GameStarted {
                sectors: room.sector_views(),
                impostors,
            },
        })
    }

    /// Replaces the caller's investments and broadcasts the player list.
    pub fn invest(
        &mut self,
        caller: PlayerId,
        code: &RoomCode,
        investments: Investments,
    ) -> Result<Broadcast, RoomError> {
        let budget = self.config.starting_budget;
        let room = self.room_mut(code)?;
        room.invest(caller, investments, budget)?;
        room.touch();
        Ok(Broadcast {
            room: code.clone(),
            event: ServerEvent::UpdatePlayers {
                players: room.player_views(),
            },
        })
    }

    /// Host only. Relays `message` to the room as-is.
    pub fn flash_news(
        &mut self,
        caller: PlayerId,
        code: &RoomCode,
        message: String,
    ) -> Result<Broadcast, RoomError> {
        let room = self.room_mut(code)?;
        room.require_host(caller)?;
        room.touch();
        Ok(Broadcast {
            room: code.clone(),
            event: ServerEvent::News { message },
        })
    }

    /// Host only. Opens every sector.
    pub fn unlock_sectors(
        &mut self,
        caller: PlayerId,
        code: &RoomCode,
    ) -> Result<Broadcast, RoomError> {
        let room = self.room_mut(code)?;
        room.require_host(caller)?;
        room.unlock_sectors();
        room.touch();
        tracing::info!(room_code = %code, "sectors unlocked");
        Ok(Broadcast {
            room: code.clone(),
            event: ServerEvent::SectorsUnlocked {
                sectors: room.sector_views(),
            },
        })
    }

    /// Host only. Scores the room and announces the winner.
    pub fn end_game(&mut self, caller: PlayerId, code: &RoomCode) -> Result<Broadcast, RoomError> {
        let weights = self.config.weights();
        let room = self.room_mut(code)?;
        room.require_host(caller)?;
        let event = room.end(weights);
        room.touch();
        tracing::info!(room_code = %code, "game ended");
        Ok(Broadcast {
            room: code.clone(),
            event,
        })
    }

    /// Forgets a dropped connection: it leaves every broadcast group and
    /// its player records are marked disconnected. Hosts keep their rooms.
    ///
    /// Returns the codes of the rooms that knew the connection.
    pub fn disconnect(&mut self, conn: PlayerId) -> Vec<RoomCode> {
        let mut affected: Vec<RoomCode> = self
            .rooms
            .values_mut()
            .filter_map(|room| room.drop_connection(conn).then(|| room.code().clone()))
            .collect();
        affected.sort();
        affected
    }

    /// Evicts rooms idle for longer than the configured TTL as of `now`.
    /// Returns the evicted codes.
    pub fn sweep_idle(&mut self, now: Instant) -> Vec<RoomCode> {
        let Some(ttl) = self.config.idle_ttl else {
            return Vec::new();
        };

        let mut evicted = Vec::new();
        self.rooms.retain(|code, room| {
            let idle = now.saturating_duration_since(room.last_activity());
            if idle > ttl {
                evicted.push(code.clone());
                false
            } else {
                true
            }
        });

        for code in &evicted {
            tracing::info!(room_code = %code, "idle room evicted");
        }
        evicted
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    fn room_mut(&mut self, code: &RoomCode) -> Result<&mut Room, RoomError> {
        self.rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Draws a four-digit code no live room is using.
    ///
    /// A few random draws almost always succeed; when the registry is
    /// crowded, scan forward from a random start instead.
    fn free_code(&mut self) -> Result<RoomCode, RoomError> {
        for _ in 0..CODE_ATTEMPTS {
            let code = RoomCode::from(self.rng.random_range(CODE_MIN..=CODE_MAX).to_string());
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }

        let span = u32::from(CODE_MAX - CODE_MIN) + 1;
        let start = self.rng.random_range(0..span);
        (0..span)
            .map(|offset| (start + offset) % span + u32::from(CODE_MIN))
            .map(|n| RoomCode::from(n.to_string()))
            .find(|code| !self.rooms.contains_key(code))
            .ok_or(RoomError::CodeSpaceExhausted)
    }
}
