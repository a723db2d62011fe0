//! A single game room: its host, players, sectors and broadcast group.
//!
//! `Room` is plain data plus the rules for mutating it. It knows nothing
//! about channels or connections; the coordinator decides who may call
//! what and turns the results into broadcasts.

use greenvest_protocol::{
    Investments, PlayerId, PlayerView, Role, RoomCode, ScoreEntry, SectorView, ServerEvent,
};
use rand::Rng;
use rand::seq::SliceRandom;
use tokio::time::Instant;

use crate::scoring::{self, Weights};
use crate::{RoomConfig, RoomError, RoomPhase};

/// The connection that created the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub id: PlayerId,
    pub name: String,
}

/// A team in the room.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub avatar: String,
    pub role: Role,
    pub investments: Investments,
    /// `starting_budget - sum(investments)`. Not clamped.
    pub remaining: f64,
    /// Cleared when the player's connection drops; the record stays.
    pub connected: bool,
}

impl Player {
    fn new(id: PlayerId, name: String, avatar: String, budget: f64) -> Self {
        Self {
            id,
            name,
            avatar,
            role: Role::Investor,
            investments: Investments::new(),
            remaining: budget,
            connected: true,
        }
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            role: self.role,
            investments: self.investments.clone(),
            remaining: self.remaining,
            connected: self.connected,
        }
    }
}

/// An investment option.
#[derive(Debug, Clone, PartialEq)]
pub struct Sector {
    pub name: String,
    pub return_rate: f64,
    pub green_score: f64,
    pub locked: bool,
}

impl Sector {
    pub fn view(&self) -> SectorView {
        SectorView {
            name: self.name.clone(),
            return_rate: self.return_rate,
            green_score: self.green_score,
            locked: self.locked,
        }
    }
}

/// One game session.
#[derive(Debug, Clone)]
pub struct Room {
    code: RoomCode,
    host: Host,
    players: Vec<Player>,
    sectors: Vec<Sector>,
    /// Connections that receive this room's broadcasts, in join order.
    members: Vec<PlayerId>,
    started: bool,
    phase: RoomPhase,
    last_activity: Instant,
}

impl Room {
    /// Creates a room in the lobby with every configured sector locked.
    /// The host is the first member of the broadcast group.
    pub fn new(code: RoomCode, host: Host, config: &RoomConfig) -> Self {
        let sectors = config
            .sectors
            .iter()
            .map(|spec| Sector {
                name: spec.name.clone(),
                return_rate: spec.return_rate,
                green_score: spec.green_score,
                locked: true,
            })
            .collect();

        Self {
            code,
            members: vec![host.id],
            host,
            players: Vec::new(),
            sectors,
            started: false,
            phase: RoomPhase::Lobby,
            last_activity: Instant::now(),
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn members(&self) -> &[PlayerId] {
        &self.members
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn is_host(&self, id: PlayerId) -> bool {
        self.host.id == id
    }

    /// The first player record owned by `id`.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Players currently holding the impostor role, in player-list order.
    pub fn impostors(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.role == Role::Impostor)
    }

    /// Fails with [`RoomError::Unauthorized`] unless `id` is the host.
    pub fn require_host(&self, id: PlayerId) -> Result<(), RoomError> {
        if self.is_host(id) {
            Ok(())
        } else {
            Err(RoomError::Unauthorized(self.code.clone()))
        }
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn advance_to(&mut self, phase: RoomPhase) {
        self.phase = self.phase.max(phase);
    }

    /// Adds a broadcast-group member. Joining twice is a no-op.
    pub fn join_group(&mut self, id: PlayerId) {
        if !self.members.contains(&id) {
            self.members.push(id);
        }
    }

    /// Removes `id` from the broadcast group and flags its player records
    /// as disconnected. Returns `true` if the room knew the connection.
    pub fn drop_connection(&mut self, id: PlayerId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| *m != id);
        let mut known = self.members.len() != before;
        for player in self.players.iter_mut().filter(|p| p.id == id) {
            player.connected = false;
            known = true;
        }
        known
    }

    // -----------------------------------------------------------------
    // Game operations
    // -----------------------------------------------------------------

    /// Appends a new investor with a full budget.
    pub fn add_player(
        &mut self,
        id: PlayerId,
        name: String,
        avatar: String,
        config: &RoomConfig,
    ) -> Result<(), RoomError> {
        if self.players.len() >= config.max_players {
            return Err(RoomError::RoomFull(self.code.clone(), config.max_players));
        }
        self.players
            .push(Player::new(id, name, avatar, config.starting_budget));
        self.join_group(id);
        Ok(())
    }

    /// Shuffles the player list and deals the impostor role to the first
    /// `impostor_count` players (all of them, if there are fewer).
    ///
    /// Roles from a previous deal are cleared first, so calling this again
    /// reshuffles rather than adding impostors.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R, impostor_count: usize) {
        for player in &mut self.players {
            player.role = Role::Investor;
        }
        self.players.shuffle(rng);
        for player in self.players.iter_mut().take(impostor_count) {
            player.role = Role::Impostor;
        }
        self.started = true;
        self.advance_to(RoomPhase::Active);
    }

    /// Replaces the investments of the player owned by `id` and
    /// recomputes what is left of their budget.
    pub fn invest(
        &mut self,
        id: PlayerId,
        investments: Investments,
        budget: f64,
    ) -> Result<(), RoomError> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| RoomError::PlayerNotFound(self.code.clone()))?;

        player.remaining = budget - investments.values().sum::<f64>();
        player.investments = investments;
        Ok(())
    }

    /// Opens every sector. One-way.
    pub fn unlock_sectors(&mut self) {
        for sector in &mut self.sectors {
            sector.locked = false;
        }
        self.advance_to(RoomPhase::Unlocked);
    }

    /// Scores every player and moves the room to [`RoomPhase::Ended`].
    pub fn end(&mut self, weights: Weights) -> ServerEvent {
        let scores: Vec<ScoreEntry> = self
            .players
            .iter()
            .map(|p| {
                let s = scoring::score(&p.investments, &self.sectors, weights);
                ScoreEntry {
                    name: p.name.clone(),
                    role: p.role,
                    financial: s.financial,
                    green: s.green,
                    total: s.total,
                }
            })
            .collect();
        let winner = scoring::pick_winner(&scores).cloned();
        let impostors = self.impostors().map(|p| p.name.clone()).collect();

        self.advance_to(RoomPhase::Ended);
        ServerEvent::GameEnded {
            scores,
            winner,
            impostors,
        }
    }

    // -----------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------

    pub fn player_views(&self) -> Vec<PlayerView> {
        self.players.iter().map(Player::view).collect()
    }

    pub fn sector_views(&self) -> Vec<SectorView> {
        self.sectors.iter().map(Sector::view).collect()
    }
}
