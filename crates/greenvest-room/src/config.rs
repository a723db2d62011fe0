//! Room configuration and phase machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scoring::Weights;

// ---------------------------------------------------------------------------
// SectorSpec
// ---------------------------------------------------------------------------

/// One entry of the sector catalogue every new room is seeded with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorSpec {
    pub name: String,
    pub return_rate: f64,
    pub green_score: f64,
}

impl SectorSpec {
    pub fn new(name: impl Into<String>, return_rate: f64, green_score: f64) -> Self {
        Self {
            name: name.into(),
            return_rate,
            green_score,
        }
    }
}

/// The three sectors of the standard game.
pub fn default_sectors() -> Vec<SectorSpec> {
    vec![
        SectorSpec::new("Railways Electrification", 8.0, 3.0),
        SectorSpec::new("Expressways (DMEDL)", 10.0, 4.0),
        SectorSpec::new("Solar Parks (Rewa)", 7.0, 5.0),
    ]
}

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room the coordinator creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Maximum players (teams) per room. The host does not count.
    pub max_players: usize,

    /// How many players are dealt the impostor role at game start.
    pub impostor_count: usize,

    /// Budget each player starts with; `remaining` is measured against it.
    pub starting_budget: f64,

    /// Weight of the financial return in a player's total score.
    pub financial_weight: f64,

    /// Weight of the green score in a player's total score.
    pub green_weight: f64,

    /// Sectors seeded into every new room, in display order.
    pub sectors: Vec<SectorSpec>,

    /// Rooms with no activity for this long are evicted. `None` keeps
    /// rooms for the life of the process.
    pub idle_ttl: Option<Duration>,

    /// How often the coordinator looks for idle rooms.
    pub sweep_interval: Duration,
}

impl RoomConfig {
    /// The score weights as used by [`crate::scoring::score`].
    pub fn weights(&self) -> Weights {
        Weights {
            financial: self.financial_weight,
            green: self.green_weight,
        }
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            impostor_count: 2,
            starting_budget: 100.0,
            financial_weight: 0.5,
            green_weight: 0.5,
            sectors: default_sectors(),
            idle_ttl: Some(Duration::from_secs(2 * 60 * 60)),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomPhase
// ---------------------------------------------------------------------------

/// Where a room is in its game.
///
/// ```text
/// Lobby → Active → Unlocked → Ended
/// ```
///
/// - **Lobby**: created, players joining.
/// - **Active**: `startGame` dealt roles; sectors still locked.
/// - **Unlocked**: sectors revealed, investing open.
/// - **Ended**: scores announced. The room stays resident until evicted.
///
/// The phase is recorded, not enforced: events arriving "out of phase"
/// are still applied, and a room never moves backwards (phases are
/// ordered, and a room only ever takes the later of two).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoomPhase {
    Lobby,
    Active,
    Unlocked,
    Ended,
}

impl std::fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Active => write!(f, "Active"),
            Self::Unlocked => write!(f, "Unlocked"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}
