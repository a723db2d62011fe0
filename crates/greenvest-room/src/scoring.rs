//! End-of-game scoring.

use greenvest_protocol::{Investments, ScoreEntry};

use crate::room::Sector;

/// A player's score split into its two components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub financial: f64,
    pub green: f64,
    pub total: f64,
}

/// Relative weight of each score component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub financial: f64,
    pub green: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            financial: 0.5,
            green: 0.5,
        }
    }
}

/// Scores one investment map against a room's sectors.
///
/// Only sectors present in the room count; amounts filed under unknown
/// names are ignored. Amounts are used as-is, negatives included.
pub fn score(investments: &Investments, sectors: &[Sector], weights: Weights) -> Score {
    let mut financial = 0.0;
    let mut green = 0.0;
    for sector in sectors {
        if let Some(&amount) = investments.get(&sector.name) {
            financial += amount * sector.return_rate;
            green += amount * sector.green_score;
        }
    }
    Score {
        financial,
        green,
        total: weights.financial * financial + weights.green * green,
    }
}

/// Picks the winner: the first entry with the highest total.
///
/// Later entries replace the current best only when strictly greater, so
/// ties go to whoever comes first in player-list order.
pub fn pick_winner(scores: &[ScoreEntry]) -> Option<&ScoreEntry> {
    scores
        .iter()
        .reduce(|best, entry| if entry.total > best.total { entry } else { best })
}
