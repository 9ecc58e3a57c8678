//! Shared types for the marble race game.
//!
//! These types form the data model used across all modules.
//! They are kept free of engine logic so that the ledger, race,
//! payout and scheduler modules can depend on them without cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Number of marbles in every race.
pub const ROSTER_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// Competitors
// ---------------------------------------------------------------------------

/// Identity of a marble, always in `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CompetitorId(u8);

impl CompetitorId {
    /// Validate a raw id coming from the adapter.
    pub fn new(raw: u8) -> Result<Self, GameError> {
        if (1..=ROSTER_SIZE as u8).contains(&raw) {
            Ok(Self(raw))
        } else {
            Err(GameError::UnknownCompetitor(raw))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based slot on the roster.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl TryFrom<u8> for CompetitorId {
    type Error = GameError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<CompetitorId> for u8 {
    fn from(id: CompetitorId) -> Self {
        id.0
    }
}

impl fmt::Display for CompetitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A marble on the roster. The style is purely decorative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Competitor {
    pub id: CompetitorId,
    pub style: &'static str,
}

const STYLES: [&str; ROSTER_SIZE] = [
    "linear-gradient(135deg, #ff6b6b, #ee5a24)",
    "linear-gradient(135deg, #4ecdc4, #00d2d3)",
    "linear-gradient(135deg, #45b7d1, #96ceb4)",
    "linear-gradient(135deg, #f9ca24, #f0932b)",
    "linear-gradient(135deg, #eb4d4b, #6639a6)",
    "linear-gradient(135deg, #6c5ce7, #a29bfe)",
    "linear-gradient(135deg, #00b894, #00cec9)",
    "linear-gradient(135deg, #e17055, #fdcb6e)",
    "linear-gradient(135deg, #fd79a8, #fdcb6e)",
    "linear-gradient(135deg, #636e72, #2d3436)",
];

/// The fixed ten-marble roster, ordered by id.
pub fn roster() -> Vec<Competitor> {
    STYLES
        .iter()
        .enumerate()
        .map(|(i, style)| Competitor {
            id: CompetitorId(i as u8 + 1),
            style,
        })
        .collect()
}

impl fmt::Display for Competitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Marble {}", self.id)
    }
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// The scheduler's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Betting,
    Racing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Betting => write!(f, "Betting"),
            Phase::Racing => write!(f, "Racing"),
        }
    }
}

/// English ordinal for a finish position (1st, 2nd, 3rd, 4th, ..., 11th, 12th, 13th, 21st).
pub fn ordinal(position: usize) -> String {
    let suffix = match (position % 10, position % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{position}{suffix}")
}

// ---------------------------------------------------------------------------
// Race results
// ---------------------------------------------------------------------------

/// One competitor's finish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placing {
    pub competitor: CompetitorId,
    /// 1-based finish position.
    pub position: usize,
    /// Progress along the track when the race ended.
    pub progress: f64,
}

impl fmt::Display for Placing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Marble {} ({:.1})",
            ordinal(self.position),
            self.competitor,
            self.progress
        )
    }
}

/// Ranked outcome of a single race. Placings are ordered by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub race_id: Uuid,
    pub placings: Vec<Placing>,
    pub finished_at: DateTime<Utc>,
}

impl RaceResult {
    /// Build a result from competitors listed in finishing order.
    /// Progress values are filled in descending order so the ranking stays consistent.
    pub fn from_order(order: &[CompetitorId]) -> Self {
        let placings = order
            .iter()
            .enumerate()
            .map(|(i, &competitor)| Placing {
                competitor,
                position: i + 1,
                progress: (order.len() - i) as f64,
            })
            .collect();
        Self {
            race_id: Uuid::new_v4(),
            placings,
            finished_at: Utc::now(),
        }
    }

    pub fn position_of(&self, competitor: CompetitorId) -> Option<usize> {
        self.placings
            .iter()
            .find(|p| p.competitor == competitor)
            .map(|p| p.position)
    }

    pub fn winner(&self) -> Option<CompetitorId> {
        self.placings.first().map(|p| p.competitor)
    }

    /// The top three finishers.
    pub fn podium(&self) -> &[Placing] {
        &self.placings[..self.placings.len().min(3)]
    }
}

impl fmt::Display for RaceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.placings.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join(" | "))
    }
}

/// Snapshot of every lane after one race tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceFrame {
    pub elapsed_ms: u64,
    /// Progress per competitor, in roster order.
    pub progress: Vec<(CompetitorId, f64)>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Validation failures reported back to the adapter. None of them are fatal
/// and none of them leave state partially applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("You can select maximum {limit} marbles")]
    SelectionLimitExceeded { limit: usize },

    #[error("Total bet ({total}) exceeds available gems ({balance})")]
    InsufficientBalance { total: u64, balance: u64 },

    #[error("Marble {0} is not selected")]
    NotSelected(CompetitorId),

    #[error("Unknown marble: {0}")]
    UnknownCompetitor(u8),

    #[error("Bets are locked for the running race")]
    LedgerLocked,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
