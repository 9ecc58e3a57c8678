//! Events emitted by the game engine and their routing to a presenter.

use serde::Serialize;
use uuid::Uuid;

use super::ledger::BetLedger;
use super::payout::PayoutSummary;
use crate::presenter::Presenter;
use crate::types::{Phase, RaceFrame, RaceResult};

/// What the adapter needs to draw the bet panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerView {
    pub phase: Phase,
    pub balance: u64,
    /// The ledger currently accepting edits.
    pub ledger: BetLedger,
    /// True while the edits go to the next race.
    pub for_next_race: bool,
    pub status: String,
}

/// A discrete change in game state.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Ledger(LedgerView),
    Countdown { phase: Phase, seconds_left: u32 },
    /// A race began; the scheduler starts its ticker on this.
    RaceStarted { race_id: Uuid },
    RaceFrame(RaceFrame),
    Results(RaceResult),
    Payout(PayoutSummary),
    /// Non-fatal message for the player.
    Error(String),
}

impl GameEvent {
    /// Forward the event to the matching presenter callback.
    pub fn dispatch(&self, presenter: &mut dyn Presenter) {
        match self {
            GameEvent::Ledger(view) => presenter.render_ledger(view),
            GameEvent::Countdown { phase, seconds_left } => {
                presenter.render_countdown(*phase, *seconds_left)
            }
            GameEvent::RaceStarted { .. } => {}
            GameEvent::RaceFrame(frame) => presenter.render_race_frame(frame),
            GameEvent::Results(result) => presenter.render_results(result),
            GameEvent::Payout(summary) => presenter.render_payout(summary),
            GameEvent::Error(message) => presenter.report_error(message),
        }
    }
}
