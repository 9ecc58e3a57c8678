//! Presentation boundary.
//!
//! Defines the `Presenter` trait the engine renders through and provides
//! the console implementation used by the binary:
//! - `console`: tracing-based renderer plus a line-based command parser

pub mod console;

use crate::engine::events::LedgerView;
use crate::engine::payout::PayoutSummary;
use crate::types::{Phase, RaceFrame, RaceResult};

/// Everything the core asks an adapter to show.
///
/// Implementors own their output surface; the engine never waits on them.
#[cfg_attr(test, mockall::automock)]
pub trait Presenter: Send {
    /// Selections, wagers, balance and status line of the editable ledger.
    fn render_ledger(&mut self, view: &LedgerView);

    /// Seconds remaining in the current phase.
    fn render_countdown(&mut self, phase: Phase, seconds_left: u32);

    /// Lane positions after one race step.
    fn render_race_frame(&mut self, frame: &RaceFrame);

    /// Final standings of a race.
    fn render_results(&mut self, result: &RaceResult);

    /// Winnings and net result of a race.
    fn render_payout(&mut self, summary: &PayoutSummary);

    /// Non-fatal message for the player.
    fn report_error(&mut self, message: &str);
}
