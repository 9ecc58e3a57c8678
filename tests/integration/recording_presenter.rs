//! Recording presenter for integration testing.
//!
//! Keeps every callback the core makes, in order, so tests can assert on
//! what the player would have seen. All state is in-memory.

use marble_race::engine::events::LedgerView;
use marble_race::engine::payout::PayoutSummary;
use marble_race::presenter::Presenter;
use marble_race::types::{Phase, RaceFrame, RaceResult};

/// One presenter callback.
#[derive(Debug, Clone)]
pub enum Rendered {
    Ledger(LedgerView),
    Countdown(Phase, u32),
    Frame(RaceFrame),
    Results(RaceResult),
    Payout(PayoutSummary),
    Error(String),
}

#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub calls: Vec<Rendered>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<&RaceResult> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Rendered::Results(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn payouts(&self) -> Vec<&PayoutSummary> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Rendered::Payout(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Rendered::Error(e) => Some(e.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn frame_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Rendered::Frame(_)))
            .count()
    }

    /// Phases in the order they were entered.
    pub fn phase_entries(&self) -> Vec<Phase> {
        let mut phases: Vec<Phase> = Vec::new();
        for call in &self.calls {
            if let Rendered::Countdown(phase, _) = call {
                if phases.last() != Some(phase) {
                    phases.push(*phase);
                }
            }
        }
        phases
    }
}

impl Presenter for RecordingPresenter {
    fn render_ledger(&mut self, view: &LedgerView) {
        self.calls.push(Rendered::Ledger(view.clone()));
    }

    fn render_countdown(&mut self, phase: Phase, seconds_left: u32) {
        self.calls.push(Rendered::Countdown(phase, seconds_left));
    }

    fn render_race_frame(&mut self, frame: &RaceFrame) {
        self.calls.push(Rendered::Frame(frame.clone()));
    }

    fn render_results(&mut self, result: &RaceResult) {
        self.calls.push(Rendered::Results(result.clone()));
    }

    fn render_payout(&mut self, summary: &PayoutSummary) {
        self.calls.push(Rendered::Payout(summary.clone()));
    }

    fn report_error(&mut self, message: &str) {
        self.calls.push(Rendered::Error(message.to_string()));
    }
}
