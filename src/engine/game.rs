//! Game engine: phase state machine tying ledgers, races and payouts together.
//!
//! The engine owns all game state and never touches a clock. The scheduler
//! feeds it countdown ticks (one per second) and race ticks (one per race
//! step); user input arrives through the ledger methods. Every call returns
//! the [`GameEvent`]s the presenter should render.
//!
//! Cycle:
//! 1. **Betting**: edits go to the current ledger. When the countdown
//!    expires the ledger is locked, the stake is debited and a race starts.
//! 2. **Racing**: edits go to the pending ledger for the next race. When
//!    the race concludes the locked ledger is paid out. When the countdown
//!    expires the pending ledger becomes the current one and betting reopens.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::mem;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::accountant::{Accountant, SessionStats, StakeOutcome};
use super::events::{GameEvent, LedgerView};
use super::ledger::{BetLedger, LedgerLimits};
use super::payout::PayoutCalculator;
use super::race::{RaceEngine, RaceSimulation};
use crate::config::{AppConfig, PhaseConfig};
use crate::types::{roster, Competitor, CompetitorId, GameError, Phase, RaceResult};

// ---------------------------------------------------------------------------
// Phase state
// ---------------------------------------------------------------------------

/// Current phase and its countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseState {
    phase: Phase,
    seconds_left: u32,
    betting_secs: u32,
    racing_secs: u32,
}

impl PhaseState {
    pub fn new(config: &PhaseConfig) -> Self {
        Self {
            phase: Phase::Betting,
            seconds_left: config.betting_secs,
            betting_secs: config.betting_secs,
            racing_secs: config.racing_secs,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    /// Fixed length of a phase.
    pub fn duration_of(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Betting => self.betting_secs,
            Phase::Racing => self.racing_secs,
        }
    }

    /// Count down one second. Returns true when the phase has expired.
    pub fn tick(&mut self) -> bool {
        self.seconds_left = self.seconds_left.saturating_sub(1);
        self.seconds_left == 0
    }

    /// Enter `phase` with a full countdown.
    pub fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.seconds_left = self.duration_of(phase);
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct ActiveRace {
    sim: RaceSimulation,
    stake: StakeOutcome,
}

pub struct GameEngine {
    phase: PhaseState,
    limits: LedgerLimits,
    /// Ledger of the race being bet on (Betting) or being run (Racing).
    current: BetLedger,
    /// Ledger for the next race, editable while Racing.
    pending: BetLedger,
    accountant: Accountant,
    roster: Vec<Competitor>,
    race_engine: RaceEngine,
    race_duration: Duration,
    race: Option<ActiveRace>,
    last_result: Option<RaceResult>,
    rng: StdRng,
    started: bool,
}

impl GameEngine {
    pub fn new(config: &AppConfig, accountant: Accountant) -> Self {
        Self::with_rng(config, accountant, StdRng::from_entropy())
    }

    /// Build an engine with a caller-supplied RNG (seeded in tests).
    pub fn with_rng(config: &AppConfig, accountant: Accountant, rng: StdRng) -> Self {
        let limits = LedgerLimits {
            max_selections: config.game.max_selections,
            default_wager: config.game.default_wager,
        };
        Self {
            phase: PhaseState::new(&config.phases),
            limits,
            current: BetLedger::new(limits),
            pending: BetLedger::new(limits),
            accountant,
            roster: roster(),
            race_engine: RaceEngine::new(config.race.clone()),
            race_duration: config.phases.race_duration(),
            race: None,
            last_result: None,
            rng,
            started: false,
        }
    }

    // -- Accessors ---------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase.phase()
    }

    pub fn seconds_left(&self) -> u32 {
        self.phase.seconds_left()
    }

    pub fn balance(&self) -> u64 {
        self.accountant.balance()
    }

    pub fn stats(&self) -> &SessionStats {
        self.accountant.stats()
    }

    pub fn current_ledger(&self) -> &BetLedger {
        &self.current
    }

    pub fn pending_ledger(&self) -> &BetLedger {
        &self.pending
    }

    /// The ledger user edits apply to in the current phase.
    pub fn editable_ledger(&self) -> &BetLedger {
        match self.phase() {
            Phase::Betting => &self.current,
            Phase::Racing => &self.pending,
        }
    }

    pub fn active_race_id(&self) -> Option<Uuid> {
        self.race.as_ref().map(|r| r.sim.race_id())
    }

    pub fn last_result(&self) -> Option<&RaceResult> {
        self.last_result.as_ref()
    }

    pub fn ledger_view(&self) -> LedgerView {
        let ledger = self.editable_ledger();
        LedgerView {
            phase: self.phase(),
            balance: self.balance(),
            ledger: ledger.clone(),
            for_next_race: self.phase() == Phase::Racing,
            status: ledger.status_message(self.balance()),
        }
    }

    // -- Lifecycle ---------------------------------------------------------

    /// Open the first betting window. Calling it again only re-renders.
    pub fn start(&mut self) -> Vec<GameEvent> {
        if !self.started {
            self.started = true;
            self.phase.enter(Phase::Betting);
            info!(
                balance = self.balance(),
                betting_secs = self.phase.duration_of(Phase::Betting),
                racing_secs = self.phase.duration_of(Phase::Racing),
                "Game started"
            );
        }
        vec![self.countdown_event(), GameEvent::Ledger(self.ledger_view())]
    }

    /// One second of the phase countdown.
    pub fn tick_countdown(&mut self) -> Vec<GameEvent> {
        if !self.started {
            debug!("Countdown tick before start, ignoring");
            return Vec::new();
        }

        let mut events = Vec::new();
        if !self.phase.tick() {
            events.push(self.countdown_event());
            return events;
        }

        match self.phase() {
            Phase::Betting => self.begin_race(&mut events),
            Phase::Racing => {
                if let Some(active) = self.race.as_mut() {
                    let result = active.sim.force_finish();
                    self.finish_race(result, &mut events);
                }
                self.begin_betting(&mut events);
            }
        }
        events
    }

    /// One step of the running race. Ignored when no race is running.
    pub fn tick_race(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let Some(active) = self.race.as_mut() else {
            debug!("Race tick with no race running, ignoring");
            return events;
        };

        let outcome = active.sim.step(&mut self.rng);
        events.push(GameEvent::RaceFrame(active.sim.frame()));
        if let Some(result) = outcome {
            self.finish_race(result, &mut events);
        }
        events
    }

    fn begin_race(&mut self, events: &mut Vec<GameEvent>) {
        if let Some(stale) = self.race.as_mut() {
            warn!(race_id = %stale.sim.race_id(), "Previous race still running, finishing it first");
            let result = stale.sim.force_finish();
            self.finish_race(result, events);
        }

        self.phase.enter(Phase::Racing);
        events.push(self.countdown_event());

        self.current.lock();
        let total = self.current.total();
        let stake = self.accountant.commit_stake(total);
        if let StakeOutcome::Skipped { total, balance } = stake {
            events.push(GameEvent::Error(
                GameError::InsufficientBalance { total, balance }.to_string(),
            ));
        }

        let sim = self.race_engine.start(&self.roster, self.race_duration);
        let race_id = sim.race_id();
        info!(
            race_id = %race_id,
            marbles = self.current.len(),
            total_bet = total,
            debited = stake.debited(),
            balance = self.balance(),
            "Race started"
        );
        self.race = Some(ActiveRace { sim, stake });

        events.push(GameEvent::RaceStarted { race_id });
        events.push(GameEvent::Ledger(self.ledger_view()));
    }

    fn finish_race(&mut self, result: RaceResult, events: &mut Vec<GameEvent>) {
        let Some(active) = self.race.take() else {
            return;
        };

        let payout = PayoutCalculator::compute(&result, &self.current);
        let report = self.accountant.settle(result.race_id, active.stake, &payout);
        info!(
            race_id = %result.race_id,
            winner = ?result.winner().map(CompetitorId::get),
            winnings = payout.total_winnings,
            net = payout.net_result,
            "{report}"
        );

        events.push(GameEvent::Results(result.clone()));
        events.push(GameEvent::Payout(payout));
        self.last_result = Some(result);
        events.push(GameEvent::Ledger(self.ledger_view()));
    }

    fn begin_betting(&mut self, events: &mut Vec<GameEvent>) {
        self.phase.enter(Phase::Betting);
        self.current = mem::replace(&mut self.pending, BetLedger::new(self.limits));
        debug!(
            carried = self.current.len(),
            total = self.current.total(),
            "Betting window opened"
        );
        events.push(self.countdown_event());
        events.push(GameEvent::Ledger(self.ledger_view()));
    }

    fn countdown_event(&self) -> GameEvent {
        GameEvent::Countdown {
            phase: self.phase(),
            seconds_left: self.seconds_left(),
        }
    }

    // -- User input --------------------------------------------------------

    pub fn select(&mut self, raw: u8) -> Result<Vec<GameEvent>, GameError> {
        let id = CompetitorId::new(raw)?;
        self.editable_mut().select(id)?;
        Ok(vec![GameEvent::Ledger(self.ledger_view())])
    }

    pub fn deselect(&mut self, raw: u8) -> Result<Vec<GameEvent>, GameError> {
        let id = CompetitorId::new(raw)?;
        self.editable_mut().deselect(id)?;
        Ok(vec![GameEvent::Ledger(self.ledger_view())])
    }

    /// Select if unselected, deselect otherwise (a click on a marble).
    pub fn toggle(&mut self, raw: u8) -> Result<Vec<GameEvent>, GameError> {
        let id = CompetitorId::new(raw)?;
        if self.editable_ledger().is_selected(id) {
            self.deselect(raw)
        } else {
            self.select(raw)
        }
    }

    pub fn set_wager(&mut self, raw: u8, amount: i64) -> Result<Vec<GameEvent>, GameError> {
        let id = CompetitorId::new(raw)?;
        let balance = self.balance();
        self.editable_mut().set_wager(id, amount, balance)?;
        Ok(vec![GameEvent::Ledger(self.ledger_view())])
    }

    pub fn set_wager_text(&mut self, raw: u8, text: &str) -> Result<Vec<GameEvent>, GameError> {
        let id = CompetitorId::new(raw)?;
        let balance = self.balance();
        self.editable_mut().set_wager_text(id, text, balance)?;
        Ok(vec![GameEvent::Ledger(self.ledger_view())])
    }

    /// Clear the ledger that belongs to the current phase.
    pub fn reset_bets(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.editable_mut().clear()?;
        debug!(phase = %self.phase(), "Bets reset");
        Ok(vec![GameEvent::Ledger(self.ledger_view())])
    }

    /// Check the editable ledger against the balance (the confirm button).
    pub fn confirm(&mut self) -> Result<Vec<GameEvent>, GameError> {
        let total = self.editable_ledger().validate(self.balance())?;
        debug!(total, phase = %self.phase(), "Bets confirmed");
        Ok(vec![GameEvent::Ledger(self.ledger_view())])
    }

    fn editable_mut(&mut self) -> &mut BetLedger {
        match self.phase.phase() {
            Phase::Betting => &mut self.current,
            Phase::Racing => &mut self.pending,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
