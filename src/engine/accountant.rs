//! Accountant: the balance, its persistence, and per-session totals.
//!
//! The balance moves exactly twice per race: the locked stake is debited
//! when the race starts and the winnings are credited when it ends. Every
//! movement is written through to the balance store.

use std::fmt;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::payout::{net_amount, PayoutSummary};
use crate::storage::{self, BalanceStore};

// ---------------------------------------------------------------------------
// Stake outcome
// ---------------------------------------------------------------------------

/// What happened to the stake when a race started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeOutcome {
    /// Nothing was wagered.
    Empty,
    /// The stake was taken from the balance.
    Debited(u64),
    /// The stake exceeded the balance; the race runs without a debit.
    Skipped { total: u64, balance: u64 },
}

impl StakeOutcome {
    /// Amount actually taken from the balance.
    pub fn debited(&self) -> u64 {
        match self {
            StakeOutcome::Debited(amount) => *amount,
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Race report
// ---------------------------------------------------------------------------

/// Balance movements for one completed race.
#[derive(Debug, Clone)]
pub struct RaceReport {
    pub race_number: u64,
    pub race_id: Uuid,
    pub stake: StakeOutcome,
    pub total_winnings: u64,
    pub net_result: i64,
    pub balance_after: u64,
}

impl fmt::Display for RaceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Race #{}: staked={} won={} net={:+} balance={}",
            self.race_number,
            self.stake.debited(),
            self.total_winnings,
            self.net_result,
            self.balance_after,
        )
    }
}

// ---------------------------------------------------------------------------
// Session statistics
// ---------------------------------------------------------------------------

/// Running totals since the process started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub races: u64,
    pub total_wagered: u64,
    pub total_winnings: u64,
    pub biggest_win: u64,
    pub skipped_stakes: u64,
}

impl SessionStats {
    pub fn net(&self) -> i64 {
        net_amount(self.total_winnings, self.total_wagered)
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "races={} wagered={} won={} net={:+} biggest_win={}",
            self.races,
            self.total_wagered,
            self.total_winnings,
            self.net(),
            self.biggest_win,
        )
    }
}

// ---------------------------------------------------------------------------
// Accountant
// ---------------------------------------------------------------------------

pub struct Accountant {
    balance: u64,
    store: Box<dyn BalanceStore>,
    stats: SessionStats,
}

impl Accountant {
    /// Restore the balance from `store`, or start from `default`.
    pub fn open(store: Box<dyn BalanceStore>, default: u64) -> Self {
        let balance = storage::load_balance(store.as_ref(), default);
        info!(balance, "Balance loaded");
        Self {
            balance,
            store,
            stats: SessionStats::default(),
        }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Take the locked stake. Skipped (not an error) when it exceeds the balance.
    pub fn commit_stake(&mut self, total: u64) -> StakeOutcome {
        if total == 0 {
            return StakeOutcome::Empty;
        }
        if total > self.balance {
            warn!(
                total,
                balance = self.balance,
                "Stake exceeds balance, race runs without a debit"
            );
            self.stats.skipped_stakes += 1;
            return StakeOutcome::Skipped {
                total,
                balance: self.balance,
            };
        }

        self.balance -= total;
        self.stats.total_wagered = self.stats.total_wagered.saturating_add(total);
        self.persist();
        info!(total, balance = self.balance, "Stake debited");
        StakeOutcome::Debited(total)
    }

    /// Credit the winnings of a finished race and record it. The balance
    /// is saved even when nothing was won.
    pub fn settle(&mut self, race_id: Uuid, stake: StakeOutcome, payout: &PayoutSummary) -> RaceReport {
        let winnings = payout.total_winnings;
        self.balance = self.balance.saturating_add(winnings);
        self.persist();

        self.stats.races += 1;
        self.stats.total_winnings = self.stats.total_winnings.saturating_add(winnings);
        self.stats.biggest_win = self.stats.biggest_win.max(winnings);

        let report = RaceReport {
            race_number: self.stats.races,
            race_id,
            stake,
            total_winnings: winnings,
            net_result: net_amount(winnings, stake.debited()),
            balance_after: self.balance,
        };

        info!(
            race = report.race_number,
            race_id = %race_id,
            staked = stake.debited(),
            won = winnings,
            balance = self.balance,
            "Race settled"
        );

        report
    }

    fn persist(&self) {
        if let Err(e) = storage::save_balance(self.store.as_ref(), self.balance) {
            error!(error = %e, balance = self.balance, "Failed to save balance");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
