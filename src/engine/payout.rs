//! Payout calculator: turns a race result and a ledger into winnings.
//!
//! Podium positions pay a fixed multiple of the wager (1st ×3, 2nd ×2,
//! 3rd ×1); everything below the podium pays nothing. Crediting the
//! balance is left to the caller.

use serde::Serialize;
use std::fmt;

use super::ledger::BetLedger;
use crate::types::{ordinal, CompetitorId, RaceResult};

/// Multiplier paid for a finish position.
pub fn multiplier_for(position: usize) -> u64 {
    match position {
        1 => 3,
        2 => 2,
        3 => 1,
        _ => 0,
    }
}

/// `credit - debit` as a signed amount, saturating at the `i64` bounds.
pub fn net_amount(credit: u64, debit: u64) -> i64 {
    let credit = i64::try_from(credit).unwrap_or(i64::MAX);
    let debit = i64::try_from(debit).unwrap_or(i64::MAX);
    credit.saturating_sub(debit)
}

/// One paying bet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutDetail {
    pub competitor: CompetitorId,
    pub position: usize,
    pub wager: u64,
    pub multiplier: u64,
    pub winnings: u64,
}

impl fmt::Display for PayoutDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Marble {} ({}): {} × {} = {} gems",
            self.competitor,
            ordinal(self.position),
            self.wager,
            self.multiplier,
            self.winnings
        )
    }
}

/// Outcome of a race for the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutSummary {
    /// Paying bets only, in finishing order.
    pub details: Vec<PayoutDetail>,
    pub total_bet: u64,
    pub total_winnings: u64,
    pub net_result: i64,
}

impl PayoutSummary {
    pub fn is_win(&self) -> bool {
        self.net_result > 0
    }
}

impl fmt::Display for PayoutSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Payout Summary")?;
        if self.details.is_empty() {
            writeln!(f, "No winning positions")?;
        }
        for detail in &self.details {
            writeln!(f, "{detail}")?;
        }
        writeln!(f, "Total Bet: -{} gems", self.total_bet)?;
        writeln!(f, "Total Winnings: +{} gems", self.total_winnings)?;
        match self.net_result {
            n if n > 0 => write!(f, "Net Result: +{n} gems"),
            n if n < 0 => write!(f, "Net Result: {n} gems"),
            _ => write!(f, "Net Result: Break Even"),
        }
    }
}

pub struct PayoutCalculator;

impl PayoutCalculator {
    /// Compute winnings for every selected marble that made the podium.
    pub fn compute(result: &RaceResult, ledger: &BetLedger) -> PayoutSummary {
        let details: Vec<PayoutDetail> = result
            .placings
            .iter()
            .filter_map(|placing| {
                let wager = ledger.wager(placing.competitor)?;
                let multiplier = multiplier_for(placing.position);
                let winnings = wager.saturating_mul(multiplier);
                (winnings > 0).then_some(PayoutDetail {
                    competitor: placing.competitor,
                    position: placing.position,
                    wager,
                    multiplier,
                    winnings,
                })
            })
            .collect();

        let total_winnings = details
            .iter()
            .fold(0u64, |acc, d| acc.saturating_add(d.winnings));
        let total_bet = ledger.total();

        PayoutSummary {
            details,
            total_bet,
            total_winnings,
            net_result: net_amount(total_winnings, total_bet),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
