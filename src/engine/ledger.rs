//! Bet ledger: per-race marble selections and their wagers.
//!
//! A ledger is edited while its phase is open, locked when the race it
//! belongs to starts, and thrown away once that race has paid out.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::types::{CompetitorId, GameError};

/// Limits applied to every ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerLimits {
    pub max_selections: usize,
    pub default_wager: u64,
}

impl Default for LedgerLimits {
    fn default() -> Self {
        Self {
            max_selections: 9,
            default_wager: 10,
        }
    }
}

/// Selections for one race cycle. Every selected marble has exactly one
/// wager, so the selection is the key set of `wagers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BetLedger {
    wagers: BTreeMap<CompetitorId, u64>,
    #[serde(skip)]
    limits: LedgerLimits,
    locked: bool,
}

impl Default for BetLedger {
    fn default() -> Self {
        Self::new(LedgerLimits::default())
    }
}

impl BetLedger {
    pub fn new(limits: LedgerLimits) -> Self {
        Self {
            wagers: BTreeMap::new(),
            limits,
            locked: false,
        }
    }

    /// Back a marble with the default wager. Re-selecting is a no-op.
    pub fn select(&mut self, id: CompetitorId) -> Result<(), GameError> {
        self.ensure_unlocked()?;
        if self.wagers.contains_key(&id) {
            return Ok(());
        }
        if self.wagers.len() >= self.limits.max_selections {
            return Err(GameError::SelectionLimitExceeded {
                limit: self.limits.max_selections,
            });
        }
        self.wagers.insert(id, self.limits.default_wager);
        debug!(marble = %id, wager = self.limits.default_wager, "Marble selected");
        Ok(())
    }

    /// Drop a marble and its wager. Absent marbles are ignored.
    pub fn deselect(&mut self, id: CompetitorId) -> Result<(), GameError> {
        self.ensure_unlocked()?;
        if self.wagers.remove(&id).is_some() {
            debug!(marble = %id, "Marble deselected");
        }
        Ok(())
    }

    /// Store `amount` clamped to `[1, balance]`; returns the stored wager.
    ///
    /// The lower bound wins when the balance is zero.
    pub fn set_wager(&mut self, id: CompetitorId, amount: i64, balance: u64) -> Result<u64, GameError> {
        self.ensure_unlocked()?;
        let slot = self.wagers.get_mut(&id).ok_or(GameError::NotSelected(id))?;
        let upper = i64::try_from(balance).unwrap_or(i64::MAX);
        let clamped = amount.min(upper).max(1) as u64;
        *slot = clamped;
        Ok(clamped)
    }

    /// Like [`set_wager`](Self::set_wager) for raw user text. Only the
    /// leading integer counts; text without one counts as zero, which the
    /// clamp turns into 1.
    pub fn set_wager_text(&mut self, id: CompetitorId, text: &str, balance: u64) -> Result<u64, GameError> {
        self.set_wager(id, parse_wager_text(text), balance)
    }

    pub fn wager(&self, id: CompetitorId) -> Option<u64> {
        self.wagers.get(&id).copied()
    }

    pub fn is_selected(&self, id: CompetitorId) -> bool {
        self.wagers.contains_key(&id)
    }

    /// Selected marbles in ascending id order.
    pub fn selection(&self) -> impl Iterator<Item = CompetitorId> + '_ {
        self.wagers.keys().copied()
    }

    pub fn wagers(&self) -> impl Iterator<Item = (CompetitorId, u64)> + '_ {
        self.wagers.iter().map(|(&id, &w)| (id, w))
    }

    pub fn len(&self) -> usize {
        self.wagers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wagers.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.wagers.values().fold(0u64, |acc, &w| acc.saturating_add(w))
    }

    pub fn clear(&mut self) -> Result<(), GameError> {
        self.ensure_unlocked()?;
        self.wagers.clear();
        Ok(())
    }

    /// Commit-time check of the total against the balance.
    pub fn validate(&self, balance: u64) -> Result<u64, GameError> {
        let total = self.total();
        if total > balance {
            return Err(GameError::InsufficientBalance { total, balance });
        }
        Ok(total)
    }

    /// Freeze the ledger for the race it was composed for.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Status line shown next to the ledger.
    pub fn status_message(&self, balance: u64) -> String {
        let total = self.total();
        if self.is_empty() {
            "Select marbles and place bets to start racing!".to_string()
        } else if total > balance {
            format!("Total bet ({total}) exceeds available gems ({balance})")
        } else if total == 0 {
            "Place at least 1 gem bet to start racing".to_string()
        } else {
            format!("Ready to race! Total bet: {total} gems")
        }
    }

    fn ensure_unlocked(&self) -> Result<(), GameError> {
        if self.locked {
            Err(GameError::LedgerLocked)
        } else {
            Ok(())
        }
    }
}

/// Lenient integer parse of a wager typed by the player.
///
/// Reads an optional sign and the leading digits ("50gems" is 50, "12.5" is
/// 12). Out-of-range values saturate so the balance clamp still applies.
/// Returns 0 when there are no leading digits.
pub fn parse_wager_text(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut value: i64 = 0;
    for digit in rest.bytes().take_while(u8::is_ascii_digit) {
        let d = i64::from(digit - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(d)
        } else {
            value.saturating_mul(10).saturating_add(d)
        };
    }
    value
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
