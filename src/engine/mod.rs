//! Core engine: bet ledgers, race simulation, payouts, and the phase cycle.

pub mod accountant;
pub mod events;
pub mod game;
pub mod ledger;
pub mod payout;
pub mod race;
pub mod scheduler;
