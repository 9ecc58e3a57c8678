//! Console adapter.
//!
//! Renders game output through `tracing` (human-readable or JSON payloads)
//! and turns lines typed on stdin into [`Command`]s.

use std::io::BufRead;
use tracing::{debug, info, warn};

use super::Presenter;
use crate::engine::events::LedgerView;
use crate::engine::payout::PayoutSummary;
use crate::engine::scheduler::{Command, GameHandle};
use crate::types::{ordinal, Phase, RaceFrame, RaceResult};

pub const HELP: &str = "commands: select <n> | deselect <n> | toggle <n> | bet <n> <gems> | reset | confirm";

// ---------------------------------------------------------------------------
// Presenter
// ---------------------------------------------------------------------------

pub struct ConsolePresenter {
    json: bool,
    /// Log a race frame every this many ticks.
    frame_every: u64,
    frames: u64,
}

impl ConsolePresenter {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            frame_every: 20,
            frames: 0,
        }
    }

    fn payload<T: serde::Serialize>(value: &T) -> String {
        serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
    }
}

impl Presenter for ConsolePresenter {
    fn render_ledger(&mut self, view: &LedgerView) {
        if self.json {
            info!(ledger = %Self::payload(view), "Ledger");
            return;
        }
        let bets: Vec<String> = view
            .ledger
            .wagers()
            .map(|(id, wager)| format!("#{id}={wager}"))
            .collect();
        info!(
            phase = %view.phase,
            next_race = view.for_next_race,
            balance = view.balance,
            bets = %bets.join(" "),
            "{}",
            view.status
        );
    }

    fn render_countdown(&mut self, phase: Phase, seconds_left: u32) {
        if seconds_left <= 3 || seconds_left % 5 == 0 {
            info!(%phase, seconds_left, "Countdown");
        } else {
            debug!(%phase, seconds_left, "Countdown");
        }
        if phase == Phase::Betting {
            self.frames = 0;
        }
    }

    fn render_race_frame(&mut self, frame: &RaceFrame) {
        self.frames += 1;
        if self.frames % self.frame_every != 0 {
            return;
        }
        if let Some((leader, progress)) = frame
            .progress
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
        {
            debug!(
                elapsed_ms = frame.elapsed_ms,
                leader = %leader,
                progress = format!("{progress:.1}"),
                "Racing in progress..."
            );
        }
    }

    fn render_results(&mut self, result: &RaceResult) {
        if self.json {
            info!(race_id = %result.race_id, result = %Self::payload(result), "Race finished!");
            return;
        }
        info!(race_id = %result.race_id, "Race finished!");
        for placing in result.podium() {
            info!("{} Marble {}", ordinal(placing.position), placing.competitor);
        }
        debug!(standings = %result, "Full standings");
    }

    fn render_payout(&mut self, summary: &PayoutSummary) {
        if self.json {
            info!(payout = %Self::payload(summary), "Payout");
            return;
        }
        for line in summary.to_string().lines() {
            info!("{line}");
        }
    }

    fn report_error(&mut self, message: &str) {
        warn!("{message}");
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Parse one line of console input.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().ok_or_else(|| HELP.to_string())?;
    let mut marble = || -> Result<u8, String> {
        let raw = parts.next().ok_or_else(|| format!("'{verb}' needs a marble number"))?;
        raw.parse::<u8>().map_err(|_| format!("Invalid marble: {raw}"))
    };

    let command = match verb.to_lowercase().as_str() {
        "select" | "s" => Command::Select(marble()?),
        "deselect" | "d" => Command::Deselect(marble()?),
        "toggle" | "t" => Command::Toggle(marble()?),
        "bet" | "b" => {
            let id = marble()?;
            let amount = parts.next().unwrap_or("");
            Command::SetWagerText(id, amount.to_string())
        }
        "reset" | "r" => Command::ResetBets,
        "confirm" | "c" => Command::Confirm,
        _ => return Err(format!("Unknown command '{verb}'. {HELP}")),
    };
    Ok(command)
}

/// Read stdin on a dedicated thread and forward parsed commands.
///
/// The thread ends when stdin closes or the scheduler stops accepting input.
pub fn spawn_stdin_reader(handle: GameHandle) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "Failed to read stdin");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(command) => {
                        if !handle.blocking_send(command) {
                            break;
                        }
                    }
                    Err(message) => warn!("{message}"),
                }
            }
            debug!("stdin reader stopped");
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("select 3"), Ok(Command::Select(3)));
        assert_eq!(parse_command("  S 10 "), Ok(Command::Select(10)));
        assert_eq!(parse_command("deselect 2"), Ok(Command::Deselect(2)));
        assert_eq!(parse_command("t 5"), Ok(Command::Toggle(5)));
        assert_eq!(parse_command("reset"), Ok(Command::ResetBets));
        assert_eq!(parse_command("confirm"), Ok(Command::Confirm));
    }

    #[test]
    fn test_parse_bet_keeps_raw_amount() {
        assert_eq!(
            parse_command("bet 3 50"),
            Ok(Command::SetWagerText(3, "50".to_string()))
        );
        // Amount validation is the ledger's job.
        assert_eq!(
            parse_command("bet 3 lots"),
            Ok(Command::SetWagerText(3, "lots".to_string()))
        );
        assert_eq!(parse_command("b 3"), Ok(Command::SetWagerText(3, String::new())));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("").is_err());
        assert_eq!(parse_command("select"), Err("'select' needs a marble number".to_string()));
        assert_eq!(parse_command("select x"), Err("Invalid marble: x".to_string()));
        assert!(parse_command("dance 3").unwrap_err().starts_with("Unknown command 'dance'"));
    }

    #[test]
    fn test_presenter_handles_full_race() {
        use crate::engine::ledger::BetLedger;
        use crate::types::CompetitorId;

        let order: Vec<_> = (1..=10).map(|n| CompetitorId::new(n).unwrap()).collect();
        let result = RaceResult::from_order(&order);
        let view = LedgerView {
            phase: Phase::Betting,
            balance: 1000,
            ledger: BetLedger::default(),
            for_next_race: false,
            status: "Select marbles and place bets to start racing!".to_string(),
        };

        for json in [false, true] {
            let mut presenter = ConsolePresenter::new(json);
            presenter.render_ledger(&view);
            presenter.render_countdown(Phase::Racing, 15);
            for _ in 0..40 {
                presenter.render_race_frame(&RaceFrame {
                    elapsed_ms: 50,
                    progress: vec![(order[0], 3.0)],
                });
            }
            assert_eq!(presenter.frames, 40);
            presenter.render_results(&result);
            presenter.render_countdown(Phase::Betting, 15);
            assert_eq!(presenter.frames, 0);
        }
    }
}
