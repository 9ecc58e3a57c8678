//! Phase scheduler: drives the engine from two timer tasks.
//!
//! A countdown task ticks once per second for the lifetime of the game; a
//! race task ticks every race step while a race runs. Both send [`Tick`]s
//! into a channel drained by a single loop that owns the [`GameEngine`],
//! so the engine is never touched concurrently. Adapter input arrives on a
//! second channel as [`Command`]s.
//!
//! The race task is aborted when its race concludes and before another one
//! is spawned. Race ticks carry the race id, and ticks for any race other
//! than the active one are dropped.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::GameEvent;
use super::game::GameEngine;
use crate::config::AppConfig;
use crate::presenter::Presenter;
use crate::types::GameError;

const TICK_CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Player input forwarded by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select(u8),
    Deselect(u8),
    Toggle(u8),
    SetWager(u8, i64),
    SetWagerText(u8, String),
    ResetBets,
    Confirm,
}

/// Cloneable sender half handed to the adapter.
#[derive(Debug, Clone)]
pub struct GameHandle {
    tx: mpsc::Sender<Command>,
}

impl GameHandle {
    /// Queue a command. Returns false once the scheduler has stopped.
    pub async fn send(&self, command: Command) -> bool {
        self.tx.send(command).await.is_ok()
    }

    /// Queue a command from a non-async thread.
    pub fn blocking_send(&self, command: Command) -> bool {
        self.tx.blocking_send(command).is_ok()
    }

    pub async fn select(&self, id: u8) -> bool {
        self.send(Command::Select(id)).await
    }

    pub async fn set_wager(&self, id: u8, amount: i64) -> bool {
        self.send(Command::SetWager(id, amount)).await
    }
}

/// Create the command channel connecting an adapter to a scheduler.
pub fn command_channel(capacity: usize) -> (GameHandle, mpsc::Receiver<Command>) {
    let (tx, rx) = mpsc::channel(capacity);
    (GameHandle { tx }, rx)
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tick {
    Countdown,
    Race(Uuid),
}

/// Spawn a task sending `tick` every `period`, first one after `period`.
fn spawn_ticker(period: Duration, tick: Tick, tx: mpsc::Sender<Tick>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        loop {
            interval.tick().await;
            if tx.send(tick).await.is_err() {
                debug!(?tick, "Tick channel closed, ticker stopping");
                break;
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct Scheduler<P: Presenter> {
    engine: GameEngine,
    presenter: P,
    countdown_period: Duration,
    race_period: Duration,
    race_ticker: Option<JoinHandle<()>>,
}

impl<P: Presenter> Scheduler<P> {
    pub fn new(engine: GameEngine, presenter: P, config: &AppConfig) -> Self {
        Self {
            engine,
            presenter,
            countdown_period: Duration::from_secs(1),
            race_period: config.race.tick(),
            race_ticker: None,
        }
    }

    /// Run the game until `shutdown` resolves, then hand back the engine
    /// and presenter. A closed command channel does not stop the game.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        shutdown: impl Future<Output = ()>,
    ) -> (GameEngine, P) {
        let (tick_tx, mut tick_rx) = mpsc::channel(TICK_CHANNEL_CAPACITY);

        let events = self.engine.start();
        self.handle_events(events, &tick_tx);
        let countdown = spawn_ticker(self.countdown_period, Tick::Countdown, tick_tx.clone());

        tokio::pin!(shutdown);
        let mut commands_open = true;

        info!(
            countdown_ms = self.countdown_period.as_millis() as u64,
            race_tick_ms = self.race_period.as_millis() as u64,
            "Scheduler running"
        );

        loop {
            tokio::select! {
                Some(tick) = tick_rx.recv() => self.on_tick(tick, &tick_tx),
                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.on_command(command, &tick_tx),
                    None => {
                        debug!("Command channel closed, continuing without input");
                        commands_open = false;
                    }
                },
                _ = &mut shutdown => {
                    info!("Shutdown signal received.");
                    break;
                }
            }
        }

        countdown.abort();
        self.stop_race_ticker();
        (self.engine, self.presenter)
    }

    fn on_tick(&mut self, tick: Tick, tick_tx: &mpsc::Sender<Tick>) {
        let events = match tick {
            Tick::Countdown => self.engine.tick_countdown(),
            Tick::Race(race_id) => {
                if self.engine.active_race_id() != Some(race_id) {
                    debug!(%race_id, "Stale race tick dropped");
                    return;
                }
                self.engine.tick_race()
            }
        };
        self.handle_events(events, tick_tx);
    }

    fn on_command(&mut self, command: Command, tick_tx: &mpsc::Sender<Tick>) {
        debug!(?command, "Command received");
        let outcome = apply_command(&mut self.engine, command);
        match outcome {
            Ok(events) => self.handle_events(events, tick_tx),
            Err(e) => {
                debug!(error = %e, "Command rejected");
                self.presenter.report_error(&e.to_string());
            }
        }
    }

    fn handle_events(&mut self, events: Vec<GameEvent>, tick_tx: &mpsc::Sender<Tick>) {
        for event in events {
            match &event {
                GameEvent::RaceStarted { race_id } => self.start_race_ticker(*race_id, tick_tx),
                GameEvent::Results(_) => self.stop_race_ticker(),
                _ => {}
            }
            event.dispatch(&mut self.presenter);
        }
    }

    fn start_race_ticker(&mut self, race_id: Uuid, tick_tx: &mpsc::Sender<Tick>) {
        if self.race_ticker.is_some() {
            warn!(%race_id, "Race ticker still pending, clearing it");
            self.stop_race_ticker();
        }
        self.race_ticker = Some(spawn_ticker(
            self.race_period,
            Tick::Race(race_id),
            tick_tx.clone(),
        ));
    }

    fn stop_race_ticker(&mut self) {
        if let Some(handle) = self.race_ticker.take() {
            handle.abort();
        }
    }
}

/// Apply one adapter command to the engine.
pub fn apply_command(engine: &mut GameEngine, command: Command) -> Result<Vec<GameEvent>, GameError> {
    match command {
        Command::Select(id) => engine.select(id),
        Command::Deselect(id) => engine.deselect(id),
        Command::Toggle(id) => engine.toggle(id),
        Command::SetWager(id, amount) => engine.set_wager(id, amount),
        Command::SetWagerText(id, text) => engine.set_wager_text(id, &text),
        Command::ResetBets => engine.reset_bets(),
        Command::Confirm => engine.confirm(),
    }
}
