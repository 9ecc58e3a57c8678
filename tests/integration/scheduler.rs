//! The scheduler running against paused tokio time.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::oneshot;

use marble_race::config::AppConfig;
use marble_race::engine::accountant::Accountant;
use marble_race::engine::game::GameEngine;
use marble_race::engine::scheduler::{command_channel, Scheduler};
use marble_race::storage::MemoryBalanceStore;
use marble_race::types::{CompetitorId, Phase};

use crate::recording_presenter::RecordingPresenter;

fn config() -> AppConfig {
    AppConfig::parse(
        r#"
[phases]
betting_secs = 3
racing_secs = 2

[race]
tick_ms = 50
"#,
    )
    .unwrap()
}

fn scheduler(store: &MemoryBalanceStore, cfg: &AppConfig) -> Scheduler<RecordingPresenter> {
    let accountant = Accountant::open(Box::new(store.clone()), 1000);
    let engine = GameEngine::with_rng(cfg, accountant, StdRng::seed_from_u64(77));
    Scheduler::new(engine, RecordingPresenter::new(), cfg)
}

#[tokio::test(start_paused = true)]
async fn test_cycles_run_and_settle() {
    let cfg = config();
    let store = MemoryBalanceStore::new();
    let (handle, commands) = command_channel(16);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let run = tokio::spawn(scheduler(&store, &cfg).run(commands, async {
        let _ = stop_rx.await;
    }));

    assert!(handle.select(3).await);
    assert!(handle.set_wager(3, 50).await);

    // Four full cycles of 5 seconds each, stopped mid-betting.
    tokio::time::sleep(Duration::from_millis(21_500)).await;
    stop_tx.send(()).unwrap();
    let (engine, presenter) = run.await.unwrap();

    let results = presenter.results();
    let payouts = presenter.payouts();
    assert_eq!(results.len(), 4);
    assert_eq!(payouts.len(), 4);
    assert_eq!(engine.stats().races, 4);
    assert_eq!(engine.phase(), Phase::Betting);

    // Only the first race carried a bet.
    assert_eq!(payouts[0].total_bet, 50);
    assert!(payouts[1..].iter().all(|p| p.total_bet == 0));
    let winnings: u64 = payouts.iter().map(|p| p.total_winnings).sum();
    assert_eq!(engine.balance(), 1000 - 50 + winnings);
    assert_eq!(store.peek(), Some(engine.balance().to_string()));

    // Roughly one frame per race tick, never frames from two races at once.
    let frames = presenter.frame_count();
    assert!(frames >= 4 * 30, "too few frames: {frames}");
    assert!(frames <= 4 * 40, "too many frames: {frames}");
    assert!(presenter.errors().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_bets_placed_while_racing_apply_next_race() {
    let cfg = config();
    let store = MemoryBalanceStore::new();
    let (handle, commands) = command_channel(16);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let run = tokio::spawn(scheduler(&store, &cfg).run(commands, async {
        let _ = stop_rx.await;
    }));

    // Mid-race of the first cycle.
    tokio::time::sleep(Duration::from_millis(4_000)).await;
    assert!(handle.select(8).await);
    assert!(handle.set_wager(8, 25).await);

    // Into the second race.
    tokio::time::sleep(Duration::from_millis(4_500)).await;
    stop_tx.send(()).unwrap();
    let (engine, presenter) = run.await.unwrap();

    assert_eq!(engine.phase(), Phase::Racing);
    assert_eq!(presenter.payouts()[0].total_bet, 0);
    assert_eq!(engine.current_ledger().wager(CompetitorId::new(8).unwrap()), Some(25));
    assert!(engine.current_ledger().is_locked());
    assert_eq!(engine.balance(), 975 + presenter.payouts()[0].total_winnings);
}

#[tokio::test(start_paused = true)]
async fn test_closed_input_keeps_game_running() {
    let cfg = config();
    let store = MemoryBalanceStore::new();
    let (handle, commands) = command_channel(4);
    drop(handle);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let run = tokio::spawn(scheduler(&store, &cfg).run(commands, async {
        let _ = stop_rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(11_500)).await;
    stop_tx.send(()).unwrap();
    let (engine, presenter) = run.await.unwrap();

    assert_eq!(engine.stats().races, 2);
    assert_eq!(presenter.results().len(), 2);
    assert_eq!(engine.balance(), 1000);
}
