//! Full betting/racing cycles driven directly through the engine.

use rand::rngs::StdRng;
use rand::SeedableRng;

use marble_race::config::AppConfig;
use marble_race::engine::accountant::{Accountant, StakeOutcome};
use marble_race::engine::events::GameEvent;
use marble_race::engine::game::GameEngine;
use marble_race::engine::ledger::BetLedger;
use marble_race::engine::payout::PayoutCalculator;
use marble_race::storage::MemoryBalanceStore;
use marble_race::types::{CompetitorId, Phase, RaceResult};

use crate::recording_presenter::RecordingPresenter;

fn id(raw: u8) -> CompetitorId {
    CompetitorId::new(raw).unwrap()
}

fn short_phases() -> AppConfig {
    AppConfig::parse(
        r#"
[phases]
betting_secs = 2
racing_secs = 2
"#,
    )
    .unwrap()
}

fn engine_with(store: &MemoryBalanceStore, seed: u64) -> GameEngine {
    let accountant = Accountant::open(Box::new(store.clone()), 1000);
    GameEngine::with_rng(&short_phases(), accountant, StdRng::seed_from_u64(seed))
}

/// Forward events to the recorder, as the scheduler would.
fn render(events: Vec<GameEvent>, presenter: &mut RecordingPresenter) {
    for event in events {
        event.dispatch(presenter);
    }
}

/// Step the running race until it produces results.
fn run_race(engine: &mut GameEngine, presenter: &mut RecordingPresenter) {
    let before = presenter.results().len();
    for _ in 0..1000 {
        render(engine.tick_race(), presenter);
        if presenter.results().len() > before {
            return;
        }
    }
    panic!("race never finished");
}

#[test]
fn test_podium_payout_settles_balance() {
    let store = MemoryBalanceStore::with_value("1000");
    let mut accountant = Accountant::open(Box::new(store.clone()), 1000);

    let mut ledger = BetLedger::default();
    ledger.select(id(3)).unwrap();
    ledger.set_wager(id(3), 50, accountant.balance()).unwrap();
    ledger.select(id(7)).unwrap();
    ledger.set_wager(id(7), 20, accountant.balance()).unwrap();
    ledger.lock();

    tokio_test::assert_ok!(ledger.validate(accountant.balance()));
    let stake = accountant.commit_stake(ledger.total());
    assert_eq!(stake, StakeOutcome::Debited(70));
    assert_eq!(accountant.balance(), 930);

    // Marble 3 wins, marble 7 misses the podium.
    let order: Vec<_> = [3, 1, 2, 7, 4, 5, 6, 8, 9, 10].into_iter().map(id).collect();
    let result = RaceResult::from_order(&order);
    let payout = PayoutCalculator::compute(&result, &ledger);

    assert_eq!(payout.total_bet, 70);
    assert_eq!(payout.total_winnings, 150);
    assert_eq!(payout.net_result, 80);
    assert_eq!(payout.details.len(), 1);
    assert_eq!(payout.details[0].to_string(), "Marble 3 (1st): 50 × 3 = 150 gems");

    let report = accountant.settle(result.race_id, stake, &payout);
    assert_eq!(report.balance_after, 1080);
    assert_eq!(accountant.balance(), 1080);
    assert_eq!(store.peek().as_deref(), Some("1080"));
}

#[test]
fn test_full_cycle_carries_pending_bets() {
    let store = MemoryBalanceStore::new();
    let mut engine = engine_with(&store, 11);
    let mut presenter = RecordingPresenter::new();

    render(engine.start(), &mut presenter);
    render(engine.select(3).unwrap(), &mut presenter);
    render(engine.set_wager(3, 50).unwrap(), &mut presenter);

    render(engine.tick_countdown(), &mut presenter);
    render(engine.tick_countdown(), &mut presenter);
    assert_eq!(engine.phase(), Phase::Racing);
    assert_eq!(engine.balance(), 950);
    assert!(engine.current_ledger().is_locked());

    // Edits during the race go to the next one.
    render(engine.select(5).unwrap(), &mut presenter);
    assert!(engine.pending_ledger().is_selected(id(5)));
    assert!(!engine.current_ledger().is_selected(id(5)));

    run_race(&mut engine, &mut presenter);
    let payouts = presenter.payouts();
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0].total_bet, 50);
    let winnings = payouts[0].total_winnings;
    assert_eq!(engine.balance(), 950 + winnings);
    assert_eq!(engine.stats().races, 1);

    render(engine.tick_countdown(), &mut presenter);
    render(engine.tick_countdown(), &mut presenter);
    assert_eq!(engine.phase(), Phase::Betting);
    assert!(!engine.current_ledger().is_locked());
    assert_eq!(engine.current_ledger().wager(id(5)), Some(10));
    assert!(engine.pending_ledger().is_empty());

    assert_eq!(
        presenter.phase_entries(),
        vec![Phase::Betting, Phase::Racing, Phase::Betting]
    );
    assert!(presenter.frame_count() > 0);
}

#[test]
fn test_results_rank_every_marble() {
    let store = MemoryBalanceStore::new();
    let mut engine = engine_with(&store, 5);
    let mut presenter = RecordingPresenter::new();

    render(engine.start(), &mut presenter);
    render(engine.tick_countdown(), &mut presenter);
    render(engine.tick_countdown(), &mut presenter);
    run_race(&mut engine, &mut presenter);

    let result = presenter.results()[0].clone();
    assert_eq!(result.placings.len(), 10);
    let mut seen: Vec<u8> = result.placings.iter().map(|p| p.competitor.get()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (1..=10).collect::<Vec<u8>>());
    for (i, placing) in result.placings.iter().enumerate() {
        assert_eq!(placing.position, i + 1);
    }
    assert_eq!(engine.last_result(), Some(&result));

    // No bets means no money moves.
    assert_eq!(engine.balance(), 1000);
    assert_eq!(presenter.payouts()[0].total_winnings, 0);
}

#[test]
fn test_over_budget_stake_is_skipped() {
    let store = MemoryBalanceStore::with_value("40");
    let mut engine = engine_with(&store, 9);
    let mut presenter = RecordingPresenter::new();

    render(engine.start(), &mut presenter);
    render(engine.select(3).unwrap(), &mut presenter);
    render(engine.set_wager(3, 40).unwrap(), &mut presenter);
    render(engine.select(5).unwrap(), &mut presenter);
    render(engine.set_wager(5, 40).unwrap(), &mut presenter);
    tokio_test::assert_err!(engine.confirm());

    render(engine.tick_countdown(), &mut presenter);
    render(engine.tick_countdown(), &mut presenter);
    assert_eq!(engine.phase(), Phase::Racing);
    assert_eq!(engine.balance(), 40);
    assert_eq!(
        presenter.errors(),
        vec!["Total bet (80) exceeds available gems (40)"]
    );

    run_race(&mut engine, &mut presenter);
    let winnings = presenter.payouts()[0].total_winnings;
    assert_eq!(engine.balance(), 40 + winnings);
    assert_eq!(engine.stats().skipped_stakes, 1);
}

#[test]
fn test_balance_survives_restart() {
    let store = MemoryBalanceStore::new();
    let final_balance = {
        let mut engine = engine_with(&store, 21);
        let mut presenter = RecordingPresenter::new();
        render(engine.start(), &mut presenter);
        render(engine.select(1).unwrap(), &mut presenter);
        render(engine.set_wager(1, 100).unwrap(), &mut presenter);
        render(engine.tick_countdown(), &mut presenter);
        render(engine.tick_countdown(), &mut presenter);
        run_race(&mut engine, &mut presenter);
        engine.balance()
    };

    assert_eq!(store.peek(), Some(final_balance.to_string()));
    let restarted = engine_with(&store, 22);
    assert_eq!(restarted.balance(), final_balance);
}

#[test]
fn test_corrupt_balance_falls_back_to_default() {
    let store = MemoryBalanceStore::with_value("not a number");
    let engine = engine_with(&store, 1);
    assert_eq!(engine.balance(), 1000);
}
