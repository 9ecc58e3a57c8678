//! Marble Race: console game.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores the balance from disk (or starts fresh), and runs the
//! betting/racing cycle until Ctrl+C, reading bets from stdin.

use anyhow::Result;
use tracing::info;

use marble_race::config;
use marble_race::engine::accountant::Accountant;
use marble_race::engine::game::GameEngine;
use marble_race::engine::scheduler::{command_channel, Scheduler};
use marble_race::presenter::console::{self, ConsolePresenter};
use marble_race::storage::FileBalanceStore;

const BANNER: &str = r#"
  __  __            _     _        ____
 |  \/  | __ _ _ __| |__ | | ___  |  _ \ __ _  ___ ___
 | |\/| |/ _` | '__| '_ \| |/ _ \ | |_) / _` |/ __/ _ \
 | |  | | (_| | |  | |_) | |  __/ |  _ < (_| | (_|  __/
 |_|  |_|\__,_|_|  |_.__/|_|\___| |_| \_\__,_|\___\___|
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load_or_default("config.toml")?;

    let json_logging = std::env::var("MARBLE_RACE_LOG_JSON").is_ok();
    init_logging(json_logging);

    println!("{BANNER}");
    info!(
        betting_secs = cfg.phases.betting_secs,
        racing_secs = cfg.phases.racing_secs,
        max_selections = cfg.game.max_selections,
        default_wager = cfg.game.default_wager,
        "Marble Race starting up"
    );
    println!("{}", console::HELP);

    let store = FileBalanceStore::new(&cfg.storage.data_dir, &cfg.storage.balance_key);
    let accountant = Accountant::open(Box::new(store), cfg.game.initial_balance);
    let engine = GameEngine::new(&cfg, accountant);
    let scheduler = Scheduler::new(engine, ConsolePresenter::new(json_logging), &cfg);

    let (handle, commands) = command_channel(32);
    console::spawn_stdin_reader(handle)?;

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let (engine, _) = scheduler.run(commands, shutdown).await;

    info!(
        balance = engine.balance(),
        stats = %engine.stats(),
        "Marble Race shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("marble_race=info"));

    if json {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
