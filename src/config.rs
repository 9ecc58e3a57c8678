//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every field has a default matching the reference game, so a partial
//! file (or no file at all via [`AppConfig::load_or_default`]) still
//! produces a playable configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub phases: PhaseConfig,
    #[serde(default)]
    pub race: RaceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GameConfig {
    /// Balance used when nothing has been persisted yet.
    pub initial_balance: u64,
    /// Wager assigned to a marble when it is first selected.
    pub default_wager: u64,
    /// Maximum number of marbles backed in one race.
    pub max_selections: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_balance: 1000,
            default_wager: 10,
            max_selections: 9,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PhaseConfig {
    pub betting_secs: u32,
    pub racing_secs: u32,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            betting_secs: 15,
            racing_secs: 15,
        }
    }
}

impl PhaseConfig {
    /// The race runs for the whole racing phase.
    pub fn race_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.racing_secs))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RaceConfig {
    /// Interval between simulation steps.
    pub tick_ms: u64,
    pub track_length: f64,
    /// Guaranteed forward movement per tick.
    pub base_speed: f64,
    /// Upper bound of the random extra movement per tick.
    pub speed_variance: f64,
    /// Half-width of the noise added to the pace target.
    pub jitter: f64,
    /// Fraction (0–1) of the gap to the pace target closed on every tick.
    pub convergence: f64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            track_length: 1000.0,
            base_speed: 1.0,
            speed_variance: 1.0,
            jitter: 8.0,
            convergence: 0.15,
        }
    }
}

impl RaceConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Name of the key the balance is stored under.
    pub balance_key: String,
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            balance_key: "marbleRaceGems".to_string(),
            data_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration if the file exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.game.max_selections == 0 || self.game.max_selections >= crate::types::ROSTER_SIZE {
            anyhow::bail!(
                "game.max_selections must be between 1 and {}",
                crate::types::ROSTER_SIZE - 1
            );
        }
        if self.game.default_wager == 0 {
            anyhow::bail!("game.default_wager must be positive");
        }
        if self.phases.betting_secs == 0 || self.phases.racing_secs == 0 {
            anyhow::bail!("phase durations must be positive");
        }
        if self.race.tick_ms == 0 {
            anyhow::bail!("race.tick_ms must be positive");
        }
        if !(0.0..=1.0).contains(&self.race.convergence) {
            anyhow::bail!("race.convergence must be within 0..=1");
        }
        if self.race.track_length <= 0.0 {
            anyhow::bail!("race.track_length must be positive");
        }
        Ok(())
    }
}
