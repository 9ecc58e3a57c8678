//! Persistence layer.
//!
//! The only durable state is the player's balance, stored under a single
//! named key as a base-10 integer string. [`FileBalanceStore`] keeps the key
//! as a file in a data directory; [`MemoryBalanceStore`] keeps it in memory
//! for tests and embedding.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Key/value slot holding the serialized balance.
pub trait BalanceStore: Send {
    /// Raw stored value, or `None` if nothing has been saved yet.
    fn read(&self) -> Result<Option<String>>;

    fn write(&self, value: &str) -> Result<()>;
}

/// Interpret a stored value, falling back to `default` when it is absent or
/// not a non-negative integer.
pub fn parse_balance(raw: Option<&str>, default: u64) -> u64 {
    match raw {
        None => default,
        Some(text) => match text.trim().parse::<u64>() {
            Ok(balance) => balance,
            Err(e) => {
                warn!(raw = text, error = %e, default, "Unparseable stored balance, using default");
                default
            }
        },
    }
}

/// Load the balance from a store. Read failures are treated like a missing key.
pub fn load_balance(store: &dyn BalanceStore, default: u64) -> u64 {
    match store.read() {
        Ok(raw) => parse_balance(raw.as_deref(), default),
        Err(e) => {
            warn!(error = %e, default, "Failed to read stored balance, using default");
            default
        }
    }
}

pub fn save_balance(store: &dyn BalanceStore, balance: u64) -> Result<()> {
    store.write(&balance.to_string())
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

/// Stores the key as `<data_dir>/<key>`.
#[derive(Debug, Clone)]
pub struct FileBalanceStore {
    path: PathBuf,
}

impl FileBalanceStore {
    pub fn new(data_dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: data_dir.as_ref().join(key),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the stored key (reset to the default balance on next start).
    pub fn delete(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to delete {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl BalanceStore for FileBalanceStore {
    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No saved balance found, starting fresh");
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read balance from {}", self.path.display()))?;
        Ok(Some(raw))
    }

    fn write(&self, value: &str) -> Result<()> {
        std::fs::write(&self.path, value)
            .with_context(|| format!("Failed to write balance to {}", self.path.display()))?;
        debug!(path = %self.path.display(), balance = value, "Balance saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Shared in-memory slot. Clones observe the same value.
#[derive(Debug, Clone, Default)]
pub struct MemoryBalanceStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: &str) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(value.to_string()))),
        }
    }

    /// Current raw value.
    pub fn peek(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl BalanceStore for MemoryBalanceStore {
    fn read(&self) -> Result<Option<String>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("balance slot poisoned"))?;
        Ok(slot.clone())
    }

    fn write(&self, value: &str) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("balance slot poisoned"))?;
        *slot = Some(value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
