//! Command registry: token -> handler table built from the manifest directory.
//!
//! The table is immutable once built. `reload()` builds a complete new table
//! and swaps the pointer, so a concurrent `resolve()` sees either the old or
//! the new table, never a mix.

pub mod loader;

#[cfg(test)]
mod tests;

use crate::commands::{CommandHandler, HandlerCatalog};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};
use wabot_core::error::BotError;

/// One registered command.
#[derive(Clone)]
pub struct Command {
    /// Normalized invocation token, e.g. `.ping`.
    pub token: String,
    /// Catalog id of the handler implementation.
    pub handler_id: String,
    pub handler: Arc<dyn CommandHandler>,
    /// Manifest file this entry was loaded from.
    pub source_ref: PathBuf,
    pub description: String,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("token", &self.token)
            .field("handler_id", &self.handler_id)
            .field("source_ref", &self.source_ref)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct CommandTable {
    entries: Vec<Command>,
    index: HashMap<String, usize>,
}

impl CommandTable {
    fn new(entries: Vec<Command>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, c)| (c.token.clone(), i))
            .collect();
        Self { entries, index }
    }
}

pub struct CommandRegistry {
    dir: PathBuf,
    prefix: char,
    catalog: Arc<HandlerCatalog>,
    table: RwLock<Arc<CommandTable>>,
    loaded: AtomicBool,
    /// Serializes scans so a lazy load and a reload never race.
    load_lock: Mutex<()>,
}

impl CommandRegistry {
    pub fn new(dir: impl Into<PathBuf>, prefix: char, catalog: Arc<HandlerCatalog>) -> Self {
        Self {
            dir: dir.into(),
            prefix,
            catalog,
            table: RwLock::new(Arc::new(CommandTable::default())),
            loaded: AtomicBool::new(false),
            load_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    /// Build a fresh table from the manifest directory.
    fn build_table(&self) -> Result<CommandTable, BotError> {
        if !self.dir.exists() {
            let written = loader::seed(&self.dir, &self.catalog)?;
            info!(
                "created command directory {} with {written} manifests",
                self.dir.display()
            );
        }
        let commands = loader::scan(&self.dir, self.prefix, &self.catalog)?;
        Ok(CommandTable::new(commands))
    }

    /// Scan the manifest directory and replace the table.
    pub async fn load(&self) -> Result<usize, BotError> {
        let _guard = self.load_lock.lock().await;
        self.load_locked().await
    }

    async fn load_locked(&self) -> Result<usize, BotError> {
        let table = self.build_table()?;
        let count = table.entries.len();
        if count == 0 {
            error!("no commands loaded from {}", self.dir.display());
        } else {
            info!("loaded {count} commands from {}", self.dir.display());
        }
        *self.table.write().await = Arc::new(table);
        self.loaded.store(true, Ordering::SeqCst);
        Ok(count)
    }

    /// Rebuild the table from disk and swap it in atomically.
    pub async fn reload(&self) -> Result<usize, BotError> {
        info!("reloading commands");
        self.load().await
    }

    /// Load once if the registry has never been loaded.
    pub async fn ensure_loaded(&self) -> Result<(), BotError> {
        if self.is_loaded() {
            return Ok(());
        }
        let _guard = self.load_lock.lock().await;
        if !self.is_loaded() {
            self.load_locked().await?;
        }
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Case-insensitive exact lookup.
    pub async fn resolve(&self, token: &str) -> Option<Command> {
        let table = self.table.read().await.clone();
        let key = token.to_lowercase();
        table.index.get(&key).map(|&i| table.entries[i].clone())
    }

    /// Registered commands in load order.
    pub async fn list(&self) -> Vec<Command> {
        self.table.read().await.entries.clone()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
