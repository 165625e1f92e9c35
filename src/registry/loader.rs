//! Command manifest scanning.
//!
//! Each command is a `<name>.toml` file naming a compiled-in handler:
//!
//! ```toml
//! handler = "ping"
//! description = "Check that the bot is alive"
//! enabled = true
//! ```

use super::Command;
use crate::commands::HandlerCatalog;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use wabot_core::error::BotError;

/// Parsed manifest file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub handler: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Invocation token for a manifest stem: trigger char + lowercased stem.
pub fn token_for(prefix: char, stem: &str) -> String {
    format!("{prefix}{}", stem.to_lowercase())
}

/// Whether a directory entry should be loaded as a command manifest.
///
/// Skips non-`.toml` files, hidden files, declaration-only files
/// (`*.schema.toml`, `*.d.toml`), and aggregator entries (stem contains
/// `index`).
pub fn is_eligible(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') {
        return false;
    }
    let Some(stem) = name.strip_suffix(".toml") else {
        return false;
    };
    if stem.is_empty() || stem.ends_with(".schema") || stem.ends_with(".d") {
        return false;
    }
    !stem.to_lowercase().contains("index")
}

/// Manifest files in `dir`, sorted by file name for a stable load order.
fn manifest_paths(dir: &Path) -> Result<Vec<PathBuf>, BotError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();
    Ok(paths)
}

/// Parse one manifest and bind it to a catalog handler.
///
/// `Ok(None)` means the entry is disabled.
fn load_entry(
    path: &Path,
    prefix: char,
    catalog: &HandlerCatalog,
) -> Result<Option<Command>, String> {
    let content = std::fs::read_to_string(path).map_err(|e| format!("unreadable: {e}"))?;
    let manifest: Manifest =
        toml::from_str(&content).map_err(|e| format!("invalid manifest: {e}"))?;
    if !manifest.enabled {
        return Ok(None);
    }
    let handler = catalog
        .get(&manifest.handler)
        .ok_or_else(|| format!("handler '{}' is not callable", manifest.handler))?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| "non-utf8 file name".to_string())?;

    Ok(Some(Command {
        token: token_for(prefix, stem),
        description: manifest
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| handler.description().to_string()),
        handler_id: manifest.handler,
        handler,
        source_ref: path.to_path_buf(),
    }))
}

/// Scan `dir` and build commands in load order.
///
/// A bad entry is logged and skipped; it never aborts the remaining ones.
pub fn scan(dir: &Path, prefix: char, catalog: &HandlerCatalog) -> Result<Vec<Command>, BotError> {
    let mut commands = Vec::new();
    let mut seen = HashSet::new();

    for path in manifest_paths(dir)? {
        if !is_eligible(&path) {
            debug!("skipping non-command entry {}", path.display());
            continue;
        }
        match load_entry(&path, prefix, catalog) {
            Ok(Some(cmd)) => {
                if !seen.insert(cmd.token.clone()) {
                    warn!(
                        "duplicate command {} in {}, keeping the first",
                        cmd.token,
                        path.display()
                    );
                    continue;
                }
                debug!("loaded command {} -> {}", cmd.token, cmd.handler_id);
                commands.push(cmd);
            }
            Ok(None) => debug!("command {} is disabled", path.display()),
            Err(e) => warn!("skipping command {}: {e}", path.display()),
        }
    }

    Ok(commands)
}

/// Create `dir` and write one manifest per built-in handler (plus aliases).
/// Existing files are never overwritten. Returns the number written.
pub fn seed(dir: &Path, catalog: &HandlerCatalog) -> Result<usize, BotError> {
    std::fs::create_dir_all(dir)?;
    let mut written = 0;
    for (name, handler_id) in catalog.default_manifests() {
        let path = dir.join(format!("{name}.toml"));
        if path.exists() {
            continue;
        }
        let description = catalog.get(handler_id).map(|h| h.description().to_string());
        let manifest = Manifest {
            handler: handler_id.to_string(),
            description,
            enabled: true,
        };
        let body = toml::to_string_pretty(&manifest)
            .map_err(|e| BotError::Config(format!("failed to serialize manifest: {e}")))?;
        std::fs::write(&path, body)?;
        written += 1;
    }
    Ok(written)
}
