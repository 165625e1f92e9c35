mod channels;
mod defaults;
mod router;

#[cfg(test)]
mod tests;

pub use channels::*;
pub use router::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::BotError;
use defaults::*;

/// Top-level wabot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Command trigger character.
    #[serde(default = "default_prefix")]
    pub prefix: char,
    /// Sender ids (phone numbers or full JIDs) allowed to run admin commands.
    #[serde(default)]
    pub admins: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            prefix: default_prefix(),
            admins: Vec::new(),
        }
    }
}

impl BotConfig {
    /// Whether `sender_id` matches one of the configured admins.
    ///
    /// Admin entries may be bare phone numbers; only the user part of the
    /// sender JID is compared in that case.
    pub fn is_admin(&self, sender_id: &str) -> bool {
        let user = sender_id.split(['@', ':']).next().unwrap_or(sender_id);
        self.admins
            .iter()
            .any(|a| a == sender_id || (!a.contains('@') && a == user))
    }
}

/// Command manifest location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Directory of `<name>.toml` manifests. Defaults to `{data_dir}/commands`.
    #[serde(default)]
    pub directory: Option<String>,
}

impl CommandsConfig {
    pub fn directory(&self, data_dir: &Path) -> PathBuf {
        match self.directory {
            Some(ref dir) => PathBuf::from(shellexpand(dir)),
            None => data_dir.join("commands"),
        }
    }
}

/// External rendering tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
    /// Chromium-compatible browser binary used for HTML text rendering.
    #[serde(default = "default_browser")]
    pub browser: String,
    /// Font file for ffmpeg `drawtext`. Empty = let fontconfig pick.
    #[serde(default)]
    pub font_path: Option<String>,
    /// Emoji-capable font file, used when the text contains emoji.
    #[serde(default)]
    pub emoji_font_path: Option<String>,
    /// Scratch directory. Defaults to `{data_dir}/tmp`.
    #[serde(default)]
    pub temp_dir: Option<String>,
    #[serde(default = "default_render_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            browser: default_browser(),
            font_path: None,
            emoji_font_path: None,
            temp_dir: None,
            timeout_secs: default_render_timeout_secs(),
        }
    }
}

impl RenderConfig {
    pub fn temp_dir(&self, data_dir: &Path) -> PathBuf {
        match self.temp_dir {
            Some(ref dir) => PathBuf::from(shellexpand(dir)),
            None => data_dir.join("tmp"),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Data directory with `~` expanded.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.bot.data_dir))
    }

    /// Serialize to TOML (used by `wabot init`).
    pub fn to_toml(&self) -> Result<String, BotError> {
        toml::to_string_pretty(self)
            .map_err(|e| BotError::Config(format!("failed to serialize config: {e}")))
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, BotError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| BotError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    parse(&content)
}

/// Parse configuration from TOML text.
pub fn parse(content: &str) -> Result<Config, BotError> {
    toml::from_str(content).map_err(|e| BotError::Config(format!("failed to parse config: {e}")))
}
