//! Built-in command handlers and the catalog manifests bind to.

mod admin;
mod fun;
mod info;
mod media;


use crate::registry::CommandRegistry;
use crate::render::Renderer;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wabot_core::{
    config::BotConfig,
    error::BotError,
    message::{OutgoingPayload, RawMessage},
    traits::Transport,
};

/// Everything a handler gets for one invocation.
pub struct CommandContext {
    pub transport: Arc<dyn Transport>,
    pub chat_id: String,
    pub sender_id: String,
    /// Token as typed (e.g. `.Ping`).
    pub token: String,
    /// Whitespace-separated words after the token.
    pub args: Vec<String>,
    pub raw: Arc<RawMessage>,
    pub registry: Arc<CommandRegistry>,
}

impl CommandContext {
    /// Send text back to the originating chat.
    pub async fn reply(&self, text: impl Into<String> + Send) -> Result<(), BotError> {
        self.transport
            .send(&self.chat_id, OutgoingPayload::text(text))
            .await
    }

    pub async fn send(&self, payload: OutgoingPayload) -> Result<(), BotError> {
        self.transport.send(&self.chat_id, payload).await
    }

    /// Arguments joined back into a single string.
    pub fn arg_text(&self) -> String {
        self.args.join(" ")
    }
}

/// A compiled-in command implementation.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Default one-line help text, used when the manifest has none.
    fn description(&self) -> &str;

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError>;
}

/// Random-joke endpoint; responds with `{"data": "..."}`.
pub const JOKE_API_URL: &str = "https://candaan-api.vercel.app/api/text/random";

/// Shared dependencies handed to built-in handlers at construction.
pub struct Services {
    /// Name, prefix and admin list.
    pub bot: BotConfig,
    pub started: Instant,
    pub renderer: Arc<Renderer>,
    pub http: reqwest::Client,
    pub joke_url: String,
}

impl Services {
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_admin(&self, sender_id: &str) -> bool {
        self.bot.is_admin(sender_id)
    }
}

/// Handler id -> implementation. Manifests refer to handlers by id.
#[derive(Default)]
pub struct HandlerCatalog {
    handlers: Vec<(&'static str, Arc<dyn CommandHandler>)>,
    aliases: Vec<(&'static str, &'static str)>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `id`. A later registration replaces an earlier one.
    pub fn with(mut self, id: &'static str, handler: impl CommandHandler + 'static) -> Self {
        self.handlers.retain(|(existing, _)| *existing != id);
        self.handlers.push((id, Arc::new(handler)));
        self
    }

    /// Extra manifest seeded for `name`, bound to handler `id`.
    pub fn alias(mut self, name: &'static str, id: &'static str) -> Self {
        self.aliases.push((name, id));
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, h)| h.clone())
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|(id, _)| *id).collect()
    }

    /// `(manifest name, handler id)` pairs written when seeding a new
    /// command directory.
    pub fn default_manifests(&self) -> Vec<(&'static str, &'static str)> {
        self.handlers
            .iter()
            .map(|(id, _)| (*id, *id))
            .chain(self.aliases.iter().copied())
            .collect()
    }

    /// The full built-in command set.
    pub fn builtin(services: Arc<Services>) -> Self {
        Self::new()
            .with("ping", info::Ping::new(services.clone()))
            .with("help", info::Help::new(services.clone()))
            .with("info", info::Info::new(services.clone()))
            .with("status", info::Status::new(services.clone()))
            .with("time", info::Time)
            .with("test", info::Test::new(services.clone()))
            .with("joke", fun::Joke::new(services.clone()))
            .with("quote", fun::Quote::new(services.clone()))
            .with("reload", admin::Reload::new(services.clone()))
            .with("sticker", media::Sticker::new(services.clone()))
            .with("stext", media::StickerText::new(services.clone()))
            .with("tgen", media::TextGen::new(services.clone()))
            .with("ffmpeg", media::FfmpegCheck::new(services))
            .alias("menu", "help")
    }
}

/// Human-readable uptime: `45s`, `3m 12s`, `2h 5m`, `1d 4h 30m`.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
