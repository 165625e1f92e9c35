//! Informational commands: ping, help, info, status, time, test.

use super::{format_uptime, CommandContext, CommandHandler, Services};
use async_trait::async_trait;
use chrono::{Datelike, Local, Utc};
use std::sync::Arc;
use wabot_core::error::BotError;

pub struct Ping {
    services: Arc<Services>,
}

impl Ping {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl CommandHandler for Ping {
    fn description(&self) -> &str {
        "Check that the bot is online"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError> {
        ctx.reply(format!(
            "🏓 Pong! Bot is online!\n⏱️ Uptime: {}",
            format_uptime(self.services.uptime())
        ))
        .await
    }
}

pub struct Help {
    services: Arc<Services>,
}

impl Help {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl CommandHandler for Help {
    fn description(&self) -> &str {
        "List available commands"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError> {
        let commands = ctx.registry.list().await;
        let mut text = format!("📋 *{} commands*\n", self.services.bot.name);
        for cmd in &commands {
            text.push_str(&format!("\n• {} - {}", cmd.token, cmd.description));
        }
        text.push_str(&format!("\n\nTotal: {} commands", commands.len()));
        ctx.reply(text).await
    }
}

pub struct Info {
    services: Arc<Services>,
}

impl Info {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl CommandHandler for Info {
    fn description(&self) -> &str {
        "Show bot information"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError> {
        let bot = &self.services.bot;
        let text = format!(
            "🤖 *{}*\n\n\
             📦 Version: {}\n\
             🔣 Prefix: {}\n\
             📚 Commands: {}\n\
             ⏱️ Uptime: {}",
            bot.name,
            env!("CARGO_PKG_VERSION"),
            bot.prefix,
            ctx.registry.len().await,
            format_uptime(self.services.uptime()),
        );
        ctx.reply(text).await
    }
}

pub struct Status {
    services: Arc<Services>,
}

impl Status {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl CommandHandler for Status {
    fn description(&self) -> &str {
        "Show runtime status"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError> {
        let caps = self.services.renderer.encoder().capabilities().await;
        let text = format!(
            "📊 *Status*\n\n\
             🟢 Online via {}\n\
             ⏱️ Uptime: {}\n\
             📚 Commands loaded: {}\n\
             🎬 ffmpeg: {}\n\
             💻 Platform: {}/{}\n\
             🆔 PID: {}",
            ctx.transport.name(),
            format_uptime(self.services.uptime()),
            ctx.registry.len().await,
            if caps.ffmpeg_available {
                caps.version.as_str()
            } else {
                "not found"
            },
            std::env::consts::OS,
            std::env::consts::ARCH,
            std::process::id(),
        );
        ctx.reply(text).await
    }
}

/// Current server time.
pub struct Time;

#[async_trait]
impl CommandHandler for Time {
    fn description(&self) -> &str {
        "Show the current server time"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError> {
        let local = Local::now();
        let utc = Utc::now();
        let text = format!(
            "🕐 *Server time*\n\n\
             📅 {}\n\
             ⏰ {} ({})\n\
             🌐 UTC: {}\n\
             🔢 Unix: {}\n\
             📆 Week {} · day {} of the year",
            local.format("%A, %d %B %Y"),
            local.format("%H:%M:%S"),
            local.format("%:z"),
            utc.format("%Y-%m-%d %H:%M:%S"),
            utc.timestamp(),
            local.iso_week().week(),
            local.ordinal(),
        );
        ctx.reply(text).await
    }
}

/// Echo the arguments back.
pub struct Test {
    services: Arc<Services>,
}

impl Test {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl CommandHandler for Test {
    fn description(&self) -> &str {
        "Echo a message back"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError> {
        let sender = ctx.raw.push_name.as_deref().unwrap_or(&ctx.sender_id);
        let body = if ctx.args.is_empty() {
            "No message provided".to_string()
        } else {
            ctx.arg_text()
        };
        ctx.reply(format!(
            "✅ *Test OK*\n\n👤 From: {sender}\n💬 Message: {body}\n🤖 Bot: {}",
            self.services.bot.name
        ))
        .await
    }
}
