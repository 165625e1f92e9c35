use super::{CommandContext, CommandHandler, Services};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};
use wabot_core::error::BotError;

/// Re-scan the command directory. Admin only.
pub struct Reload {
    services: Arc<Services>,
}

impl Reload {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl CommandHandler for Reload {
    fn description(&self) -> &str {
        "Reload commands from disk (admin only)"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError> {
        if !self.services.is_admin(&ctx.sender_id) {
            return ctx
                .reply("❌ This command is only available for administrators.")
                .await;
        }

        ctx.reply("🔄 Reloading commands...").await?;
        match ctx.registry.reload().await {
            Ok(count) => {
                info!("{} reloaded {count} commands", ctx.sender_id);
                ctx.reply(format!("✅ Reloaded {count} commands.")).await
            }
            Err(e) => {
                error!("reload failed: {e}");
                ctx.reply(format!("❌ Reload failed: {e}")).await
            }
        }
    }
}
