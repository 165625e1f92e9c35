//! Message router: filter, debounce per chat, then dispatch to a command or
//! an auto-reply.

mod normalize;

#[cfg(test)]
mod tests;

pub use normalize::{drop_reason, normalize, DropReason, InboundMessage};

use crate::commands::{CommandContext, CommandHandler};
use crate::registry::CommandRegistry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use wabot_core::{
    config::RouterConfig,
    error::BotError,
    message::{OutgoingPayload, RawMessage},
    traits::Transport,
};

/// What a dispatch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran to completion.
    Executed(String),
    NotFound(String),
    /// The handler errored, panicked, or timed out.
    Failed(String),
    /// Index of the auto-reply rule that fired.
    AutoReplied(usize),
    Ignored,
}

struct PendingDispatch {
    generation: u64,
    handle: JoinHandle<()>,
}

pub struct Router {
    registry: Arc<CommandRegistry>,
    config: RouterConfig,
    prefix: char,
    pending: Mutex<HashMap<String, PendingDispatch>>,
    generation: AtomicU64,
}

impl Router {
    pub fn new(registry: Arc<CommandRegistry>, config: RouterConfig, prefix: char) -> Self {
        Self {
            registry,
            config,
            prefix,
            pending: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Accept one inbound message.
    ///
    /// Filtered messages are dropped here. Everything else is scheduled for
    /// dispatch after the debounce window, replacing any dispatch already
    /// pending for the same chat.
    pub async fn route(self: &Arc<Self>, transport: Arc<dyn Transport>, raw: RawMessage) {
        let msg = normalize(raw);
        if let Some(reason) = drop_reason(&msg, chrono::Utc::now(), self.config.stale_after()) {
            debug!("dropping message {} from {}: {reason:?}", msg.raw.id, msg.chat_id);
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let chat_id = msg.chat_id.clone();
        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.remove(&chat_id) {
            previous.handle.abort();
            debug!("superseded pending dispatch for {chat_id}");
        }

        let router = Arc::clone(self);
        let key = chat_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(router.config.debounce()).await;
            {
                let mut pending = router.pending.lock().await;
                match pending.get(&key) {
                    Some(p) if p.generation == generation => {
                        pending.remove(&key);
                    }
                    _ => return,
                }
            }
            router.dispatch(transport, msg).await;
        });
        pending.insert(chat_id, PendingDispatch { generation, handle });
    }

    /// Number of armed debounce timers.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Abort every pending dispatch.
    pub async fn cancel_all(&self) {
        let mut pending = self.pending.lock().await;
        for (_, p) in pending.drain() {
            p.handle.abort();
        }
    }

    /// Handle one message immediately, bypassing the debounce.
    pub async fn dispatch(
        &self,
        transport: Arc<dyn Transport>,
        msg: InboundMessage,
    ) -> DispatchOutcome {
        if msg.text.starts_with(self.prefix) {
            return self.dispatch_command(transport, msg).await;
        }

        let lowered = msg.text.to_lowercase();
        let Some((index, rule)) = self
            .config
            .auto_replies
            .iter()
            .enumerate()
            .find(|(_, r)| r.matches(&lowered))
        else {
            return DispatchOutcome::Ignored;
        };

        debug!("auto-reply #{index} for {}", msg.chat_id);
        if let Err(e) = transport
            .send(&msg.chat_id, OutgoingPayload::text(rule.response.clone()))
            .await
        {
            warn!("auto-reply to {} failed: {e}", msg.chat_id);
        }
        DispatchOutcome::AutoReplied(index)
    }

    async fn dispatch_command(
        &self,
        transport: Arc<dyn Transport>,
        msg: InboundMessage,
    ) -> DispatchOutcome {
        let mut words = msg.text.split_whitespace().map(str::to_string);
        let token = words.next().unwrap_or_default();
        let args: Vec<String> = words.collect();

        if let Err(e) = self.registry.ensure_loaded().await {
            error!("command registry failed to load: {e}");
        }

        let Some(command) = self.registry.resolve(&token).await else {
            info!("unknown command {token} from {}", msg.sender_id);
            let reply = format!(
                "❌ Command {token} not found. Type {}help to see the list of available commands.",
                self.prefix
            );
            self.reply(&transport, &msg.chat_id, reply).await;
            return DispatchOutcome::NotFound(token);
        };

        info!("{} -> {} ({})", msg.sender_id, command.token, command.handler_id);
        let ctx = CommandContext {
            transport: transport.clone(),
            chat_id: msg.chat_id.clone(),
            sender_id: msg.sender_id.clone(),
            token: token.clone(),
            args,
            raw: msg.raw.clone(),
            registry: self.registry.clone(),
        };

        match self.execute(command.handler.clone(), ctx).await {
            Ok(()) => DispatchOutcome::Executed(token),
            Err(e) => {
                error!("command {token} failed: {e}");
                let reply =
                    format!("❌ An error occurred while processing your command {token}.");
                self.reply(&transport, &msg.chat_id, reply).await;
                DispatchOutcome::Failed(token)
            }
        }
    }

    /// Run a handler on its own task so a panic or timeout stays contained.
    async fn execute(
        &self,
        handler: Arc<dyn CommandHandler>,
        ctx: CommandContext,
    ) -> Result<(), BotError> {
        let mut join = tokio::spawn(async move { handler.run(&ctx).await });

        let joined = match self.config.command_timeout() {
            Some(limit) => match tokio::time::timeout(limit, &mut join).await {
                Ok(joined) => joined,
                Err(_) => {
                    join.abort();
                    return Err(BotError::Command(format!(
                        "timed out after {}s",
                        limit.as_secs()
                    )));
                }
            },
            None => join.await,
        };

        match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(BotError::Command("handler panicked".into())),
            Err(e) => Err(BotError::Command(format!("handler task failed: {e}"))),
        }
    }

    async fn reply(&self, transport: &Arc<dyn Transport>, chat_id: &str, text: String) {
        if let Err(e) = transport.send(chat_id, OutgoingPayload::text(text)).await {
            warn!("reply to {chat_id} failed: {e}");
        }
    }
}
