//! Shared test fakes.

use crate::commands::{CommandContext, HandlerCatalog, Services, JOKE_API_URL};
use crate::registry::CommandRegistry;
use crate::render::Renderer;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use wabot_core::{
    config::{BotConfig, RenderConfig},
    error::BotError,
    message::{MediaRef, OutgoingPayload, RawMessage},
    traits::Transport,
};

static DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A fresh, unique (not yet created) directory under the system temp dir.
pub fn temp_dir(label: &str) -> PathBuf {
    let id = DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "__wabot_{label}_{}_{id}__",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

/// Transport that records everything sent through it.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, OutgoingPayload)>>,
    pub media: Option<Vec<u8>>,
    pub fail_sends: AtomicBool,
    pub closed: AtomicBool,
    pub saves: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<(String, OutgoingPayload)> {
        self.sent.lock().unwrap().clone()
    }

    /// Text payloads only, in send order.
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|(_, p)| p.as_text().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, chat_id: &str, payload: OutgoingPayload) -> Result<(), BotError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BotError::Transport("send failed".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), payload));
        Ok(())
    }

    async fn download_media(&self, _media: &MediaRef) -> Result<Vec<u8>, BotError> {
        self.media
            .clone()
            .ok_or_else(|| BotError::Transport("no media".into()))
    }

    async fn save_credentials(&self) -> Result<(), BotError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), BotError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub fn bot_config() -> BotConfig {
    BotConfig {
        admins: vec!["628111".to_string()],
        ..Default::default()
    }
}

pub fn services() -> Arc<Services> {
    let bot = bot_config();
    let data_dir = temp_dir("services");
    Arc::new(Services {
        renderer: Arc::new(Renderer::from_config(&RenderConfig::default(), &data_dir)),
        bot,
        started: Instant::now(),
        http: reqwest::Client::new(),
        joke_url: JOKE_API_URL.to_string(),
    })
}

/// Registry over a fresh directory seeded with the built-in set.
pub async fn builtin_registry() -> Arc<CommandRegistry> {
    let catalog = Arc::new(HandlerCatalog::builtin(services()));
    let registry = Arc::new(CommandRegistry::new(temp_dir("registry"), '.', catalog));
    registry.load().await.unwrap();
    registry
}

pub fn text_message(chat_id: &str, text: &str) -> RawMessage {
    RawMessage {
        id: uuid::Uuid::new_v4().to_string(),
        chat_id: chat_id.to_string(),
        timestamp: chrono::Utc::now(),
        has_payload: true,
        conversation: Some(text.to_string()),
        ..Default::default()
    }
}

pub fn context(
    transport: Arc<RecordingTransport>,
    registry: Arc<CommandRegistry>,
    sender_id: &str,
    token: &str,
    args: &[&str],
) -> CommandContext {
    CommandContext {
        transport,
        chat_id: "chat@s.whatsapp.net".to_string(),
        sender_id: sender_id.to_string(),
        token: token.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        raw: Arc::new(text_message("chat@s.whatsapp.net", token)),
        registry,
    }
}
