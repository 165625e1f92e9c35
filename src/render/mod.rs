//! Sticker rendering through external tools.
//!
//! Every strategy shells out (`ffmpeg`, `ffprobe`, a headless browser) via
//! `tokio::process`, so a slow render never blocks other chats.

mod browser;
mod ffmpeg;
mod style;


pub use browser::BrowserText;
pub use ffmpeg::{
    parse_capabilities, Capabilities, FfmpegEncoder, FfmpegOverlay, FfmpegPlain, MAX_VIDEO_SECS,
};
pub use style::{has_emoji, wrap_text, Position, Rgba, TextStyle};

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use wabot_core::{config::RenderConfig, error::BotError};

/// Rendering failures.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The strategy cannot handle this request at all.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Every strategy in a fallback chain failed.
    #[error("all renderers failed: {}", .0.join("; "))]
    Exhausted(Vec<String>),
}

impl From<RenderError> for BotError {
    fn from(e: RenderError) -> Self {
        BotError::Render(e.to_string())
    }
}

/// What the text is drawn on.
#[derive(Debug, Clone)]
pub enum Background {
    /// Transparent 512x512 canvas.
    Transparent,
    Image(Vec<u8>),
    Video(Vec<u8>),
}

/// A text sticker to render.
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub text: String,
    pub style: TextStyle,
    pub background: Background,
}

/// One way of turning a [`TextRequest`] into webp sticker bytes.
#[async_trait]
pub trait RenderStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn render(&self, req: &TextRequest) -> Result<Vec<u8>, RenderError>;
}

/// Ordered strategies; the first success wins.
pub struct FallbackChain {
    strategies: Vec<Arc<dyn RenderStrategy>>,
}

impl FallbackChain {
    pub fn new(strategies: Vec<Arc<dyn RenderStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn render(&self, req: &TextRequest) -> Result<Vec<u8>, RenderError> {
        let mut failures = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            match strategy.render(req).await {
                Ok(bytes) => {
                    info!("rendered sticker with {}", strategy.name());
                    return Ok(bytes);
                }
                Err(e) => {
                    warn!("renderer {} failed: {e}", strategy.name());
                    failures.push(format!("{}: {e}", strategy.name()));
                }
            }
        }
        Err(RenderError::Exhausted(failures))
    }
}

/// Entry point used by commands: media conversion plus text rendering.
pub struct Renderer {
    encoder: Arc<FfmpegEncoder>,
    overlay: Arc<dyn RenderStrategy>,
    plain: Arc<dyn RenderStrategy>,
    browser: Arc<dyn RenderStrategy>,
}

impl Renderer {
    pub fn from_config(cfg: &RenderConfig, data_dir: &Path) -> Self {
        let encoder = Arc::new(FfmpegEncoder::new(cfg, data_dir));
        Self {
            overlay: Arc::new(FfmpegOverlay::new(encoder.clone())),
            plain: Arc::new(FfmpegPlain::new(encoder.clone())),
            browser: Arc::new(BrowserText::new(&cfg.browser, encoder.clone())),
            encoder,
        }
    }

    pub fn encoder(&self) -> &FfmpegEncoder {
        &self.encoder
    }

    /// Strategy order for a piece of text.
    ///
    /// Emoji text goes to ffmpeg first (emoji font); plain text prefers the
    /// browser for nicer typography. The simplified ffmpeg pass is always last.
    pub fn chain_for(&self, text: &str) -> FallbackChain {
        let order = if has_emoji(text) {
            vec![self.overlay.clone(), self.browser.clone(), self.plain.clone()]
        } else {
            vec![self.browser.clone(), self.overlay.clone(), self.plain.clone()]
        };
        FallbackChain::new(order)
    }

    pub async fn text_sticker(&self, req: &TextRequest) -> Result<Vec<u8>, RenderError> {
        self.chain_for(&req.text).render(req).await
    }
}
