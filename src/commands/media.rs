//! Sticker commands backed by the render pipeline.

use super::{CommandContext, CommandHandler, Services};
use crate::render::{Background, TextRequest, TextStyle, MAX_VIDEO_SECS};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use wabot_core::{
    error::BotError,
    message::{MediaKind, MediaRef, OutgoingPayload},
};

/// Font size used by `tgen`.
const TEXT_ONLY_FONT_SIZE: u32 = 60;

async fn download(ctx: &CommandContext, media: &MediaRef) -> Result<Vec<u8>, BotError> {
    let bytes = ctx.transport.download_media(media).await?;
    if bytes.is_empty() {
        return Err(BotError::Transport("downloaded media is empty".into()));
    }
    Ok(bytes)
}

/// Split `stext` arguments into a style and the text to draw.
///
/// Accepts `meme Hello`, `style:meme Hello`, or plain `Hello` (meme style).
pub(crate) fn parse_style_args(args: &[String]) -> (TextStyle, String) {
    if let Some((first, rest)) = args.split_first() {
        let name = first.strip_prefix("style:").unwrap_or(first);
        if let Some(style) = TextStyle::named(name) {
            return (style, rest.join(" "));
        }
    }
    (TextStyle::meme(), args.join(" "))
}

/// Image or video (own or replied-to) to sticker.
pub struct Sticker {
    services: Arc<Services>,
}

impl Sticker {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl CommandHandler for Sticker {
    fn description(&self) -> &str {
        "Turn an image or short video into a sticker"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError> {
        let Some(media) = ctx.raw.target_media().filter(|m| m.kind.is_visual()) else {
            return ctx
                .reply(format!(
                    "❌ Send an image or video with the caption {}, or reply to one.",
                    ctx.token
                ))
                .await;
        };

        ctx.reply("⏳ Creating sticker...").await?;
        let bytes = download(ctx, media).await?;
        let encoder = self.services.renderer.encoder();

        let sticker = match media.kind {
            MediaKind::Video => {
                match encoder.probe_duration(&bytes).await {
                    Ok(secs) if secs > MAX_VIDEO_SECS => {
                        ctx.reply(format!(
                            "⚠️ Video is {secs:.1}s long; only the first {MAX_VIDEO_SECS:.0}s will be used."
                        ))
                        .await?;
                    }
                    Ok(_) => {}
                    Err(e) => warn!("could not probe video duration: {e}"),
                }
                encoder.video_to_sticker(&bytes).await?
            }
            _ => encoder.image_to_sticker(&bytes).await?,
        };

        info!("sticker for {} ({} bytes)", ctx.chat_id, sticker.len());
        ctx.send(OutgoingPayload::Sticker(sticker)).await
    }
}

/// Text drawn over media in one of the named styles.
pub struct StickerText {
    services: Arc<Services>,
}

impl StickerText {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    fn usage(&self, token: &str) -> String {
        format!(
            "📝 *Text sticker*\n\n\
             Reply to an image or video with:\n\
             {token} [style] <text>\n\n\
             Styles: {}\n\
             Example: {token} title Hello world",
            TextStyle::NAMES.join(", ")
        )
    }
}

#[async_trait]
impl CommandHandler for StickerText {
    fn description(&self) -> &str {
        "Write text on an image or video sticker"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError> {
        let (style, text) = parse_style_args(&ctx.args);
        let media = ctx.raw.target_media().filter(|m| m.kind.is_visual());
        let (Some(media), false) = (media, text.trim().is_empty()) else {
            return ctx.reply(self.usage(&ctx.token)).await;
        };

        ctx.reply(format!("⏳ Rendering {} sticker...", style.name))
            .await?;
        let bytes = download(ctx, media).await?;
        let background = match media.kind {
            MediaKind::Video => Background::Video(bytes),
            _ => Background::Image(bytes),
        };
        let req = TextRequest {
            text,
            style,
            background,
        };

        match self.services.renderer.text_sticker(&req).await {
            Ok(sticker) => ctx.send(OutgoingPayload::Sticker(sticker)).await,
            Err(e) => {
                warn!("text sticker failed: {e}");
                ctx.reply("❌ Failed to render the text sticker.").await
            }
        }
    }
}

/// Text-only sticker on a transparent canvas.
pub struct TextGen {
    services: Arc<Services>,
}

impl TextGen {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl CommandHandler for TextGen {
    fn description(&self) -> &str {
        "Make a sticker from text"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError> {
        let text = ctx.arg_text();
        if text.trim().is_empty() {
            return ctx
                .reply(format!(
                    "📝 Usage: {} <text>\nExample: {} Good morning 🌅",
                    ctx.token, ctx.token
                ))
                .await;
        }

        let req = TextRequest {
            text,
            style: TextStyle::plain(TEXT_ONLY_FONT_SIZE),
            background: Background::Transparent,
        };
        match self.services.renderer.text_sticker(&req).await {
            Ok(sticker) => ctx.send(OutgoingPayload::Sticker(sticker)).await,
            Err(e) => {
                warn!("text sticker failed: {e}");
                ctx.reply("❌ Failed to render the text sticker.").await
            }
        }
    }
}

/// Report which ffmpeg features are available.
pub struct FfmpegCheck {
    services: Arc<Services>,
}

impl FfmpegCheck {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✅"
    } else {
        "❌"
    }
}

#[async_trait]
impl CommandHandler for FfmpegCheck {
    fn description(&self) -> &str {
        "Check ffmpeg text rendering support"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError> {
        let caps = self.services.renderer.encoder().capabilities().await;
        let text = format!(
            "🎬 *ffmpeg check*\n\n\
             {} ffmpeg: {}\n\
             {} freetype\n\
             {} harfbuzz\n\
             {} fribidi\n\
             🔤 Font: {}\n\
             😀 Emoji font: {}\n\n\
             Text stickers: {}",
            mark(caps.ffmpeg_available),
            caps.version,
            mark(caps.freetype),
            mark(caps.harfbuzz),
            mark(caps.fribidi),
            caps.font_path.as_deref().unwrap_or("default"),
            caps.emoji_font.as_deref().unwrap_or("not found"),
            if caps.text_ready() { "ready" } else { "unavailable" },
        );
        ctx.reply(text).await
    }
}
