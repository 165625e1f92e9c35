//! ffmpeg-backed sticker encoding and text overlays.

use super::style::{has_emoji, wrap_text, TextStyle};
use super::{Background, RenderError, RenderStrategy, TextRequest};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;
use wabot_core::config::RenderConfig;

/// Longest video clip turned into an animated sticker.
pub const MAX_VIDEO_SECS: f64 = 10.0;
const VIDEO_FPS: u32 = 15;
const SCALE_FILTER: &str = "scale=512:512:force_original_aspect_ratio=decrease";

const EMOJI_FONT_CANDIDATES: [&str; 4] = [
    "/usr/share/fonts/truetype/noto/NotoColorEmoji.ttf",
    "/usr/share/fonts/noto/NotoColorEmoji.ttf",
    "/usr/share/fonts/google-noto-emoji/NotoColorEmoji.ttf",
    "/System/Library/Fonts/Apple Color Emoji.ttc",
];

/// Temp files removed on drop.
pub(super) struct Scratch(Vec<PathBuf>);

impl Scratch {
    fn new() -> Self {
        Self(Vec::new())
    }

    pub(super) fn track(&mut self, path: PathBuf) -> PathBuf {
        self.0.push(path.clone());
        path
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        for path in &self.0 {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// What `ffmpeg -version` reports about text rendering support.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub ffmpeg_available: bool,
    pub version: String,
    pub freetype: bool,
    pub harfbuzz: bool,
    pub fribidi: bool,
    pub emoji_font: Option<String>,
    pub font_path: Option<String>,
}

impl Capabilities {
    pub fn text_ready(&self) -> bool {
        self.ffmpeg_available && self.freetype
    }
}

/// Parse `ffmpeg -version` output.
pub fn parse_capabilities(version_output: &str) -> Capabilities {
    let version = version_output
        .lines()
        .next()
        .and_then(|l| l.strip_prefix("ffmpeg version "))
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or("unknown")
        .to_string();
    Capabilities {
        ffmpeg_available: true,
        version,
        freetype: version_output.contains("--enable-libfreetype"),
        harfbuzz: version_output.contains("--enable-libharfbuzz"),
        fribidi: version_output.contains("--enable-libfribidi"),
        emoji_font: None,
        font_path: None,
    }
}

/// Escape a value for use inside a single-quoted filtergraph option.
pub(super) fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '\'' | ':' | ',' | ';' | '[' | ']' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Runs ffmpeg/ffprobe with a timeout and scratch files.
pub struct FfmpegEncoder {
    ffmpeg: String,
    ffprobe: String,
    temp_dir: PathBuf,
    timeout: Duration,
    font_path: Option<String>,
    emoji_font_path: Option<String>,
}

impl FfmpegEncoder {
    pub fn new(cfg: &RenderConfig, data_dir: &Path) -> Self {
        Self {
            ffmpeg: cfg.ffmpeg.clone(),
            ffprobe: cfg.ffprobe.clone(),
            temp_dir: cfg.temp_dir(data_dir),
            timeout: cfg.timeout(),
            font_path: cfg.font_path.clone(),
            emoji_font_path: cfg.emoji_font_path.clone(),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub(super) fn scratch() -> Scratch {
        Scratch::new()
    }

    /// A fresh, unique path inside the temp dir.
    pub(super) fn temp_path(&self, prefix: &str, ext: &str) -> Result<PathBuf, RenderError> {
        std::fs::create_dir_all(&self.temp_dir)?;
        Ok(self
            .temp_dir
            .join(format!("{prefix}_{}.{ext}", Uuid::new_v4().simple())))
    }

    /// Execute a tool with the configured timeout and standard error handling.
    pub(super) async fn execute(&self, mut cmd: Command, label: &str) -> Result<Output, RenderError> {
        cmd.kill_on_drop(true);
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| RenderError::Timeout {
                tool: label.to_string(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| RenderError::Spawn {
                tool: label.to_string(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr.lines().rev().take(3).collect::<Vec<_>>().join(" | ");
            return Err(RenderError::Failed {
                tool: label.to_string(),
                status: output.status.to_string(),
                stderr: tail,
            });
        }

        Ok(output)
    }

    fn ffmpeg_command(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-hide_banner").arg("-loglevel").arg("error").arg("-y");
        cmd
    }

    /// Write `input` to a scratch file, run ffmpeg with `filter`, and read the
    /// webp output back.
    async fn encode(
        &self,
        scratch: &mut Scratch,
        input: Option<&[u8]>,
        animated: bool,
        filter: &str,
    ) -> Result<Vec<u8>, RenderError> {
        let output_path = scratch.track(self.temp_path("sticker", "webp")?);
        let mut cmd = self.ffmpeg_command();

        match input {
            Some(bytes) => {
                let input_path = scratch.track(self.temp_path("input", "bin")?);
                tokio::fs::write(&input_path, bytes).await?;
                cmd.arg("-i").arg(&input_path);
            }
            None => {
                cmd.arg("-f")
                    .arg("lavfi")
                    .arg("-i")
                    .arg("color=c=black@0.0:s=512x512,format=rgba");
            }
        }

        if animated {
            cmd.arg("-t").arg(MAX_VIDEO_SECS.to_string());
        } else {
            cmd.arg("-frames:v").arg("1");
        }

        cmd.arg("-vf")
            .arg(filter)
            .arg("-c:v")
            .arg("libwebp")
            .arg("-lossless")
            .arg("0")
            .arg("-compression_level")
            .arg("4")
            .arg("-quality")
            .arg("80")
            .arg("-loop")
            .arg("0")
            .arg("-an")
            .arg("-f")
            .arg("webp")
            .arg(&output_path);

        debug!("executing: {} -vf {filter}", self.ffmpeg);
        self.execute(cmd, "ffmpeg").await?;
        Ok(tokio::fs::read(&output_path).await?)
    }

    /// Static image (any ffmpeg-readable format) to a 512px webp sticker.
    pub async fn image_to_sticker(&self, input: &[u8]) -> Result<Vec<u8>, RenderError> {
        let mut scratch = Self::scratch();
        let filter = format!("{SCALE_FILTER},format=rgba");
        self.encode(&mut scratch, Some(input), false, &filter).await
    }

    /// Video clip to an animated webp sticker, capped at 10 seconds and 15 fps.
    pub async fn video_to_sticker(&self, input: &[u8]) -> Result<Vec<u8>, RenderError> {
        let mut scratch = Self::scratch();
        let filter = format!("fps={VIDEO_FPS},{SCALE_FILTER}");
        self.encode(&mut scratch, Some(input), true, &filter).await
    }

    /// Duration of a media file in seconds.
    pub async fn probe_duration(&self, input: &[u8]) -> Result<f64, RenderError> {
        let mut scratch = Self::scratch();
        let path = scratch.track(self.temp_path("probe", "bin")?);
        tokio::fs::write(&path, input).await?;

        let mut cmd = Command::new(&self.ffprobe);
        cmd.arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(&path);
        let output = self.execute(cmd, "ffprobe").await?;
        let text = String::from_utf8_lossy(&output.stdout);
        text.trim()
            .parse::<f64>()
            .map_err(|_| RenderError::Unavailable(format!("ffprobe reported no duration: {text}")))
    }

    /// `drawtext` filter for `text` in `style`, reading the text from a file.
    pub(super) fn drawtext_filter(
        &self,
        text_file: &Path,
        style: &TextStyle,
        font: Option<&str>,
    ) -> String {
        let mut parts = Vec::new();
        if let Some(font) = font {
            parts.push(format!("fontfile='{}'", escape_filter_value(font)));
        }
        parts.push(format!(
            "textfile='{}'",
            escape_filter_value(&text_file.to_string_lossy())
        ));
        parts.push(format!("fontsize={}", style.font_size));
        parts.push(format!("fontcolor={}", style.color.to_ffmpeg()));
        if style.border_width > 0 {
            parts.push(format!("borderw={}", style.border_width));
            parts.push(format!("bordercolor={}", style.border_color.to_ffmpeg()));
        }
        if let Some(box_color) = style.box_color {
            parts.push("box=1".to_string());
            parts.push(format!("boxcolor={}", box_color.to_ffmpeg()));
            parts.push("boxborderw=8".to_string());
        }
        parts.push("line_spacing=6".to_string());
        parts.push("x=(w-text_w)/2".to_string());
        parts.push(format!("y={}", style.position.ffmpeg_y()));
        format!("drawtext={}", parts.join(":"))
    }

    /// Font to use for `text`: the emoji font when the text needs one.
    pub(super) fn font_for(&self, text: &str) -> Option<String> {
        if has_emoji(text) {
            if let Some(ref emoji) = self.emoji_font_path {
                return Some(emoji.clone());
            }
        }
        self.font_path.clone()
    }

    /// Render `req` with a `drawtext` pass.
    pub(super) async fn overlay(
        &self,
        req: &TextRequest,
        style: &TextStyle,
        font: Option<&str>,
    ) -> Result<Vec<u8>, RenderError> {
        let mut scratch = Self::scratch();
        let text_file = scratch.track(self.temp_path("text", "txt")?);
        tokio::fs::write(&text_file, wrap_text(&req.text, style.line_width())).await?;
        let drawtext = self.drawtext_filter(&text_file, style, font);

        match req.background {
            Background::Transparent => {
                let filter = format!("format=rgba,{drawtext}");
                self.encode(&mut scratch, None, false, &filter).await
            }
            Background::Image(ref bytes) => {
                let filter = format!("{SCALE_FILTER},format=rgba,{drawtext}");
                self.encode(&mut scratch, Some(bytes.as_slice()), false, &filter)
                    .await
            }
            Background::Video(ref bytes) => {
                let filter = format!("fps={VIDEO_FPS},{SCALE_FILTER},{drawtext}");
                self.encode(&mut scratch, Some(bytes.as_slice()), true, &filter)
                    .await
            }
        }
    }

    /// Probe ffmpeg's version and text-rendering libraries.
    pub async fn capabilities(&self) -> Capabilities {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-hide_banner").arg("-version");
        let mut caps = match self.execute(cmd, "ffmpeg").await {
            Ok(output) => parse_capabilities(&String::from_utf8_lossy(&output.stdout)),
            Err(e) => {
                debug!("ffmpeg probe failed: {e}");
                Capabilities {
                    version: "not found".to_string(),
                    ..Default::default()
                }
            }
        };
        caps.font_path = self.font_path.clone();
        caps.emoji_font = self
            .emoji_font_path
            .clone()
            .filter(|p| Path::new(p).exists())
            .or_else(|| {
                EMOJI_FONT_CANDIDATES
                    .iter()
                    .find(|p| Path::new(p).exists())
                    .map(|p| p.to_string())
            });
        caps
    }
}

/// Styled `drawtext` with the configured font (emoji font for emoji text).
pub struct FfmpegOverlay {
    encoder: Arc<FfmpegEncoder>,
}

impl FfmpegOverlay {
    pub fn new(encoder: Arc<FfmpegEncoder>) -> Self {
        Self { encoder }
    }
}

#[async_trait]
impl RenderStrategy for FfmpegOverlay {
    fn name(&self) -> &str {
        "ffmpeg-overlay"
    }

    async fn render(&self, req: &TextRequest) -> Result<Vec<u8>, RenderError> {
        let font = self.encoder.font_for(&req.text);
        self.encoder
            .overlay(req, &req.style, font.as_deref())
            .await
    }
}

/// Bare `drawtext`: default font, white text, centered.
pub struct FfmpegPlain {
    encoder: Arc<FfmpegEncoder>,
}

impl FfmpegPlain {
    pub fn new(encoder: Arc<FfmpegEncoder>) -> Self {
        Self { encoder }
    }
}

#[async_trait]
impl RenderStrategy for FfmpegPlain {
    fn name(&self) -> &str {
        "ffmpeg-plain"
    }

    async fn render(&self, req: &TextRequest) -> Result<Vec<u8>, RenderError> {
        let style = TextStyle::plain(req.style.font_size);
        self.encoder.overlay(req, &style, None).await
    }
}
