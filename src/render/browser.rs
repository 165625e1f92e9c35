//! Headless-browser text rendering: HTML page -> PNG screenshot -> webp.

use super::ffmpeg::FfmpegEncoder;
use super::style::TextStyle;
use super::{Background, RenderError, RenderStrategy, TextRequest};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

pub struct BrowserText {
    browser: String,
    encoder: Arc<FfmpegEncoder>,
}

impl BrowserText {
    pub fn new(browser: &str, encoder: Arc<FfmpegEncoder>) -> Self {
        Self {
            browser: browser.to_string(),
            encoder,
        }
    }
}

pub(super) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("<br>"),
            _ => out.push(c),
        }
    }
    out
}

/// The page screenshotted by the browser. `background` is a local image path.
pub(super) fn build_page(text: &str, style: &TextStyle, background: Option<&Path>) -> String {
    let shadow = if style.border_width > 0 {
        let w = style.border_width;
        let c = style.border_color.to_css();
        format!("-{w}px -{w}px 0 {c}, {w}px -{w}px 0 {c}, -{w}px {w}px 0 {c}, {w}px {w}px 0 {c}")
    } else {
        "none".to_string()
    };
    let text_box = match style.box_color {
        Some(c) => format!("background:{};padding:8px 12px;border-radius:6px;", c.to_css()),
        None => String::new(),
    };
    let bg = match background {
        Some(path) => format!(
            "<img src=\"file://{}\" style=\"position:absolute;inset:0;width:512px;height:512px;object-fit:contain;\">",
            escape_html(&path.to_string_lossy())
        ),
        None => String::new(),
    };
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><style>
html,body{{margin:0;width:512px;height:512px;background:transparent;overflow:hidden;}}
.wrap{{position:absolute;inset:0;display:flex;flex-direction:column;justify-content:{justify};align-items:center;padding:20px;box-sizing:border-box;}}
.text{{font-family:Arial,"Noto Color Emoji","Apple Color Emoji",sans-serif;font-weight:bold;font-size:{size}px;color:{color};text-align:center;text-shadow:{shadow};word-wrap:break-word;max-width:472px;{text_box}}}
</style></head><body>{bg}<div class="wrap"><div class="text">{text}</div></div></body></html>"#,
        justify = style.position.css_justify(),
        size = style.font_size,
        color = style.color.to_css(),
        text = escape_html(text),
    )
}

#[async_trait]
impl RenderStrategy for BrowserText {
    fn name(&self) -> &str {
        "browser"
    }

    async fn render(&self, req: &TextRequest) -> Result<Vec<u8>, RenderError> {
        let mut scratch = FfmpegEncoder::scratch();

        let background = match req.background {
            Background::Transparent => None,
            Background::Image(ref bytes) => {
                let path = scratch.track(self.encoder.temp_path("bg", "img")?);
                tokio::fs::write(&path, bytes).await?;
                Some(path)
            }
            Background::Video(_) => {
                return Err(RenderError::Unavailable(
                    "browser renderer cannot draw over video".into(),
                ))
            }
        };

        let page = scratch.track(self.encoder.temp_path("page", "html")?);
        tokio::fs::write(&page, build_page(&req.text, &req.style, background.as_deref())).await?;
        let shot = scratch.track(self.encoder.temp_path("shot", "png")?);

        let mut cmd = Command::new(&self.browser);
        cmd.arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--hide-scrollbars")
            .arg("--allow-file-access-from-files")
            .arg("--default-background-color=00000000")
            .arg("--window-size=512,512")
            .arg(format!("--screenshot={}", shot.display()))
            .arg(format!("file://{}", page.display()));
        debug!("executing: {} --headless --screenshot", self.browser);
        self.encoder.execute(cmd, &self.browser).await?;

        let png = tokio::fs::read(&shot).await.map_err(|_| {
            RenderError::Unavailable(format!("{} produced no screenshot", self.browser))
        })?;
        self.encoder.image_to_sticker(&png).await
    }
}
