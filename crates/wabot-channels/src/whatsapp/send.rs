//! Message sending utilities: chunking, media upload, and retry logic.

use tracing::{error, warn};
use wabot_core::error::BotError;
use wacore_binary::jid::Jid;
use whatsapp_rust::client::Client;
use whatsapp_rust::download::MediaType;

/// Retry delays for exponential backoff: 500ms, 1s, 2s.
pub(super) const RETRY_DELAYS_MS: [u64; 3] = [500, 1000, 2000];

/// Longest text body sent in one message.
pub(super) const MAX_TEXT_LEN: usize = 4096;

/// Send a WhatsApp message with retry and exponential backoff.
///
/// Attempts up to 3 times with delays of 500ms, 1s, 2s between retries.
pub(super) async fn retry_send(
    client: &Client,
    jid: &Jid,
    msg: waproto::whatsapp::Message,
) -> Result<String, BotError> {
    let mut last_err = None;

    for (attempt, delay_ms) in RETRY_DELAYS_MS.iter().enumerate() {
        match client.send_message(jid.clone(), msg.clone()).await {
            Ok(msg_id) => return Ok(msg_id),
            Err(e) => {
                let attempt_num = attempt + 1;
                if attempt_num < RETRY_DELAYS_MS.len() {
                    warn!(
                        "whatsapp send attempt {attempt_num}/{} failed: {e}, retrying in {delay_ms}ms",
                        RETRY_DELAYS_MS.len()
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(*delay_ms)).await;
                } else {
                    error!(
                        "whatsapp send attempt {attempt_num}/{} failed: {e}, giving up",
                        RETRY_DELAYS_MS.len()
                    );
                }
                last_err = Some(e);
            }
        }
    }

    Err(BotError::Transport(format!(
        "whatsapp send failed after {} attempts: {}",
        RETRY_DELAYS_MS.len(),
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )))
}

/// Upload webp bytes and build a sticker message around them.
pub(super) async fn upload_sticker(
    client: &Client,
    data: Vec<u8>,
) -> Result<waproto::whatsapp::Message, BotError> {
    let upload = client
        .upload(data, MediaType::Image)
        .await
        .map_err(|e| BotError::Transport(format!("whatsapp sticker upload failed: {e}")))?;

    Ok(waproto::whatsapp::Message {
        sticker_message: Some(Box::new(waproto::whatsapp::message::StickerMessage {
            mimetype: Some("image/webp".to_string()),
            url: Some(upload.url),
            direct_path: Some(upload.direct_path),
            media_key: Some(upload.media_key),
            file_enc_sha256: Some(upload.file_enc_sha256),
            file_sha256: Some(upload.file_sha256),
            file_length: Some(upload.file_length),
            ..Default::default()
        })),
        ..Default::default()
    })
}

/// Upload image bytes and build an image message with an optional caption.
pub(super) async fn upload_image(
    client: &Client,
    data: Vec<u8>,
    caption: Option<String>,
) -> Result<waproto::whatsapp::Message, BotError> {
    let upload = client
        .upload(data, MediaType::Image)
        .await
        .map_err(|e| BotError::Transport(format!("whatsapp image upload failed: {e}")))?;

    Ok(waproto::whatsapp::Message {
        image_message: Some(Box::new(waproto::whatsapp::message::ImageMessage {
            mimetype: Some("image/png".to_string()),
            caption,
            url: Some(upload.url),
            direct_path: Some(upload.direct_path),
            media_key: Some(upload.media_key),
            file_enc_sha256: Some(upload.file_enc_sha256),
            file_sha256: Some(upload.file_sha256),
            file_length: Some(upload.file_length),
            ..Default::default()
        })),
        ..Default::default()
    })
}

/// Split text into chunks of at most `max_len` bytes, preferring line breaks
/// and never cutting inside a UTF-8 sequence.
pub fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let break_at = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .map(|i| start + i + 1)
                .unwrap_or(end)
        } else {
            end
        };
        if break_at == start {
            // A single character wider than max_len.
            let width = text[start..].chars().next().map_or(1, char::len_utf8);
            chunks.push(&text[start..start + width]);
            start += width;
            continue;
        }
        chunks.push(&text[start..break_at]);
        start = break_at;
    }

    chunks
}
