//! Mapping `whatsapp-rust` events onto transport-neutral events.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use wabot_core::message::{
    CloseReason, ConnectionStatus, ConnectionUpdate, MediaKind, MediaRef, RawMessage,
    TransportEvent,
};
use wacore::types::events::Event;
use wacore::types::message::MessageInfo;
use waproto::whatsapp::message::{
    AudioMessage, DocumentMessage, ImageMessage, StickerMessage, VideoMessage,
};
use waproto::whatsapp::Message;

pub(super) const EVENT_BUFFER: usize = 256;

/// Opaque media handle stored inside [`MediaRef::handle`].
pub(super) enum WaMedia {
    Image(Box<ImageMessage>),
    Video(Box<VideoMessage>),
    Sticker(Box<StickerMessage>),
    Document(Box<DocumentMessage>),
    Audio(Box<AudioMessage>),
}

/// Translate one library event. Events the bot does not care about map to `None`.
pub(super) fn map_event(event: Event) -> Option<TransportEvent> {
    let update = match event {
        Event::PairingQrCode { code, .. } => {
            info!("WhatsApp QR code generated (scan to pair)");
            ConnectionUpdate::qr(code)
        }
        Event::PairSuccess(_) => {
            info!("WhatsApp pairing successful!");
            return Some(TransportEvent::CredentialsChanged);
        }
        Event::Connected(_) => ConnectionUpdate::status(ConnectionStatus::Open),
        Event::Disconnected(_) => {
            ConnectionUpdate::closed(CloseReason::new(None, "Connection Lost"))
        }
        Event::LoggedOut(_) => {
            warn!("WhatsApp logged out, session invalidated");
            ConnectionUpdate::closed(CloseReason::logged_out("Logged Out"))
        }
        Event::StreamReplaced(_) => ConnectionUpdate::closed(CloseReason::new(
            Some(440),
            "Stream Replaced: conflict",
        )),
        Event::StreamError(_) => {
            ConnectionUpdate::closed(CloseReason::new(Some(515), "Stream Errored"))
        }
        Event::ConnectFailure(_) => {
            ConnectionUpdate::closed(CloseReason::new(Some(401), "Connection Failure"))
        }
        Event::Message(msg, info) => {
            return Some(TransportEvent::Message(Box::new(to_raw_message(
                &msg, &info,
            ))));
        }
        _ => return None,
    };
    Some(TransportEvent::Connection(update))
}

fn to_raw_message(msg: &Message, info: &MessageInfo) -> RawMessage {
    let mut raw = extract_content(msg);
    raw.id = info.id.clone();
    raw.chat_id = info.source.chat.to_string();
    raw.participant = info
        .source
        .is_group
        .then(|| info.source.sender.to_string());
    raw.push_name = (!info.push_name.is_empty()).then(|| info.push_name.clone());
    raw.from_me = info.source.is_from_me;
    raw.timestamp = info.timestamp;
    raw
}

/// Unwrap nested wrappers (device_sent, ephemeral, view_once).
fn unwrap_message(msg: &Message) -> &Message {
    msg.device_sent_message
        .as_ref()
        .and_then(|d| d.message.as_deref())
        .or_else(|| {
            msg.ephemeral_message
                .as_ref()
                .and_then(|e| e.message.as_deref())
        })
        .or_else(|| {
            msg.view_once_message
                .as_ref()
                .and_then(|v| v.message.as_deref())
        })
        .unwrap_or(msg)
}

/// Pull the text alternatives and media descriptors out of a message body.
///
/// Envelope fields (id, chat, sender, timestamp) are left at their defaults.
pub(super) fn extract_content(msg: &Message) -> RawMessage {
    let inner = unwrap_message(msg);

    let extended = inner.extended_text_message.as_ref();
    let quoted_media = extended
        .and_then(|e| e.context_info.as_ref())
        .and_then(|c| c.quoted_message.as_ref())
        .and_then(|q| media_of(q));

    let mut raw = RawMessage {
        timestamp: Utc::now(),
        conversation: inner.conversation.clone(),
        extended_text: extended.and_then(|e| e.text.clone()),
        image_caption: inner.image_message.as_ref().and_then(|m| m.caption.clone()),
        video_caption: inner.video_message.as_ref().and_then(|m| m.caption.clone()),
        document_caption: inner
            .document_message
            .as_ref()
            .and_then(|m| m.caption.clone()),
        media: media_of(inner),
        quoted_media,
        ..Default::default()
    };
    raw.has_payload = raw.conversation.is_some()
        || raw.extended_text.is_some()
        || raw.media.is_some();
    raw
}

fn media_ref(
    kind: MediaKind,
    mimetype: Option<String>,
    seconds: Option<u32>,
    media: WaMedia,
) -> MediaRef {
    MediaRef {
        kind,
        mimetype,
        seconds,
        handle: Arc::new(media),
    }
}

fn image(m: &ImageMessage) -> MediaRef {
    media_ref(
        MediaKind::Image,
        m.mimetype.clone(),
        None,
        WaMedia::Image(Box::new(m.clone())),
    )
}

fn video(m: &VideoMessage) -> MediaRef {
    media_ref(
        MediaKind::Video,
        m.mimetype.clone(),
        m.seconds,
        WaMedia::Video(Box::new(m.clone())),
    )
}

fn sticker(m: &StickerMessage) -> MediaRef {
    media_ref(
        MediaKind::Sticker,
        m.mimetype.clone(),
        None,
        WaMedia::Sticker(Box::new(m.clone())),
    )
}

fn document(m: &DocumentMessage) -> MediaRef {
    media_ref(
        MediaKind::Document,
        m.mimetype.clone(),
        None,
        WaMedia::Document(Box::new(m.clone())),
    )
}

fn audio(m: &AudioMessage) -> MediaRef {
    media_ref(
        MediaKind::Audio,
        m.mimetype.clone(),
        m.seconds,
        WaMedia::Audio(Box::new(m.clone())),
    )
}

fn media_of(msg: &Message) -> Option<MediaRef> {
    let msg = unwrap_message(msg);
    if let Some(ref m) = msg.image_message {
        return Some(image(m));
    }
    if let Some(ref m) = msg.video_message {
        return Some(video(m));
    }
    if let Some(ref m) = msg.sticker_message {
        return Some(sticker(m));
    }
    if let Some(ref m) = msg.document_message {
        return Some(document(m));
    }
    msg.audio_message.as_ref().map(|m| audio(m))
}
