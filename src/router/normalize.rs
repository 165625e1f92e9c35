use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use wabot_core::message::RawMessage;

/// Router's view of an inbound message.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat_id: String,
    /// Group participant if present, else the chat itself.
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_from_self: bool,
    pub is_broadcast: bool,
    pub has_payload: bool,
    pub raw: Arc<RawMessage>,
}

/// Why a message never reaches dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    FromSelf,
    Broadcast,
    NoPayload,
    Stale,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

pub fn normalize(raw: RawMessage) -> InboundMessage {
    let text = [
        &raw.conversation,
        &raw.extended_text,
        &raw.image_caption,
        &raw.video_caption,
        &raw.document_caption,
    ]
    .into_iter()
    .find_map(non_empty)
    .unwrap_or_default()
    .to_string();

    InboundMessage {
        sender_id: raw.participant.clone().unwrap_or_else(|| raw.chat_id.clone()),
        chat_id: raw.chat_id.clone(),
        text,
        timestamp: raw.timestamp,
        is_from_self: raw.from_me,
        is_broadcast: raw.chat_id.ends_with("@broadcast"),
        has_payload: raw.has_payload,
        raw: Arc::new(raw),
    }
}

/// `Some(reason)` when the message must be dropped.
pub fn drop_reason(
    msg: &InboundMessage,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> Option<DropReason> {
    if msg.is_from_self {
        return Some(DropReason::FromSelf);
    }
    if msg.is_broadcast {
        return Some(DropReason::Broadcast);
    }
    if !msg.has_payload {
        return Some(DropReason::NoPayload);
    }
    let age = now.signed_duration_since(msg.timestamp);
    let stale = chrono::Duration::from_std(stale_after).map_or(false, |limit| age > limit);
    stale.then_some(DropReason::Stale)
}
