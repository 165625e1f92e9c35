use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Kind of media attached to an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Document,
    Audio,
    Sticker,
}

impl MediaKind {
    /// Whether this media can be turned into a sticker.
    pub fn is_visual(&self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Sticker)
    }
}

/// A reference to downloadable media carried by an inbound message.
///
/// The `handle` is owned by the transport that produced the message and is
/// only meaningful to that transport's `download_media`.
#[derive(Clone)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub mimetype: Option<String>,
    /// Duration for audio/video, when the transport reports it.
    pub seconds: Option<u32>,
    pub handle: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaRef")
            .field("kind", &self.kind)
            .field("mimetype", &self.mimetype)
            .field("seconds", &self.seconds)
            .finish_non_exhaustive()
    }
}

/// One inbound message exactly as the transport delivered it.
///
/// Text can live in several alternative fields depending on the message type;
/// the router decides which one wins.
#[derive(Debug, Clone, Default)]
pub struct RawMessage {
    pub id: String,
    /// Chat the message was posted in (e.g. `628123@s.whatsapp.net`).
    pub chat_id: String,
    /// Group participant who sent it, if the chat is a group.
    pub participant: Option<String>,
    pub push_name: Option<String>,
    /// Produced by the bot's own account.
    pub from_me: bool,
    /// Origination time reported by the sender's device.
    pub timestamp: DateTime<Utc>,
    /// False for stubs and protocol notifications that carry no message body.
    pub has_payload: bool,
    /// Plain text body.
    pub conversation: Option<String>,
    /// Extended text body (replies, link previews).
    pub extended_text: Option<String>,
    pub image_caption: Option<String>,
    pub video_caption: Option<String>,
    pub document_caption: Option<String>,
    /// Media attached to this message.
    pub media: Option<MediaRef>,
    /// Media of the message this one replies to.
    pub quoted_media: Option<MediaRef>,
}

impl RawMessage {
    /// Media a command should operate on: the replied-to media first, then
    /// the message's own attachment.
    pub fn target_media(&self) -> Option<&MediaRef> {
        self.quoted_media.as_ref().or(self.media.as_ref())
    }
}

/// Something the bot sends back through the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingPayload {
    Text(String),
    /// WebP sticker bytes.
    Sticker(Vec<u8>),
    /// PNG/JPEG bytes with an optional caption.
    Image {
        data: Vec<u8>,
        caption: Option<String>,
    },
}

impl OutgoingPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// The text of a `Text` payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Connection status reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Close,
}

/// Why the transport closed the connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseReason {
    /// Protocol status code, when the transport has one (401, 440, 515, ...).
    pub status_code: Option<u16>,
    /// Free-text description from the transport library.
    pub message: String,
    /// The transport positively knows the session was logged out.
    pub logged_out: bool,
}

impl CloseReason {
    pub fn new(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            logged_out: false,
        }
    }

    pub fn logged_out(message: impl Into<String>) -> Self {
        Self {
            status_code: Some(401),
            message: message.into(),
            logged_out: true,
        }
    }
}

/// A connection-state change. Any combination of fields may be present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionUpdate {
    pub status: Option<ConnectionStatus>,
    pub close: Option<CloseReason>,
    /// Pairing QR payload to show to the operator.
    pub qr: Option<String>,
}

impl ConnectionUpdate {
    pub fn status(status: ConnectionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn closed(reason: CloseReason) -> Self {
        Self {
            status: Some(ConnectionStatus::Close),
            close: Some(reason),
            qr: None,
        }
    }

    pub fn qr(code: impl Into<String>) -> Self {
        Self {
            qr: Some(code.into()),
            ..Default::default()
        }
    }
}

/// Everything a transport can emit.
#[derive(Debug)]
pub enum TransportEvent {
    Connection(ConnectionUpdate),
    Message(Box<RawMessage>),
    /// Session credentials changed and should be persisted.
    CredentialsChanged,
}
