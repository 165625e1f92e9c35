use crate::{
    error::BotError,
    message::{MediaRef, OutgoingPayload, TransportEvent},
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Send capability of a live messaging session.
///
/// Owned by the bot orchestrator; commands and the router only borrow it for
/// the duration of one call.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable transport name.
    fn name(&self) -> &str;

    /// Send a payload to a chat.
    async fn send(&self, chat_id: &str, payload: OutgoingPayload) -> Result<(), BotError>;

    /// Fetch the bytes behind a media reference produced by this transport.
    async fn download_media(&self, _media: &MediaRef) -> Result<Vec<u8>, BotError> {
        Err(BotError::Transport(format!(
            "{} cannot download media",
            self.name()
        )))
    }

    /// Persist session credentials after the transport reported a change.
    async fn save_credentials(&self) -> Result<(), BotError> {
        Ok(())
    }

    /// Tear down the session.
    async fn close(&self) -> Result<(), BotError>;
}

/// A freshly established session: the send side plus its event stream.
pub struct Connection {
    pub transport: Arc<dyn Transport>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Factory for sessions. Called again on every (re)start.
#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;

    /// Establish a new session. Credential handling is the connector's job.
    async fn connect(&self) -> Result<Connection, BotError>;
}
