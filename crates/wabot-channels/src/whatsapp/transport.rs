//! Transport trait implementation for WhatsApp.

use super::events::WaMedia;
use super::send::{retry_send, split_message, upload_image, upload_sticker, MAX_TEXT_LEN};
use super::WhatsAppTransport;
use async_trait::async_trait;
use tracing::{debug, info};
use wabot_core::{
    error::BotError,
    message::{MediaRef, OutgoingPayload},
    traits::Transport,
};
use wacore_binary::jid::Jid;

fn parse_jid(jid_str: &str) -> Result<Jid, BotError> {
    jid_str
        .parse()
        .map_err(|e| BotError::Transport(format!("invalid whatsapp JID '{jid_str}': {e}")))
}

#[async_trait]
impl Transport for WhatsAppTransport {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send(&self, chat_id: &str, payload: OutgoingPayload) -> Result<(), BotError> {
        let jid = parse_jid(chat_id)?;
        match payload {
            OutgoingPayload::Text(text) => {
                for chunk in split_message(&text, MAX_TEXT_LEN) {
                    let msg = waproto::whatsapp::Message {
                        conversation: Some(chunk.to_string()),
                        ..Default::default()
                    };
                    retry_send(&self.client, &jid, msg).await?;
                }
            }
            OutgoingPayload::Sticker(data) => {
                let msg = upload_sticker(&self.client, data).await?;
                retry_send(&self.client, &jid, msg).await?;
            }
            OutgoingPayload::Image { data, caption } => {
                let msg = upload_image(&self.client, data, caption).await?;
                retry_send(&self.client, &jid, msg).await?;
            }
        }
        Ok(())
    }

    async fn download_media(&self, media: &MediaRef) -> Result<Vec<u8>, BotError> {
        let wa = media
            .handle
            .downcast_ref::<WaMedia>()
            .ok_or_else(|| BotError::Transport("media was not produced by whatsapp".into()))?;
        let result = match wa {
            WaMedia::Image(m) => self.client.download(m.as_ref()).await,
            WaMedia::Video(m) => self.client.download(m.as_ref()).await,
            WaMedia::Sticker(m) => self.client.download(m.as_ref()).await,
            WaMedia::Document(m) => self.client.download(m.as_ref()).await,
            WaMedia::Audio(m) => self.client.download(m.as_ref()).await,
        };
        let bytes =
            result.map_err(|e| BotError::Transport(format!("whatsapp download failed: {e}")))?;
        debug!("downloaded whatsapp {:?} ({} bytes)", media.kind, bytes.len());
        Ok(bytes)
    }

    async fn save_credentials(&self) -> Result<(), BotError> {
        // The sqlite store writes through on every key change.
        debug!("whatsapp credentials persisted by session store");
        Ok(())
    }

    async fn close(&self) -> Result<(), BotError> {
        let Some(handle) = self.run_handle.lock().await.take() else {
            return Ok(());
        };
        // Drop the socket first; other `Arc<Client>` holders would keep it
        // alive past the run task and the next login would see a conflict.
        self.client.disconnect().await;
        handle.abort();
        info!("WhatsApp session closed");
        Ok(())
    }
}
