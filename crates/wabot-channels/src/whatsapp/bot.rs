//! Session setup: building and running the WhatsApp bot.

use super::events::{map_event, EVENT_BUFFER};
use super::{WhatsAppConnector, WhatsAppTransport};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use wabot_core::{
    error::BotError,
    message::{ConnectionStatus, ConnectionUpdate, TransportEvent},
    traits::{Connection, Connector},
};
use whatsapp_rust::bot::Bot;
use whatsapp_rust_sqlite_storage::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

#[async_trait]
impl Connector for WhatsAppConnector {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn connect(&self) -> Result<Connection, BotError> {
        let db_path = self.session_db_path();
        info!("WhatsApp bot building (session: {db_path})...");

        let backend = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .map_err(|e| BotError::Transport(format!("whatsapp store init failed: {e}")))?,
        );

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let _ = tx
            .send(TransportEvent::Connection(ConnectionUpdate::status(
                ConnectionStatus::Connecting,
            )))
            .await;

        let tx_events = tx.clone();
        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .with_device_props(
                Some(self.device_name.clone()),
                None,
                Some(waproto::whatsapp::device_props::PlatformType::Desktop),
            )
            .on_event(move |event, _client| {
                let tx = tx_events.clone();
                async move {
                    let Some(mapped) = map_event(event) else {
                        return;
                    };
                    if tx.send(mapped).await.is_err() {
                        debug!("whatsapp event receiver dropped");
                    }
                }
            })
            .build()
            .await
            .map_err(|e| BotError::Transport(format!("whatsapp bot build failed: {e}")))?;

        let client = bot.client();

        // Run bot in background.
        let handle = bot
            .run()
            .await
            .map_err(|e| BotError::Transport(format!("whatsapp bot run failed: {e}")))?;

        info!("WhatsApp bot started");
        Ok(Connection {
            transport: Arc::new(WhatsAppTransport {
                client,
                run_handle: Mutex::new(Some(handle)),
            }),
            events: rx,
        })
    }
}
