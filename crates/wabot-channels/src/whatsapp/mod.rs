//! WhatsApp transport via `whatsapp-rust`.
//!
//! Uses the WhatsApp Web protocol (Noise handshake + Signal encryption).
//! Pairing is done by scanning a QR code, like WhatsApp Web.
//! Session is persisted to `{session_dir}/whatsapp.db`.

mod bot;
mod events;
mod qr;
mod send;
mod transport;

#[cfg(test)]
mod tests;

pub use qr::PairingQr;
pub use send::split_message;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use wabot_core::config::WhatsAppConfig;
use whatsapp_rust::client::Client;

/// Builds a fresh `whatsapp-rust` bot on every `connect()`.
pub struct WhatsAppConnector {
    pub(super) device_name: String,
    pub(super) session_dir: PathBuf,
}

impl WhatsAppConnector {
    pub fn new(config: &WhatsAppConfig, data_dir: &Path) -> Self {
        Self {
            device_name: config.device_name.clone(),
            session_dir: config.session_dir(data_dir),
        }
    }

    /// Path of the sqlite session database, creating its directory.
    pub fn session_db_path(&self) -> String {
        let _ = std::fs::create_dir_all(&self.session_dir);
        self.session_dir
            .join("whatsapp.db")
            .to_string_lossy()
            .into_owned()
    }
}

/// One running bot session: the client used for sending plus the handle of
/// the background task driving it.
pub struct WhatsAppTransport {
    pub(super) client: Arc<Client>,
    pub(super) run_handle: Mutex<Option<JoinHandle<()>>>,
}
