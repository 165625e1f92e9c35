use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::defaults::default_device_name;
use super::shellexpand;

/// WhatsApp transport config.
///
/// Session data is stored at `{data_dir}/session/` unless `session_dir` is set.
/// Pairing is done by scanning a QR code (like WhatsApp Web).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Name shown in the phone's "Linked devices" list.
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default)]
    pub session_dir: Option<String>,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            session_dir: None,
        }
    }
}

impl WhatsAppConfig {
    /// Resolve the session directory against the data directory.
    pub fn session_dir(&self, data_dir: &Path) -> PathBuf {
        match self.session_dir {
            Some(ref dir) => PathBuf::from(shellexpand(dir)),
            None => data_dir.join("session"),
        }
    }
}
