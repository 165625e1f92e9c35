use std::path::PathBuf;
use tracing::{info, warn};
use wabot_channels::whatsapp::PairingQr;

/// Shows a pairing challenge to the operator.
pub trait QrDisplay: Send + Sync {
    fn show(&self, code: &str);
}

/// Prints the QR to the terminal and writes `qr.png` into the data dir.
pub struct TerminalQr {
    png_path: PathBuf,
}

impl TerminalQr {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            png_path: data_dir.into().join("qr.png"),
        }
    }
}

impl QrDisplay for TerminalQr {
    fn show(&self, code: &str) {
        let qr = match PairingQr::encode(code) {
            Ok(qr) => qr,
            Err(e) => {
                warn!("failed to encode pairing QR: {e}");
                return;
            }
        };

        println!("\nScan this QR code with WhatsApp (Linked Devices > Link a device):\n");
        println!("{}", qr.to_terminal());

        match qr.save_png(&self.png_path) {
            Ok(()) => info!("pairing QR saved to {}", self.png_path.display()),
            Err(e) => warn!("failed to save pairing QR: {e}"),
        }
    }
}
