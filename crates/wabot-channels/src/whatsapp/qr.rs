//! Pairing challenge rendering.

use image::{ImageError, ImageFormat, Luma};
use qrcode::render::unicode::Dense1x2;
use qrcode::{EcLevel, QrCode};
use std::path::Path;
use wabot_core::error::BotError;

/// Pixels per QR module in the saved PNG.
const PNG_MODULE_PX: u32 = 10;

/// A pairing payload, encoded once and rendered for the terminal or to disk.
pub struct PairingQr {
    code: QrCode,
}

impl PairingQr {
    pub fn encode(payload: &str) -> Result<Self, BotError> {
        QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::L)
            .map(|code| Self { code })
            .map_err(|e| BotError::Transport(format!("cannot encode pairing QR: {e}")))
    }

    /// Half-block rendering, two module rows per text line. Colors are
    /// inverted so the code scans on a dark terminal.
    pub fn to_terminal(&self) -> String {
        self.code
            .render::<Dense1x2>()
            .dark_color(Dense1x2::Light)
            .light_color(Dense1x2::Dark)
            .quiet_zone(true)
            .build()
    }

    /// Write the code as a PNG, creating parent directories as needed.
    pub fn save_png(&self, path: &Path) -> Result<(), BotError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.code
            .render::<Luma<u8>>()
            .module_dimensions(PNG_MODULE_PX, PNG_MODULE_PX)
            .build()
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| match e {
                ImageError::IoError(io) => BotError::Io(io),
                other => BotError::Transport(format!("cannot write pairing QR: {other}")),
            })
    }
}
