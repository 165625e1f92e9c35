//! # wabot-channels
//!
//! WhatsApp transport for wabot, built on `whatsapp-rust`.

pub mod whatsapp;
