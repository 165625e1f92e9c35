use super::events::{extract_content, WaMedia};
use super::qr::PairingQr;
use super::send::{split_message, RETRY_DELAYS_MS};
use super::WhatsAppConnector;
use std::path::Path;
use wabot_core::config::WhatsAppConfig;
use wabot_core::message::MediaKind;
use wacore_binary::jid::{Jid, JidExt};
use waproto::whatsapp::message::ImageMessage;
use waproto::whatsapp::Message;

#[test]
fn test_split_short_message() {
    let chunks = split_message("hello", 4096);
    assert_eq!(chunks, vec!["hello"]);
}

#[test]
fn test_split_long_message() {
    let text = "a\n".repeat(3000);
    let chunks = split_message(&text, 4096);
    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(chunk.len() <= 4096);
    }
    assert_eq!(chunks.concat(), text);
}

#[test]
fn test_split_respects_char_boundaries() {
    let text = "é".repeat(10);
    let chunks = split_message(&text, 3);
    assert!(chunks.iter().all(|c| c.len() <= 3));
    assert_eq!(chunks.concat(), text);
}

#[test]
fn test_retry_delays_double() {
    assert_eq!(RETRY_DELAYS_MS, [500, 1000, 2000]);
}

#[test]
fn test_jid_group_detection() {
    let group_jid: Jid = "120363001234567890@g.us".parse().unwrap();
    assert!(group_jid.is_group(), "g.us JID should be detected as group");

    let personal_jid: Jid = "5511999887766@s.whatsapp.net".parse().unwrap();
    assert!(
        !personal_jid.is_group(),
        "s.whatsapp.net JID should not be group"
    );
}

#[test]
fn test_extract_plain_conversation() {
    let msg = Message {
        conversation: Some(".ping".into()),
        ..Default::default()
    };
    let raw = extract_content(&msg);
    assert!(raw.has_payload);
    assert_eq!(raw.conversation.as_deref(), Some(".ping"));
    assert!(raw.media.is_none());
}

#[test]
fn test_extract_image_caption_and_media() {
    let msg = Message {
        image_message: Some(Box::new(ImageMessage {
            caption: Some(".sticker".into()),
            mimetype: Some("image/jpeg".into()),
            ..Default::default()
        })),
        ..Default::default()
    };
    let raw = extract_content(&msg);
    assert!(raw.has_payload);
    assert_eq!(raw.image_caption.as_deref(), Some(".sticker"));
    let media = raw.media.as_ref().unwrap();
    assert_eq!(media.kind, MediaKind::Image);
    assert_eq!(media.mimetype.as_deref(), Some("image/jpeg"));
    assert!(media.handle.downcast_ref::<WaMedia>().is_some());
}

#[test]
fn test_extract_empty_message_has_no_payload() {
    let raw = extract_content(&Message::default());
    assert!(!raw.has_payload);
}

#[test]
fn test_session_dir_defaults_under_data_dir() {
    let connector = WhatsAppConnector::new(&WhatsAppConfig::default(), Path::new("/srv/wabot"));
    assert_eq!(connector.session_dir, Path::new("/srv/wabot/session"));
    assert_eq!(connector.device_name, "wabot");
}

fn scratch_dir(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "__wabot_channels_{label}_{}_{}__",
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ))
}

#[test]
fn test_pairing_qr_terminal_uses_half_blocks() {
    let qr = PairingQr::encode("2@pairing-ref,abc,def").unwrap();
    let text = qr.to_terminal();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines.len() > 10);
    assert!(text.chars().any(|c| matches!(c, '▀' | '▄' | '█')));
    // Two module rows per line, so the block is roughly twice as wide as tall.
    let width = lines[0].chars().count();
    assert!(width > lines.len());
}

#[test]
fn test_pairing_qr_save_png() {
    let dir = scratch_dir("qr");
    let path = dir.join("nested").join("qr.png");
    PairingQr::encode("2@pairing-ref").unwrap().save_png(&path).unwrap();

    let png = std::fs::read(&path).unwrap();
    assert_eq!(&png[..4], &[0x89, 0x50, 0x4E, 0x47]);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_pairing_qr_save_png_reports_io_errors() {
    let dir = scratch_dir("qr_blocked");
    std::fs::create_dir_all(&dir).unwrap();
    let blocker = dir.join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();

    let err = PairingQr::encode("2@pairing-ref")
        .unwrap()
        .save_png(&blocker.join("qr.png"))
        .unwrap_err();
    assert!(matches!(err, wabot_core::error::BotError::Io(_)));
    std::fs::remove_dir_all(&dir).ok();
}
