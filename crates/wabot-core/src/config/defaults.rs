//! Default values for serde `#[serde(default = "...")]` attributes.

use super::AutoReply;

pub(super) fn default_name() -> String {
    "wabot".to_string()
}
pub(super) fn default_data_dir() -> String {
    "~/.wabot".to_string()
}
pub(super) fn default_log_level() -> String {
    "info".to_string()
}
pub(super) fn default_prefix() -> char {
    '.'
}
pub(super) fn default_device_name() -> String {
    "wabot".to_string()
}

pub(super) fn default_debounce_ms() -> u64 {
    500
}
pub(super) fn default_stale_after_secs() -> u64 {
    30
}
pub(super) fn default_command_timeout_secs() -> u64 {
    120
}

pub(super) fn default_max_attempts() -> u32 {
    5
}
pub(super) fn default_conflict_base_secs() -> u64 {
    30
}
pub(super) fn default_conflict_cap_secs() -> u64 {
    300
}
pub(super) fn default_retry_delay_secs() -> u64 {
    3
}
pub(super) fn default_conflict_reset_secs() -> u64 {
    300
}
pub(super) fn default_start_retry_secs() -> u64 {
    5
}
pub(super) fn default_restart_delay_secs() -> u64 {
    1
}

pub(super) fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}
pub(super) fn default_ffprobe() -> String {
    "ffprobe".to_string()
}
pub(super) fn default_browser() -> String {
    "chromium".to_string()
}
pub(super) fn default_render_timeout_secs() -> u64 {
    60
}

pub(super) fn default_auto_replies() -> Vec<AutoReply> {
    let pair = |triggers: &[&str], response: &str| AutoReply {
        triggers: triggers.iter().map(|t| t.to_string()).collect(),
        response: response.to_string(),
    };
    vec![
        pair(
            &["hello", "hi", "hey", "halo"],
            "👋 Hello! Welcome to the WhatsApp bot.\n\nType .help to see the available commands!",
        ),
        pair(
            &["good morning", "selamat pagi"],
            "🌅 Good morning! Have a great day!",
        ),
        pair(
            &["good night", "selamat malam"],
            "🌙 Good night! Sleep well!",
        ),
        pair(
            &["thank you", "thanks", "terima kasih"],
            "😊 You're welcome! Happy to help.",
        ),
    ]
}
