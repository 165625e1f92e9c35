use super::*;
use std::path::Path;
use std::time::Duration;

#[test]
fn test_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.bot.name, "wabot");
    assert_eq!(cfg.bot.prefix, '.');
    assert!(cfg.bot.admins.is_empty());
    assert_eq!(cfg.router.debounce(), Duration::from_millis(500));
    assert_eq!(cfg.router.stale_after(), Duration::from_secs(30));
    assert_eq!(cfg.router.command_timeout(), Some(Duration::from_secs(120)));
    assert_eq!(cfg.reconnect.max_attempts, 5);
    assert_eq!(cfg.reconnect.conflict_base(), Duration::from_secs(30));
    assert_eq!(cfg.reconnect.conflict_cap(), Duration::from_secs(300));
    assert_eq!(cfg.reconnect.start_retry(), Duration::from_secs(5));
    assert_eq!(cfg.reconnect.restart_delay(), Duration::from_secs(1));
    assert_eq!(cfg.render.ffmpeg, "ffmpeg");
    assert_eq!(cfg.whatsapp.device_name, "wabot");
}

#[test]
fn test_empty_toml_uses_defaults() {
    let cfg = parse("").unwrap();
    assert_eq!(cfg.bot.data_dir, "~/.wabot");
    assert_eq!(cfg.router.auto_replies.len(), 4);
}

#[test]
fn test_partial_override() {
    let cfg = parse(
        r#"
        [bot]
        prefix = "!"
        admins = ["628123456789"]

        [router]
        debounce_ms = 250
        command_timeout_secs = 0

        [reconnect]
        max_attempts = 2
    "#,
    )
    .unwrap();
    assert_eq!(cfg.bot.prefix, '!');
    assert_eq!(cfg.bot.name, "wabot");
    assert_eq!(cfg.router.debounce(), Duration::from_millis(250));
    assert_eq!(cfg.router.stale_after_secs, 30);
    assert_eq!(cfg.router.command_timeout(), None);
    assert_eq!(cfg.reconnect.max_attempts, 2);
    assert_eq!(cfg.reconnect.conflict_cap_secs, 300);
}

#[test]
fn test_custom_auto_replies_replace_defaults() {
    let cfg = parse(
        r#"
        [[router.auto_replies]]
        triggers = ["ping?"]
        response = "pong!"
    "#,
    )
    .unwrap();
    assert_eq!(cfg.router.auto_replies.len(), 1);
    assert!(cfg.router.auto_replies[0].matches("ping? anyone"));
}

#[test]
fn test_auto_reply_matches_case_insensitive_triggers() {
    let reply = AutoReply {
        triggers: vec!["Good Morning".into(), String::new()],
        response: "morning".into(),
    };
    assert!(reply.matches("well, good morning all"));
    assert!(!reply.matches("good evening"));
}

#[test]
fn test_invalid_toml_is_config_error() {
    let err = parse("[bot\nname = 1").unwrap_err();
    assert!(matches!(err, BotError::Config(_)));
}

#[test]
fn test_load_missing_file_falls_back() {
    let cfg = load("/nonexistent/__wabot_config__.toml").unwrap();
    assert_eq!(cfg.bot.name, "wabot");
}

#[test]
fn test_to_toml_roundtrips_overrides() {
    let mut cfg = Config::default();
    cfg.bot.admins = vec!["628111".into()];
    cfg.render.font_path = Some("/usr/share/fonts/DejaVuSans-Bold.ttf".into());
    let text = cfg.to_toml().unwrap();
    let back = parse(&text).unwrap();
    assert_eq!(back.bot.admins, vec!["628111".to_string()]);
    assert_eq!(back.render.font_path, cfg.render.font_path);
}

#[test]
fn test_is_admin_matches_number_or_jid() {
    let bot = BotConfig {
        admins: vec!["628111".into(), "628222@s.whatsapp.net".into()],
        ..Default::default()
    };
    assert!(bot.is_admin("628111@s.whatsapp.net"));
    assert!(bot.is_admin("628111:3@s.whatsapp.net"));
    assert!(bot.is_admin("628222@s.whatsapp.net"));
    assert!(!bot.is_admin("628333@s.whatsapp.net"));
}

#[test]
fn test_derived_directories() {
    let cfg = Config::default();
    let data = Path::new("/srv/wabot");
    assert_eq!(cfg.commands.directory(data), data.join("commands"));
    assert_eq!(cfg.whatsapp.session_dir(data), data.join("session"));
    assert_eq!(cfg.render.temp_dir(data), data.join("tmp"));

    let custom = CommandsConfig {
        directory: Some("/etc/wabot/commands".into()),
    };
    assert_eq!(
        custom.directory(data),
        Path::new("/etc/wabot/commands").to_path_buf()
    );
}

#[test]
fn test_shellexpand_leaves_absolute_paths() {
    assert_eq!(shellexpand("/tmp/x"), "/tmp/x");
    if std::env::var_os("HOME").is_some() {
        assert!(!shellexpand("~/x").starts_with('~'));
    }
}
