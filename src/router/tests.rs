use super::*;
use crate::commands::{CommandHandler, HandlerCatalog};
use crate::testing::{self, RecordingTransport};
use async_trait::async_trait;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use wabot_core::config::AutoReply;

/// Replies `done: <args>` and counts invocations.
#[derive(Default)]
struct Echo {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CommandHandler for Echo {
    fn description(&self) -> &str {
        "echo"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.reply(format!("done: {}", ctx.arg_text())).await
    }
}

struct Failing;

#[async_trait]
impl CommandHandler for Failing {
    fn description(&self) -> &str {
        "fails"
    }

    async fn run(&self, _ctx: &CommandContext) -> Result<(), BotError> {
        Err(BotError::Command("database on fire".into()))
    }
}

struct Panicking;

#[async_trait]
impl CommandHandler for Panicking {
    fn description(&self) -> &str {
        "panics"
    }

    async fn run(&self, _ctx: &CommandContext) -> Result<(), BotError> {
        panic!("handler bug");
    }
}

struct Slow;

#[async_trait]
impl CommandHandler for Slow {
    fn description(&self) -> &str {
        "slow"
    }

    async fn run(&self, ctx: &CommandContext) -> Result<(), BotError> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        ctx.reply("too late").await
    }
}

struct Fixture {
    router: Arc<Router>,
    transport: Arc<RecordingTransport>,
    echo_calls: Arc<AtomicUsize>,
}

async fn fixture_with(config: RouterConfig) -> Fixture {
    let echo_calls = Arc::new(AtomicUsize::new(0));
    let catalog = HandlerCatalog::new()
        .with(
            "echo",
            Echo {
                calls: echo_calls.clone(),
            },
        )
        .with("fail", Failing)
        .with("boom", Panicking)
        .with("slow", Slow);
    let registry = Arc::new(CommandRegistry::new(
        testing::temp_dir("router"),
        '.',
        Arc::new(catalog),
    ));
    Fixture {
        router: Arc::new(Router::new(registry, config, '.')),
        transport: RecordingTransport::new(),
        echo_calls,
    }
}

async fn fixture() -> Fixture {
    fixture_with(RouterConfig::default()).await
}

fn inbound(chat: &str, text: &str) -> InboundMessage {
    normalize(testing::text_message(chat, text))
}

/// Let every debounce timer fire.
async fn settle() {
    tokio::time::sleep(Duration::from_secs(1)).await;
}

// --- normalize ---

#[test]
fn test_normalize_text_precedence() {
    let mut raw = testing::text_message("1@s.whatsapp.net", "  ");
    raw.extended_text = Some("reply body".into());
    raw.image_caption = Some("caption".into());
    assert_eq!(normalize(raw).text, "reply body");

    let mut raw = testing::text_message("1@s.whatsapp.net", "");
    raw.conversation = None;
    raw.video_caption = Some(".sticker".into());
    assert_eq!(normalize(raw).text, ".sticker");

    let mut raw = testing::text_message("1@s.whatsapp.net", "");
    raw.conversation = None;
    raw.document_caption = Some("doc".into());
    assert_eq!(normalize(raw).text, "doc");
}

#[test]
fn test_normalize_sender_and_flags() {
    let mut raw = testing::text_message("123@g.us", "hi");
    raw.participant = Some("628@s.whatsapp.net".into());
    let msg = normalize(raw);
    assert_eq!(msg.sender_id, "628@s.whatsapp.net");
    assert_eq!(msg.chat_id, "123@g.us");
    assert!(!msg.is_broadcast);

    let msg = normalize(testing::text_message("status@broadcast", "hi"));
    assert_eq!(msg.sender_id, "status@broadcast");
    assert!(msg.is_broadcast);
}

#[test]
fn test_drop_reasons() {
    let now = chrono::Utc::now();
    let limit = Duration::from_secs(30);

    let ok = inbound("1@s.whatsapp.net", "hi");
    assert_eq!(drop_reason(&ok, now, limit), None);

    let mut own = testing::text_message("1@s.whatsapp.net", "hi");
    own.from_me = true;
    assert_eq!(drop_reason(&normalize(own), now, limit), Some(DropReason::FromSelf));

    let cast = inbound("status@broadcast", "hi");
    assert_eq!(drop_reason(&cast, now, limit), Some(DropReason::Broadcast));

    let mut stub = testing::text_message("1@s.whatsapp.net", "");
    stub.has_payload = false;
    assert_eq!(drop_reason(&normalize(stub), now, limit), Some(DropReason::NoPayload));

    let mut old = testing::text_message("1@s.whatsapp.net", "hi");
    old.timestamp = now - chrono::Duration::seconds(31);
    assert_eq!(drop_reason(&normalize(old), now, limit), Some(DropReason::Stale));

    let mut recent = testing::text_message("1@s.whatsapp.net", "hi");
    recent.timestamp = now - chrono::Duration::seconds(29);
    assert_eq!(drop_reason(&normalize(recent), now, limit), None);
}

// --- dispatch ---

#[tokio::test]
async fn test_dispatch_resolves_command_with_args() {
    let f = fixture().await;
    let outcome = f
        .router
        .dispatch(f.transport.clone(), inbound("1@s.whatsapp.net", ".ECHO a  b"))
        .await;
    assert_eq!(outcome, DispatchOutcome::Executed(".ECHO".into()));
    assert_eq!(f.transport.texts(), vec!["done: a b"]);
    assert_eq!(f.transport.sent()[0].0, "1@s.whatsapp.net");
}

#[tokio::test]
async fn test_dispatch_unknown_command() {
    let f = fixture().await;
    let outcome = f
        .router
        .dispatch(f.transport.clone(), inbound("1@s.whatsapp.net", ".unknowncmd foo"))
        .await;
    assert_eq!(outcome, DispatchOutcome::NotFound(".unknowncmd".into()));
    assert_eq!(
        f.transport.texts(),
        vec!["❌ Command .unknowncmd not found. Type .help to see the list of available commands."]
    );
}

#[tokio::test]
async fn test_handler_error_sends_one_generic_reply() {
    let f = fixture().await;
    let outcome = f
        .router
        .dispatch(f.transport.clone(), inbound("1@s.whatsapp.net", ".fail"))
        .await;
    assert_eq!(outcome, DispatchOutcome::Failed(".fail".into()));
    let texts = f.transport.texts();
    assert_eq!(
        texts,
        vec!["❌ An error occurred while processing your command .fail."]
    );
    assert!(!texts[0].contains("database"), "details stay in the log");
}

#[tokio::test]
async fn test_handler_panic_is_contained() {
    let f = fixture().await;
    let outcome = f
        .router
        .dispatch(f.transport.clone(), inbound("1@s.whatsapp.net", ".boom"))
        .await;
    assert_eq!(outcome, DispatchOutcome::Failed(".boom".into()));
    assert_eq!(f.transport.texts().len(), 1);

    // Router still works afterwards.
    let outcome = f
        .router
        .dispatch(f.transport.clone(), inbound("1@s.whatsapp.net", ".echo"))
        .await;
    assert_eq!(outcome, DispatchOutcome::Executed(".echo".into()));
}

#[tokio::test(start_paused = true)]
async fn test_handler_timeout() {
    let f = fixture_with(RouterConfig {
        command_timeout_secs: 1,
        ..Default::default()
    })
    .await;
    let outcome = f
        .router
        .dispatch(f.transport.clone(), inbound("1@s.whatsapp.net", ".slow"))
        .await;
    assert_eq!(outcome, DispatchOutcome::Failed(".slow".into()));
    settle().await;
    assert_eq!(
        f.transport.texts(),
        vec!["❌ An error occurred while processing your command .slow."]
    );
}

#[tokio::test]
async fn test_auto_reply_first_match_case_insensitive() {
    let f = fixture_with(RouterConfig {
        auto_replies: vec![
            AutoReply {
                triggers: vec!["hello".into(), "hi there".into()],
                response: "greeting".into(),
            },
            AutoReply {
                triggers: vec!["HELLO".into()],
                response: "second".into(),
            },
        ],
        ..Default::default()
    })
    .await;

    let outcome = f
        .router
        .dispatch(f.transport.clone(), inbound("1@s.whatsapp.net", "Well HELLO friend"))
        .await;
    assert_eq!(outcome, DispatchOutcome::AutoReplied(0));
    assert_eq!(f.transport.texts(), vec!["greeting"]);

    let outcome = f
        .router
        .dispatch(f.transport.clone(), inbound("1@s.whatsapp.net", "nothing to see"))
        .await;
    assert_eq!(outcome, DispatchOutcome::Ignored);
    assert_eq!(f.transport.texts().len(), 1);
}

#[tokio::test]
async fn test_plain_text_never_resolves_commands() {
    let f = fixture_with(RouterConfig {
        auto_replies: Vec::new(),
        ..Default::default()
    })
    .await;
    let outcome = f
        .router
        .dispatch(f.transport.clone(), inbound("1@s.whatsapp.net", "echo hi"))
        .await;
    assert_eq!(outcome, DispatchOutcome::Ignored);
    assert_eq!(f.echo_calls.load(Ordering::SeqCst), 0);
    assert!(f.transport.sent().is_empty());
}

// --- route / debounce ---

#[tokio::test(start_paused = true)]
async fn test_route_drops_self_and_broadcast() {
    let f = fixture().await;
    let mut own = testing::text_message("1@s.whatsapp.net", ".echo");
    own.from_me = true;
    f.router.route(f.transport.clone(), own).await;
    f.router
        .route(f.transport.clone(), testing::text_message("x@broadcast", ".echo"))
        .await;
    assert_eq!(f.router.pending_count().await, 0);

    settle().await;
    assert!(f.transport.sent().is_empty());
    assert_eq!(f.echo_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_route_drops_stale() {
    let f = fixture().await;
    let mut old = testing::text_message("1@s.whatsapp.net", ".echo");
    old.timestamp = chrono::Utc::now() - chrono::Duration::seconds(120);
    f.router.route(f.transport.clone(), old).await;
    settle().await;
    assert!(f.transport.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_debounce_keeps_only_latest_in_window() {
    let f = fixture().await;
    for text in [".echo one", ".echo two", ".echo three"] {
        f.router
            .route(f.transport.clone(), testing::text_message("1@s.whatsapp.net", text))
            .await;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(f.router.pending_count().await, 1);

    settle().await;
    assert_eq!(f.echo_calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.transport.texts(), vec!["done: three"]);
    assert_eq!(f.router.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_waits_for_window() {
    let f = fixture().await;
    f.router
        .route(f.transport.clone(), testing::text_message("1@s.whatsapp.net", ".echo"))
        .await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(f.transport.sent().is_empty());
    settle().await;
    assert_eq!(f.transport.texts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_messages_outside_window_both_dispatch() {
    let f = fixture().await;
    f.router
        .route(f.transport.clone(), testing::text_message("1@s.whatsapp.net", ".echo a"))
        .await;
    settle().await;
    f.router
        .route(f.transport.clone(), testing::text_message("1@s.whatsapp.net", ".echo b"))
        .await;
    settle().await;
    assert_eq!(f.transport.texts(), vec!["done: a", "done: b"]);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_is_per_chat() {
    let f = fixture().await;
    f.router
        .route(f.transport.clone(), testing::text_message("1@s.whatsapp.net", ".echo a"))
        .await;
    f.router
        .route(f.transport.clone(), testing::text_message("2@s.whatsapp.net", ".echo b"))
        .await;
    assert_eq!(f.router.pending_count().await, 2);

    settle().await;
    let mut sent: Vec<_> = f
        .transport
        .sent()
        .into_iter()
        .map(|(chat, p)| (chat, p.as_text().unwrap_or_default().to_string()))
        .collect();
    sent.sort();
    assert_eq!(
        sent,
        vec![
            ("1@s.whatsapp.net".to_string(), "done: a".to_string()),
            ("2@s.whatsapp.net".to_string(), "done: b".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_all_aborts_pending() {
    let f = fixture().await;
    f.router
        .route(f.transport.clone(), testing::text_message("1@s.whatsapp.net", ".echo"))
        .await;
    f.router.cancel_all().await;
    assert_eq!(f.router.pending_count().await, 0);
    settle().await;
    assert!(f.transport.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_scenario_ping_reports_uptime() {
    let registry = testing::builtin_registry().await;
    let router = Arc::new(Router::new(registry, RouterConfig::default(), '.'));
    let transport = RecordingTransport::new();

    router
        .route(transport.clone(), testing::text_message("1@s.whatsapp.net", ".ping"))
        .await;
    settle().await;

    let texts = transport.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("Uptime:"));
}

#[tokio::test(start_paused = true)]
async fn test_scenario_hello_auto_reply_once() {
    let f = fixture().await;
    f.router
        .route(f.transport.clone(), testing::text_message("1@s.whatsapp.net", "hello there"))
        .await;
    settle().await;

    let expected = RouterConfig::default()
        .auto_replies
        .into_iter()
        .find(|r| r.matches("hello there"))
        .map(|r| r.response)
        .unwrap();
    assert_eq!(f.transport.texts(), vec![expected]);
}

#[tokio::test]
async fn test_lazy_registry_load_on_first_command() {
    let f = fixture().await;
    assert!(!f.router.registry.is_loaded());
    f.router
        .dispatch(f.transport.clone(), inbound("1@s.whatsapp.net", ".echo"))
        .await;
    assert!(f.router.registry.is_loaded());
}
