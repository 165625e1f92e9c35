use super::loader::{is_eligible, scan, seed, token_for};
use super::*;
use crate::commands::{CommandContext, HandlerCatalog};
use crate::testing;
use async_trait::async_trait;
use std::path::Path;

struct Named(&'static str);

#[async_trait]
impl CommandHandler for Named {
    fn description(&self) -> &str {
        self.0
    }

    async fn run(&self, _ctx: &CommandContext) -> Result<(), BotError> {
        Ok(())
    }
}

fn catalog() -> Arc<HandlerCatalog> {
    Arc::new(
        HandlerCatalog::new()
            .with("ping", Named("ping handler"))
            .with("help", Named("help handler"))
            .alias("menu", "help"),
    )
}

fn write(dir: &Path, name: &str, body: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), body).unwrap();
}

#[test]
fn test_token_for_lowercases() {
    assert_eq!(token_for('.', "Ping"), ".ping");
    assert_eq!(token_for('!', "help"), "!help");
}

#[test]
fn test_is_eligible() {
    assert!(is_eligible(Path::new("/c/ping.toml")));
    assert!(!is_eligible(Path::new("/c/ping.txt")));
    assert!(!is_eligible(Path::new("/c/.hidden.toml")));
    assert!(!is_eligible(Path::new("/c/ping.schema.toml")));
    assert!(!is_eligible(Path::new("/c/ping.d.toml")));
    assert!(!is_eligible(Path::new("/c/index.toml")));
    assert!(!is_eligible(Path::new("/c/CommandIndex.toml")));
    assert!(!is_eligible(Path::new("/c/.toml")));
}

#[test]
fn test_scan_skips_bad_entries() {
    let dir = testing::temp_dir("scan_bad");
    write(&dir, "ping.toml", "handler = \"ping\"\n");
    write(&dir, "broken.toml", "handler = [not toml");
    write(&dir, "ghost.toml", "handler = \"does-not-exist\"\n");
    write(&dir, "index.toml", "handler = \"ping\"\n");
    write(&dir, "notes.md", "# readme");

    let commands = scan(&dir, '.', &catalog()).unwrap();
    let tokens: Vec<_> = commands.iter().map(|c| c.token.as_str()).collect();
    assert_eq!(tokens, vec![".ping"]);
}

#[test]
fn test_scan_disabled_and_description_fallback() {
    let dir = testing::temp_dir("scan_desc");
    write(&dir, "help.toml", "handler = \"help\"\ndescription = \"Custom help\"\n");
    write(&dir, "ping.toml", "handler = \"ping\"\ndescription = \"  \"\n");
    write(&dir, "menu.toml", "handler = \"help\"\nenabled = false\n");

    let commands = scan(&dir, '.', &catalog()).unwrap();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].token, ".help");
    assert_eq!(commands[0].description, "Custom help");
    assert_eq!(commands[1].token, ".ping");
    assert_eq!(commands[1].description, "ping handler");
    assert_eq!(commands[1].source_ref, dir.join("ping.toml"));
}

#[test]
fn test_scan_duplicate_token_keeps_first() {
    let dir = testing::temp_dir("scan_dup");
    write(&dir, "Ping.toml", "handler = \"help\"\n");
    write(&dir, "ping.toml", "handler = \"ping\"\n");

    let commands = scan(&dir, '.', &catalog()).unwrap();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].handler_id, "help", "Ping.toml sorts first");
}

#[test]
fn test_seed_never_overwrites() {
    let dir = testing::temp_dir("seed");
    write(&dir, "ping.toml", "handler = \"help\"\n");

    let written = seed(&dir, &catalog()).unwrap();
    assert_eq!(written, 2, "help and menu");
    let ping = std::fs::read_to_string(dir.join("ping.toml")).unwrap();
    assert_eq!(ping, "handler = \"help\"\n");
    let menu = std::fs::read_to_string(dir.join("menu.toml")).unwrap();
    assert!(menu.contains("handler = \"help\""));
    assert!(menu.contains("help handler"));
}

#[tokio::test]
async fn test_load_seeds_missing_directory() {
    let dir = testing::temp_dir("registry_seed");
    let registry = CommandRegistry::new(&dir, '.', catalog());
    assert!(!registry.is_loaded());

    let count = registry.load().await.unwrap();
    assert_eq!(count, 3);
    assert!(dir.join("ping.toml").exists());
    assert!(registry.is_loaded());
}

#[tokio::test]
async fn test_resolve_is_case_insensitive() {
    let registry = CommandRegistry::new(testing::temp_dir("resolve"), '.', catalog());
    registry.load().await.unwrap();

    assert_eq!(registry.resolve(".PING").await.unwrap().token, ".ping");
    assert_eq!(registry.resolve(".Menu").await.unwrap().handler_id, "help");
    assert!(registry.resolve(".nope").await.is_none());
    assert!(registry.resolve("ping").await.is_none(), "prefix is part of the token");
}

#[tokio::test]
async fn test_resolve_before_load_is_empty() {
    let registry = CommandRegistry::new(testing::temp_dir("unloaded"), '.', catalog());
    assert!(registry.resolve(".ping").await.is_none());
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_ensure_loaded_loads_once() {
    let dir = testing::temp_dir("lazy");
    let registry = CommandRegistry::new(&dir, '.', catalog());
    registry.ensure_loaded().await.unwrap();
    assert_eq!(registry.len().await, 3);

    // Disk changes are not picked up without an explicit reload.
    std::fs::remove_file(dir.join("ping.toml")).unwrap();
    registry.ensure_loaded().await.unwrap();
    assert_eq!(registry.len().await, 3);
}

#[tokio::test]
async fn test_reload_swaps_table() {
    let dir = testing::temp_dir("reload");
    let registry = CommandRegistry::new(&dir, '.', catalog());
    registry.load().await.unwrap();
    let old = registry.resolve(".ping").await.unwrap();

    std::fs::remove_file(dir.join("ping.toml")).unwrap();
    write(&dir, "pong.toml", "handler = \"ping\"\n");
    let count = registry.reload().await.unwrap();

    assert_eq!(count, 3);
    assert!(registry.resolve(".ping").await.is_none());
    assert!(registry.resolve(".pong").await.is_some());
    // An entry resolved before the reload stays usable.
    assert_eq!(old.token, ".ping");
}

#[tokio::test]
async fn test_concurrent_resolve_during_reload() {
    let dir = testing::temp_dir("reload_race");
    let registry = Arc::new(CommandRegistry::new(&dir, '.', catalog()));
    registry.load().await.unwrap();

    let reader = {
        let registry = registry.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                let len = registry.len().await;
                assert_eq!(len, 3, "never observes a partial table");
                tokio::task::yield_now().await;
            }
        })
    };
    for _ in 0..20 {
        registry.reload().await.unwrap();
    }
    reader.await.unwrap();
}

#[tokio::test]
async fn test_empty_directory_loads_zero() {
    let dir = testing::temp_dir("empty");
    std::fs::create_dir_all(&dir).unwrap();
    let registry = CommandRegistry::new(&dir, '.', catalog());
    assert_eq!(registry.load().await.unwrap(), 0);
    assert!(registry.is_loaded());
}

#[tokio::test]
async fn test_list_in_load_order() {
    let registry = CommandRegistry::new(testing::temp_dir("list"), '.', catalog());
    registry.load().await.unwrap();
    let tokens: Vec<_> = registry.list().await.into_iter().map(|c| c.token).collect();
    assert_eq!(tokens, vec![".help", ".menu", ".ping"]);
}
