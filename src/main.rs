mod bot;
mod commands;
mod lifecycle;
mod logging;
mod registry;
mod render;
mod router;

#[cfg(test)]
mod testing;

use bot::{Bot, TerminalQr};
use clap::{Parser, Subcommand};
use commands::{HandlerCatalog, Services, JOKE_API_URL};
use registry::CommandRegistry;
use render::Renderer;
use router::Router;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use wabot_channels::whatsapp::WhatsAppConnector;
use wabot_core::config::{self, Config};

#[derive(Parser)]
#[command(name = "wabot", version, about = "WhatsApp command bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to WhatsApp and serve commands.
    Start,
    /// Show configuration and external tool availability.
    Status,
    /// List the commands the registry would load.
    Commands,
    /// Write a default config and seed the command directory.
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let data_dir = cfg.data_dir();

    let log_dir = matches!(cli.command, Commands::Start).then(|| data_dir.join("logs"));
    let _log_guard = logging::init(&cfg.bot.log_level, log_dir.as_deref())?;

    match cli.command {
        Commands::Start => run(cfg, &data_dir).await?,
        Commands::Status => status(&cli.config, &cfg, &data_dir).await,
        Commands::Commands => list_commands(&cfg, &data_dir).await?,
        Commands::Init => init(&cli.config, &cfg, &data_dir)?,
    }

    Ok(())
}

fn build_services(cfg: &Config, data_dir: &Path) -> Arc<Services> {
    Arc::new(Services {
        bot: cfg.bot.clone(),
        started: Instant::now(),
        renderer: Arc::new(Renderer::from_config(&cfg.render, data_dir)),
        http: reqwest::Client::new(),
        joke_url: JOKE_API_URL.to_string(),
    })
}

fn build_registry(cfg: &Config, data_dir: &Path) -> Arc<CommandRegistry> {
    let catalog = Arc::new(HandlerCatalog::builtin(build_services(cfg, data_dir)));
    Arc::new(CommandRegistry::new(
        cfg.commands.directory(data_dir),
        cfg.bot.prefix,
        catalog,
    ))
}

async fn run(cfg: Config, data_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)?;
    println!("{} - starting WhatsApp bot...", cfg.bot.name);

    let registry = build_registry(&cfg, data_dir);
    registry.load().await?;

    let router = Arc::new(Router::new(
        registry,
        cfg.router.clone(),
        cfg.bot.prefix,
    ));
    let connector = Arc::new(WhatsAppConnector::new(&cfg.whatsapp, data_dir));
    let qr = Arc::new(TerminalQr::new(data_dir));
    let bot = Arc::new(Bot::new(connector, router, qr, cfg.reconnect.clone()));

    bot.start().await;

    tokio::select! {
        _ = shutdown_signal() => info!("received shutdown signal"),
        _ = bot.wait_terminal() => info!("connection ended permanently"),
    }

    bot.stop().await;
    info!("{} stopped", cfg.bot.name);
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("cannot listen for SIGTERM: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn status(config_path: &str, cfg: &Config, data_dir: &Path) {
    println!("{} - status\n", cfg.bot.name);
    println!("Config:    {config_path}");
    println!("Data dir:  {}", data_dir.display());
    println!("Prefix:    {}", cfg.bot.prefix);
    println!("Admins:    {}", cfg.bot.admins.len());

    let session_db = WhatsAppConnector::new(&cfg.whatsapp, data_dir).session_db_path();
    println!(
        "Session:   {}",
        if Path::new(&session_db).exists() {
            "paired"
        } else {
            "not paired (run `wabot start` and scan the QR code)"
        }
    );
    println!();

    let renderer = Renderer::from_config(&cfg.render, data_dir);
    let caps = renderer.encoder().capabilities().await;
    println!(
        "  ffmpeg:   {}",
        if caps.ffmpeg_available {
            caps.version.as_str()
        } else {
            "not found"
        }
    );
    println!(
        "  text:     {}",
        if caps.text_ready() { "ready" } else { "unavailable" }
    );
    println!(
        "  emoji:    {}",
        caps.emoji_font.as_deref().unwrap_or("no emoji font found")
    );
    println!("  browser:  {}", cfg.render.browser);
}

async fn list_commands(cfg: &Config, data_dir: &Path) -> anyhow::Result<()> {
    let registry = build_registry(cfg, data_dir);
    registry.load().await?;

    println!("Commands in {}:\n", registry.dir().display());
    for cmd in registry.list().await {
        println!("  {:<12} {:<10} {}", cmd.token, cmd.handler_id, cmd.description);
    }
    println!("\n{} commands", registry.len().await);
    Ok(())
}

fn init(config_path: &str, cfg: &Config, data_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)?;

    let path = Path::new(config_path);
    if path.exists() {
        println!("Config {config_path} already exists, leaving it untouched.");
    } else {
        std::fs::write(path, Config::default().to_toml()?)?;
        println!("Wrote default config to {config_path}");
    }

    let dir = cfg.commands.directory(data_dir);
    let catalog = HandlerCatalog::builtin(build_services(cfg, data_dir));
    let written = registry::loader::seed(&dir, &catalog)?;
    println!("Seeded {written} command manifests in {}", dir.display());
    Ok(())
}
