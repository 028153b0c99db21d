use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use cli::api::{self, AppState};
use cli::bot;
use cli::uploads::{given_date, save_upload};
use fridge_core::config::{self, AppConfig};
use fridge_core::extractor::Extractor;
use fridge_core::inventory::{days_left, ConsumeOutcome};
use fridge_core::pipeline;
use providers::telegram::{TelegramBot, TelegramConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => run_serve(cfg, bind).await,
        Commands::Add {
            name,
            user,
            date,
            photo,
            json,
        } => run_add(cfg, &name, &user, date.as_deref(), photo.as_deref(), json).await,
        Commands::List { user, json } => run_list(cfg, user.as_deref(), json).await,
        Commands::Consume { id } => run_consume(cfg, id).await,
        Commands::Scan { photo, json } => run_scan(cfg, &photo, json).await,
        Commands::Extract { text } => {
            match Extractor::default().extract(&text) {
                Some(date) => println!("{}", date),
                None => println!("no date found"),
            }
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(name = "fridgekeeper")]
#[command(about = "Shared fridge inventory with expiry dates read from photos", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (and the chat bot when a token is configured)
    Serve {
        /// Address to bind, overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Add an item with a manual date or a photo of its label
    Add {
        /// Product name
        name: String,
        /// Owning user id
        #[arg(long)]
        user: String,
        /// Expiry date as YYYY-MM-DD; wins over --photo
        #[arg(long)]
        date: Option<String>,
        /// Photo of the packaging or receipt
        #[arg(long)]
        photo: Option<PathBuf>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// List items still in the fridge
    List {
        /// Only items of this user
        #[arg(long)]
        user: Option<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark an item as consumed
    Consume {
        /// Item id
        id: i64,
    },
    /// Read the expiry date from a photo without storing anything
    Scan {
        /// Photo to read; it is copied before compression
        photo: PathBuf,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Run date extraction on a piece of text
    Extract {
        /// Text as a recognition service would return it
        text: String,
    },
}

async fn run_serve(cfg: AppConfig, bind: Option<String>) -> Result<()> {
    let inventory = pipeline::build_inventory(&cfg).await?;
    let state = Arc::new(AppState {
        inventory,
        upload_dir: PathBuf::from(&cfg.server.upload_dir),
    });
    let app = api::build_router(state, cfg.server.max_body_bytes);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let bot_task = cfg.bot.token.clone().filter(|t| !t.is_empty()).map(|token| {
        let telegram = TelegramBot::new(TelegramConfig {
            token,
            base_url: cfg.bot.base_url.clone(),
            web_app_url: cfg.bot.web_app_url.clone(),
        });
        tokio::spawn(bot::run(
            telegram,
            Duration::from_secs(cfg.bot.poll_timeout_secs),
            shutdown_rx,
        ))
    });
    if bot_task.is_none() {
        info!("no bot token configured, chat bot disabled");
    }

    let addr = bind.unwrap_or_else(|| cfg.server.bind.clone());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {}", addr))?;
    info!(addr = %addr, "HTTP API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(task) = bot_task {
        let _ = task.await;
    }
    Ok(())
}

async fn run_add(
    cfg: AppConfig,
    name: &str,
    user: &str,
    date: Option<&str>,
    photo: Option<&Path>,
    json: bool,
) -> Result<()> {
    let inventory = pipeline::build_inventory(&cfg).await?;
    let date = given_date(date);
    let stored_photo = match (date, photo) {
        (None, Some(p)) => {
            let data = tokio::fs::read(p)
                .await
                .with_context(|| format!("read {}", p.display()))?;
            let file_name = p.file_name().and_then(|n| n.to_str());
            Some(save_upload(Path::new(&cfg.server.upload_dir), file_name, &data).await?)
        }
        _ => None,
    };
    let reg = inventory
        .register(name, user, date, stored_photo.as_deref())
        .await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&reg)?);
    } else {
        println!("added #{} {}: {}", reg.item.id, reg.item.name, reg.expiry.display_status);
    }
    Ok(())
}

async fn run_list(cfg: AppConfig, user: Option<&str>, json: bool) -> Result<()> {
    let inventory = pipeline::build_inventory(&cfg).await?;
    let items = inventory.list_active(user).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    let today = Local::now().date_naive();
    for item in &items {
        let expiry = match (item.expiry_date, days_left(item, today)) {
            (Some(date), Some(days)) if days < 0 => format!("{} (expired {} days ago)", date, -days),
            (Some(date), Some(days)) => format!("{} ({} days left)", date, days),
            _ => "no date".to_string(),
        };
        println!("#{:<5} {:<24} {:<12} {}", item.id, item.name, item.user_id, expiry);
    }
    println!("{} item(s)", items.len());
    Ok(())
}

async fn run_consume(cfg: AppConfig, id: i64) -> Result<()> {
    let inventory = pipeline::build_inventory(&cfg).await?;
    match inventory.consume(id).await? {
        ConsumeOutcome::Consumed => println!("item #{} consumed", id),
        ConsumeOutcome::NotFound => println!("item #{} not found", id),
    }
    Ok(())
}

async fn run_scan(cfg: AppConfig, photo: &Path, json: bool) -> Result<()> {
    let resolver = pipeline::build_resolver(&cfg)?;
    let data = tokio::fs::read(photo)
        .await
        .with_context(|| format!("read {}", photo.display()))?;
    let scratch = std::env::temp_dir().join("fridgekeeper-scan");
    let copy = save_upload(&scratch, photo.file_name().and_then(|n| n.to_str()), &data).await?;
    let result = resolver.resolve(None, Some(&copy)).await;
    let _ = tokio::fs::remove_file(&copy).await;
    let expiry = result?;
    if json {
        println!("{}", serde_json::to_string_pretty(&expiry)?);
    } else {
        println!("{}", expiry.display_status);
    }
    Ok(())
}
