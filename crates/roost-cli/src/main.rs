//! Roost CLI - household chore rotation over text and voice
//!
//! Usage:
//!   roost init                  Write a default config and an empty state file
//!   roost serve                 Run the webhook server and background ticks
//!   roost preview               Print next week's schedule without sending anything
//!   roost state                 Print the stored household as JSON

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use roost_core::{AssignmentStatus, RoostConfig};
use roost_engine::{
    Dispatcher, JsonFileStore, MemoryStore, RecordingTransport, Snapshot, Store, SystemClock,
};
use roost_server::TwilioClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "roost")]
#[command(author, version, about = "Household chore rotation over text and voice")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "roost.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and an empty state file
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Run the webhook server
    Serve,

    /// Plan next week from the stored household without sending anything
    Preview {
        /// Seed for the rotation shuffle
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the stored household
    State,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { force } => cmd_init(&cli.config, force).await,
        Commands::Serve => cmd_serve(&cli.config).await,
        Commands::Preview { seed } => cmd_preview(&cli.config, seed).await,
        Commands::State => cmd_state(&cli.config).await,
    }
}

fn load_config(path: &Path) -> Result<RoostConfig> {
    RoostConfig::load_or_default(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

async fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    info!("Initializing Roost with {}", config_path.display());

    if config_path.exists() && !force {
        println!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    } else {
        RoostConfig::write_default(config_path).context("Failed to write config")?;
        println!("Created {}", config_path.display());
    }

    let config = load_config(config_path)?;
    if config.store.path.exists() {
        println!("Keeping existing state in {}", config.store.path.display());
    } else {
        JsonFileStore::new(&config.store.path)
            .seed(&Snapshot::default())
            .await
            .context("Failed to create state file")?;
        println!("Created {}", config.store.path.display());
    }

    println!("\nNext steps:");
    println!("  1. Fill in [twilio] and [server].public_url in {}", config_path.display());
    println!(
        "  2. Add people and tasks to {}",
        config.store.path.display()
    );
    println!("  3. roost preview");
    println!("  4. roost serve");
    Ok(())
}

async fn cmd_serve(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let twilio = Arc::new(TwilioClient::new(config.twilio.clone())?);
    let store = Arc::new(JsonFileStore::new(&config.store.path));
    let clock = Arc::new(SystemClock::with_offset_minutes(
        config.calendar.utc_offset_minutes,
    ));

    let dispatcher = Dispatcher::new(store, twilio.clone(), twilio, clock, &config);
    dispatcher
        .load()
        .await
        .context("Failed to load household state")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    println!("Roost running at {}", addr);
    println!("Press Ctrl+C to stop");
    roost_server::serve(Arc::new(dispatcher), &config.timing, &addr).await
}

async fn cmd_preview(config_path: &Path, seed: Option<u64>) -> Result<()> {
    let config = load_config(config_path)?;
    let snapshot = JsonFileStore::new(&config.store.path)
        .load()
        .await
        .context("Failed to read household state")?;

    let transport = Arc::new(RecordingTransport::new());
    let clock = Arc::new(SystemClock::with_offset_minutes(
        config.calendar.utc_offset_minutes,
    ));
    let mut dispatcher = Dispatcher::new(
        Arc::new(MemoryStore::with_snapshot(snapshot)),
        transport.clone(),
        transport.clone(),
        clock,
        &config,
    );
    if let Some(seed) = seed {
        dispatcher = dispatcher.with_seed(seed);
    }
    dispatcher.load().await?;
    dispatcher
        .run_weekly_schedule()
        .await
        .context("Could not plan next week")?;

    let view = dispatcher.snapshot().await;
    println!("Planned assignments:");
    for a in view
        .assignments
        .iter()
        .filter(|a| a.status == AssignmentStatus::Scheduled)
    {
        println!(
            "  {}  {:<20} {}",
            a.due_at.format("%a %-m/%-d %-I:%M %p"),
            a.task,
            a.person
        );
    }

    println!("\nMessages that would be sent:");
    for message in transport.messages() {
        println!("\n--- to {} ---\n{}", message.to, message.body);
    }
    Ok(())
}

async fn cmd_state(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let snapshot = JsonFileStore::new(&config.store.path).load().await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
