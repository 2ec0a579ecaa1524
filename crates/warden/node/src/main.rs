//! Warden Daemon - Access-control node on simulated peripherals
//!
//! Reads commands from stdin:
//! - a hex card uid (e.g. `04A1B2C3`) presents that card
//! - `finger ok`, `finger miss` or `finger <id>` scripts the sensor
//! - `link up` / `link down` flips the network
//! - `button` presses the status button

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_authority::HttpAuthority;
use warden_node::devices::sim::{self, SensorReply, SimHandles};
use warden_node::{Node, NodeConfig, NodeError, NodeResult, StorageConfig};
use warden_types::CredentialUid;

const BUTTON_PRESS: Duration = Duration::from_millis(300);

/// Warden Daemon CLI
#[derive(Parser)]
#[command(name = "wardend")]
#[command(about = "Warden Daemon - Offline-first access-control node", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "WARDEN_CONFIG")]
    config: Option<String>,

    /// Authority server base URL
    #[arg(long, env = "WARDEN_AUTHORITY_URL")]
    authority_url: Option<String>,

    /// Directory holding the cache and attendance logs
    #[arg(long, env = "WARDEN_DATA_DIR")]
    data_dir: Option<String>,

    /// Keep all state in memory
    #[arg(long)]
    memory: bool,

    /// Start with the simulated link down
    #[arg(long)]
    offline: bool,

    /// Log level
    #[arg(long, env = "WARDEN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "WARDEN_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> NodeResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config =
        NodeConfig::load(cli.config.as_deref()).map_err(|e| NodeError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(url) = cli.authority_url {
        config.authority.base_url = url;
    }
    if cli.memory {
        config.storage = StorageConfig::Memory;
    } else if let Some(dir) = cli.data_dir {
        config.storage = StorageConfig::file(dir);
    }
    if cli.offline {
        config.simulation.link_up = false;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        device_id = %config.device.id,
        location = %config.device.location,
        authority = %config.authority.base_url,
        mode = ?config.sync.mode,
        "Starting wardend"
    );

    let authority = Arc::new(HttpAuthority::new(&config.authority.base_url)?);
    let (devices, handles) = sim::devices(&config.simulation);
    tokio::spawn(read_commands(handles, config.simulation.template_id));

    let node = Node::boot(config, devices, authority).await;
    node.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    })
    .await;

    Ok(())
}

/// Drive the simulated peripherals from stdin.
async fn read_commands(handles: SimHandles, template_id: u16) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Could not read stdin");
                return;
            }
        };

        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => {}
            ["button"] => {
                handles.button.set_pressed(true);
                tokio::time::sleep(BUTTON_PRESS).await;
                handles.button.set_pressed(false);
            }
            ["link", "up"] => handles.link.set_connected(true),
            ["link", "down"] => handles.link.set_connected(false),
            ["finger", "miss"] => handles.sensor.set_fallback(SensorReply::NoMatch),
            ["finger", "ok"] => handles.sensor.set_fallback(SensorReply::Match(template_id)),
            ["finger", id] => match id.parse::<u16>() {
                Ok(id) => handles.sensor.set_fallback(SensorReply::Match(id)),
                Err(_) => warn!(input = %line, "Expected a template id"),
            },
            [uid] => match CredentialUid::parse(uid) {
                Ok(uid) => handles.reader.present_uid(&uid),
                Err(e) => warn!(input = %line, error = %e, "Not a card uid"),
            },
            _ => warn!(input = %line, "Unknown command"),
        }
    }
}
