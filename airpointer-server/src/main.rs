//! AirPointer server entry point.
//!
//! ```text
//! airpointer-server                   Run with airpointer-server.toml
//! airpointer-server --config <path>   Load a custom config TOML
//! airpointer-server --port 6000       Override the listen port
//! airpointer-server --dry-run         Log pointer actions instead of performing them
//! airpointer-server --gen-config      Write default config to stdout
//! airpointer-server --init-config     Write default config to the --config path
//! ```
//!
//! While running, stdin accepts `info`, `status`, `disconnect`,
//! `set <port> <password>` and `quit`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use airpointer_core::{Actuator, LogActuator, platform_default};
use airpointer_server::{ServerConfig, ServerEvent, ServerHandle};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "airpointer-server", about = "AirPointer desktop pointer server")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "airpointer-server.toml")]
    config: PathBuf,

    /// Listen port (overrides the config file).
    #[arg(short, long)]
    port: Option<u16>,

    /// Controller password (overrides the config file).
    #[arg(long)]
    password: Option<String>,

    /// Log pointer and key actions instead of performing them.
    #[arg(long)]
    dry_run: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Write the default configuration to the --config path and exit.
    #[arg(long)]
    init_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ServerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    if cli.init_config {
        ServerConfig::write_default(&cli.config)?;
        println!("wrote {}", cli.config.display());
        return Ok(());
    }

    let mut config = ServerConfig::load(&cli.config);
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(password) = cli.password {
        config.auth.password = password;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("airpointer-server v{}", env!("CARGO_PKG_VERSION"));

    let actuator: Arc<dyn Actuator> = if cli.dry_run {
        info!("dry run: pointer actions are only logged");
        Arc::new(LogActuator::default())
    } else {
        platform_default()
    };

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let (handle, mut task) = airpointer_server::start(&config, actuator, ui_tx).await?;

    // Pairing payload, what a QR code would carry.
    let pairing = handle.server_info().await?;
    println!("{}", pairing.to_json()?);

    tokio::spawn(async move {
        while let Some(event) = ui_rx.recv().await {
            report(&event);
        }
    });

    tokio::spawn(console(handle.clone()));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Ctrl-C received, shutting down");
            handle.shutdown().await?;
            task.await?;
        }
        finished = &mut task => finished?,
    }

    Ok(())
}

fn report(event: &ServerEvent) {
    match event {
        ServerEvent::Listening { addr } => info!("ready on {addr}"),
        ServerEvent::Status(status) => info!("controller {status}"),
        ServerEvent::ConnectionRejected { peer } => {
            warn!("refused {peer}: a controller is already connected")
        }
        ServerEvent::DeviceInfo { device_model } => info!("controller model: {device_model}"),
        ServerEvent::ControlStatus { enabled } => info!("trackpad control: {enabled}"),
        ServerEvent::AirMouseStatus { enabled } => info!("air mouse: {enabled}"),
    }
}

/// Line-oriented admin console on stdin.
async fn console(handle: ServerHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut words = line.split_whitespace();
        let result = match (words.next(), words.next(), words.next()) {
            (Some("info"), None, None) => handle
                .server_info()
                .await
                .and_then(|info| info.to_json())
                .map(|json| println!("{json}")),
            (Some("status"), None, None) => handle.active_client().await.map(|client| {
                match client {
                    Some(c) => println!("{c:?}"),
                    None => println!("no controller"),
                }
            }),
            (Some("disconnect"), None, None) => handle
                .disconnect_client()
                .await
                .map(|evicted| println!("disconnected: {evicted}")),
            (Some("set"), Some(port), Some(password)) => match port.parse::<u16>() {
                Ok(port) => handle
                    .update_config(port, password)
                    .await
                    .and_then(|info| info.to_json())
                    .map(|json| println!("{json}")),
                Err(e) => {
                    println!("bad port {port}: {e}");
                    Ok(())
                }
            },
            (Some("quit"), None, None) => {
                let _ = handle.shutdown().await;
                return;
            }
            (None, _, _) => Ok(()),
            _ => {
                println!("commands: info | status | disconnect | set <port> <password> | quit");
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("console: {e}");
            break;
        }
    }
}
