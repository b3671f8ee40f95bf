//! AirPointer controller, replaying recorded input.
//!
//! ```text
//! airpointer-client --input session.jsonl          Replay a recording
//! airpointer-client --server 192.168.1.20:5000     Dial a specific server
//! airpointer-client --pairing '{"ip":..}'          Use a server's pairing payload
//! airpointer-client --gen-config                   Write default config to stdout
//! airpointer-client --init-config                  Write default config to the --config path
//! ```
//!
//! Without `--input`, samples are read from stdin. See [`airpointer_client::replay`]
//! for the line format.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use airpointer_client::replay::{self, Replayed};
use airpointer_client::{
    ClientConfig, ClientEndpoint, Controller, SimulatedVolume, VolumeControl, VolumeDriver,
    volume_command,
};
use airpointer_core::{AirPointerError, Command, ConnectionSender};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "airpointer-client", about = "AirPointer controller")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "airpointer-client.toml")]
    config: PathBuf,

    /// Server as host:port (overrides the config file).
    #[arg(short, long)]
    server: Option<String>,

    /// Server password (overrides the config file).
    #[arg(long)]
    password: Option<String>,

    /// Pairing JSON printed by the server; sets server and password.
    #[arg(long)]
    pairing: Option<String>,

    /// Device model reported to the server.
    #[arg(long)]
    model: Option<String>,

    /// JSON-lines input file. Reads stdin when absent.
    #[arg(short, long)]
    input: Option<PathBuf>,

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
        let text = toml::to_string_pretty(&ClientConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    if cli.init_config {
        ClientConfig::write_default(&cli.config)?;
        println!("wrote {}", cli.config.display());
        return Ok(());
    }

    let mut config = ClientConfig::load(&cli.config);
    if let Some(pairing) = &cli.pairing {
        config.apply_pairing(pairing)?;
    }
    if let Some(server) = &cli.server {
        config.set_server(server)?;
    }
    if let Some(password) = cli.password {
        config.auth.password = password;
    }
    if let Some(model) = cli.model {
        config.device.model = model;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("airpointer-client v{}", env!("CARGO_PKG_VERSION"));

    let mut endpoint = ClientEndpoint::connect(
        config.connection_info(),
        &config.auth.password,
        config.timeout(),
    )
    .await?;
    info!("session open with {}", endpoint.server());

    let mut controller = Controller::new(
        &config.motion,
        config.device.control_on,
        config.device.air_mouse_on,
    );
    endpoint
        .send_all(&controller.announcement(&config.device.model))
        .await?;

    let volume: Arc<dyn VolumeControl> = Arc::new(SimulatedVolume::default());
    let mut driver = VolumeDriver::new(volume, config.motion.double_tap_window_ms).await?;

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &cli.input {
        Some(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let (sample_tx, mut sample_rx) = mpsc::channel(256);
    let feeder = tokio::spawn(replay::pace(reader, sample_tx));

    let sender = endpoint.sender();
    loop {
        tokio::select! {
            sample = sample_rx.recv() => {
                let Some(sample) = sample else { break };
                let commands = match sample.replayed() {
                    Replayed::Input(input) => controller.handle(input),
                    Replayed::Volume(level) => {
                        driver.observe(level).await.iter().map(volume_command).collect()
                    }
                };
                send(&sender, &commands).await?;
            }
            taps = driver.expired() => {
                let commands: Vec<Command> = taps.iter().map(volume_command).collect();
                send(&sender, &commands).await?;
            }
            _ = endpoint.closed() => {
                warn!("server ended the session");
                feeder.abort();
                return Ok(());
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Ctrl-C received, disconnecting");
                feeder.abort();
                endpoint.close().await;
                return Ok(());
            }
        }
    }

    let taps = driver.flush().await;
    let commands: Vec<Command> = taps.iter().map(volume_command).collect();
    send(&sender, &commands).await?;

    let replayed = feeder.await??;
    info!("replayed {replayed} samples");
    endpoint.close().await;
    Ok(())
}

/// Send in order. Errors that leave the session usable are logged and the
/// command is skipped.
async fn send(sender: &ConnectionSender, commands: &[Command]) -> Result<(), AirPointerError> {
    for command in commands {
        match sender.send_command(command).await {
            Ok(()) => {}
            Err(e) if e.is_fatal_to_connection() => return Err(e),
            Err(e) => warn!(%command, "command dropped: {e}"),
        }
    }
    Ok(())
}
