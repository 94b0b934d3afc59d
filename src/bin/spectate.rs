use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use netedict_client::{ClientConfig, Session};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spectate")]
#[command(about = "Join a server as a spectator and mirror its entities")]
struct Args {
    /// Server address as host:port
    server: Option<String>,

    /// Server update rate in Hz
    #[arg(long)]
    update_rate: Option<f32>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Render frames to run, 0 for forever
    #[arg(long, default_value = "0")]
    frames: u64,

    /// Render frames per second
    #[arg(long, default_value = "60")]
    fps: u32,
}

fn resolve(server: &str) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    server
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| format!("could not resolve {server}").into())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ClientConfig::from_json(path)?,
        None => ClientConfig::default(),
    };
    if let Some(server) = &args.server {
        config.server_addr = resolve(server)?;
    }
    if let Some(rate) = args.update_rate {
        config.update_rate = rate;
    }

    info!(server = %config.server_addr, update_rate = config.update_rate, "starting spectator");
    let mut session = Session::spawn(config).await?;

    let frame_time = Duration::from_secs_f64(1.0 / args.fps.max(1) as f64);
    let mut frame: u64 = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            _ = tokio::time::sleep(frame_time) => {}
        }

        for command in session.drain_commands() {
            info!(%command, "console command");
        }

        let visible = session.interpolate().valid_count();
        frame += 1;
        if frame % (args.fps.max(1) as u64 * 5) == 0 {
            let stats = session.stats();
            info!(
                frame,
                visible,
                state = ?session.state(),
                received = stats.packets_received,
                acks = stats.acks_sent,
                resets = stats.baseline_resets,
                "status"
            );
            if stats.malformed_packets > 0 {
                warn!(malformed = stats.malformed_packets, "server sent malformed packets");
            }
        }

        if args.frames != 0 && frame >= args.frames {
            break;
        }
    }

    session.shutdown().await;
    Ok(())
}
