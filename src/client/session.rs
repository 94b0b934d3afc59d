use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::clock::RenderClock;
use crate::client::commands::{command_queue, CommandQueue};
use crate::client::interpolation::{Interpolator, DEFAULT_UPDATE_RATE};
use crate::error::{Error, Result};
use crate::protocol::{Connection, DatagramTransport, LoopTiming, NetworkStats, UdpTransport};
use crate::state::{ConnectionState, EdictArena, SharedWorld};

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_addr: SocketAddr,
    /// Updates per second the server sends
    pub update_rate: f32,
    pub handshake_interval_ms: u64,
    pub idle_sleep_ms: u64,
}

impl ClientConfig {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            ..Self::default()
        }
    }

    /// Load a JSON config file; missing keys keep their defaults
    pub fn from_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Reject settings the session cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.update_rate.is_finite() && self.update_rate > 0.0) {
            return Err(Error::Config(format!("update rate must be positive, got {}", self.update_rate)));
        }
        Ok(())
    }

    pub fn timing(&self) -> LoopTiming {
        LoopTiming {
            handshake_interval: Duration::from_millis(self.handshake_interval_ms),
            idle_sleep: Duration::from_millis(self.idle_sleep_ms),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let timing = LoopTiming::default();
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 27015)),
            update_rate: DEFAULT_UPDATE_RATE,
            handshake_interval_ms: timing.handshake_interval.as_millis() as u64,
            idle_sleep_ms: timing.idle_sleep.as_millis() as u64,
        }
    }
}

/// Builder for spectator sessions
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            config: ClientConfig::new(server_addr),
        }
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn update_rate(mut self, rate: f32) -> Self {
        self.config.update_rate = rate;
        self
    }

    pub fn handshake_interval(mut self, interval: Duration) -> Self {
        self.config.handshake_interval_ms = interval.as_millis() as u64;
        self
    }

    pub async fn spawn(self) -> Result<Session> {
        Session::spawn(self.config).await
    }
}

/// A running spectator session.
///
/// The network loop runs on its own tokio task; this handle is the render
/// side. Must be created inside a tokio runtime.
pub struct Session {
    world: SharedWorld,
    commands: CommandQueue,
    interpolator: Interpolator,
    clock: RenderClock,
    cancel: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Session {
    /// Bind a UDP socket and start the network task
    pub async fn spawn(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = UdpTransport::bind(config.server_addr).await?;
        Self::with_transport(&config, transport)
    }

    /// Start the network task over any transport
    pub fn with_transport<T>(config: &ClientConfig, transport: T) -> Result<Self>
    where
        T: DatagramTransport + Send + 'static,
    {
        config.validate()?;
        let world = SharedWorld::new();
        let (tx, commands) = command_queue();
        let clock = RenderClock::new();
        let cancel = Arc::new(AtomicBool::new(false));

        let connection = Connection::new(transport, world.clone(), tx, clock, config.timing());
        let task = tokio::spawn(connection.run(cancel.clone()));

        Ok(Self {
            world,
            commands,
            interpolator: Interpolator::new(config.update_rate),
            clock,
            cancel,
            task: Some(task),
        })
    }

    pub fn clock(&self) -> &RenderClock {
        &self.clock
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub fn state(&self) -> ConnectionState {
        self.world.state()
    }

    pub fn map_name(&self) -> Option<String> {
        self.world.lock().map_name.clone()
    }

    pub fn stats(&self) -> NetworkStats {
        self.world.stats()
    }

    /// Pending console commands, oldest first
    pub fn drain_commands(&mut self) -> Vec<String> {
        self.commands.drain()
    }

    /// Interpolated snapshot for the current render frame
    pub fn interpolate(&mut self) -> &EdictArena {
        let now = self.clock.now();
        self.interpolate_at(now)
    }

    /// Interpolated snapshot for render time `now` (seconds on [`Session::clock`])
    pub fn interpolate_at(&mut self, now: f64) -> &EdictArena {
        let world = self.world.lock();
        self.interpolator.interpolate(&world.store, world.last_update_time, now)
    }

    /// Stop the network task and wait for it to exit
    pub async fn shutdown(mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "network task ended abnormally");
            }
        }
        debug!("session shut down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}
