use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::protocol::NetworkStats;
use super::store::EntityStore;

/// Connection lifecycle as seen by the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Everything the network task publishes to the render side
#[derive(Debug, Default)]
pub struct SpectatorWorld {
    pub store: EntityStore,
    /// Render-clock seconds at which the latest update started arriving
    pub last_update_time: f64,
    pub state: ConnectionState,
    pub map_name: Option<String>,
    pub stats: NetworkStats,
}

/// World shared between the network task and the render thread
#[derive(Debug, Clone, Default)]
pub struct SharedWorld(Arc<Mutex<SpectatorWorld>>);

impl SharedWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the world, recovering the guard from a poisoned lock
    pub fn lock(&self) -> MutexGuard<'_, SpectatorWorld> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stats(&self) -> NetworkStats {
        self.lock().stats
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }
}
