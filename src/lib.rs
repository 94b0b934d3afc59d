//! Spectator client for delta-compressed entity streams
//!
//! Connects to a game server as a passive spectator, reassembles
//! fragmented entity deltas against acknowledged baselines, and exposes a
//! smoothed view of the world for rendering.

pub mod codec;
pub mod error;
pub mod protocol;
pub mod state;
pub mod client;

pub use error::{Error, Result};
pub use protocol::{
    Connection, DatagramTransport, UdpTransport, LoopTiming,
    NetworkStats, PacketType, ReceivedPacket,
};
pub use codec::{DeltaFlags, PackedAngles, Vec3};
pub use state::{
    ConnectionState, Edict, EdictArena, EdictIndex, EntityStore,
    SharedWorld, MAX_EDICTS,
};
pub use client::{Session, ClientBuilder, ClientConfig, Interpolator, RenderClock};
