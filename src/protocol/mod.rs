pub mod packet;
pub mod ack;
pub mod stats;
pub mod transport;
pub mod connection;

pub use packet::{
    PacketType, Welcome, DeltaFragment, DeltaPacketBuilder,
    connect_packet, delta_reset_packet, MAX_PACKET_SIZE,
};
pub use ack::DeltaAck;
pub use stats::NetworkStats;
pub use transport::{DatagramTransport, UdpTransport};
pub use connection::{Connection, LoopTiming, ReceivedPacket};
