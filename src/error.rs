#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("entity index {index} out of range (max {max})")]
    IndexOutOfRange { index: usize, max: usize },

    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    #[error("invalid packet type: {0:#04x}")]
    InvalidPacketType(u8),

    #[error("welcome packet has bad size: {len} bytes (expected {min}..={max})")]
    BadWelcomeSize { len: usize, min: usize, max: usize },

    #[error("packet too large: {len} bytes (max {max})")]
    PacketTooLarge { len: usize, max: usize },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("handshake cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
