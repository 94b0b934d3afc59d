pub mod session;
pub mod commands;
pub mod clock;
pub mod interpolation;

pub use session::{Session, ClientBuilder, ClientConfig};
pub use commands::{command_queue, map_command, CommandQueue, CommandSender};
pub use clock::RenderClock;
pub use interpolation::{Interpolator, DEFAULT_UPDATE_RATE};
