pub mod edict;
pub mod store;
pub mod apply;
pub mod history;
pub mod world;

pub use edict::{Edict, EdictIndex, MAX_EDICTS};
pub use store::{EdictArena, EntityStore};
pub use apply::ApplyTarget;
pub use history::{Update, UpdateHistory, MAX_HISTORY};
pub use world::{ConnectionState, SharedWorld, SpectatorWorld};
