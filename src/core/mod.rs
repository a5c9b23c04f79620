pub mod entity;
pub mod error;
pub mod phase;
pub mod stop;

pub use entity::Entity;
pub use error::{Result, SyncError};
pub use phase::{Phase, PhaseCell};
pub use stop::{stop_channel, StopHandle, StopSignal};
