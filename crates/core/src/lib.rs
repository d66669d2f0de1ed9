pub mod config;
pub mod error;
pub mod event_bus;
pub mod types;

pub use config::AppConfig;
pub use error::{RotationError, RotationResult};
pub use event_bus::EventSink;
pub use types::{BannerId, RotationEvent, RotationEventType, SlotId, UserGroupId};
