//! Port definitions: traits that transports implement.
//!
//! Ports are the boundaries between the mapping engine and the outside world.
//! They are defined here (in `app`) so that both the engine and the adapter
//! crates can depend on them without creating circular dependencies.

pub mod device;
pub mod publish;

pub use device::{Command, DeviceCommandSink};
pub use publish::{Publication, PublishSink};
