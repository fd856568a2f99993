//! Device profiles, dispatch registries and the link node task.
//!
//! This is the "just works" layer. Pick a device profile, hand it a
//! [`SerialStream`](xmlink_channel::SerialStream), and the node runs the
//! inbound decode loop and the outbound command writer on their own
//! threads. Decoded sensor results reach the application through an
//! [`EventSink`]; outbound commands arrive through a cloneable
//! [`CommandPort`].

pub mod command;
pub mod error;
pub mod event;
pub mod node;
pub mod profile;
pub mod registry;
pub mod towbot;

pub use command::{CommandPort, CommandRef, CommandRequest};
pub use error::{NodeError, Result};
pub use event::{DeviceEvent, NunchuckSample};
pub use node::{LinkNode, NodeConfig};
pub use profile::{DeviceProfile, ProfileBuilder};
pub use registry::{CommandRegistry, EventSink, Handler, HandlerRegistry};
