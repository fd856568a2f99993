use xmlink_frame::Opcode;

use crate::registry::{CommandRegistry, Handler, HandlerRegistry};

/// The complete opcode/name configuration for one physical device.
///
/// A profile owns its handler and command registries; concrete profiles
/// are built by layering entries on top of [`DeviceProfile::base`] at
/// construction time. There is no shared mutable base state, so several
/// profiles can coexist in one process without leaking entries into each
/// other.
pub struct DeviceProfile {
    handlers: HandlerRegistry,
    commands: CommandRegistry,
}

impl DeviceProfile {
    /// Start from the base tables every device shares.
    ///
    /// The base registers no handlers and a single diagnostic poll command
    /// understood by all firmware builds.
    pub fn base() -> ProfileBuilder {
        ProfileBuilder::new().with_command("example_poll", 0x0F)
    }

    /// Start from entirely empty tables.
    pub fn empty() -> ProfileBuilder {
        ProfileBuilder::new()
    }

    /// The inbound dispatch table.
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// The outbound command table.
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Split into the two registries (the node gives each to its own task).
    pub fn into_parts(self) -> (HandlerRegistry, CommandRegistry) {
        (self.handlers, self.commands)
    }
}

impl std::fmt::Debug for DeviceProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceProfile")
            .field("handlers", &self.handlers)
            .field("commands", &self.commands.len())
            .finish()
    }
}

/// Builds a [`DeviceProfile`] by composition.
///
/// Later entries shadow earlier ones for the same key, which is how a
/// concrete profile overrides a base entry.
pub struct ProfileBuilder {
    handlers: HandlerRegistry,
    commands: CommandRegistry,
}

impl ProfileBuilder {
    fn new() -> Self {
        Self {
            handlers: HandlerRegistry::new(),
            commands: CommandRegistry::new(),
        }
    }

    /// Register an inbound handler for an opcode.
    pub fn with_handler(mut self, opcode: u8, handler: impl Handler + 'static) -> Self {
        self.handlers.insert(Opcode::new(opcode), Box::new(handler));
        self
    }

    /// Register an outbound command name.
    pub fn with_command(mut self, name: impl Into<String>, opcode: u8) -> Self {
        self.commands.insert(name, Opcode::new(opcode));
        self
    }

    /// Freeze the tables. The profile is immutable from here on.
    pub fn build(self) -> DeviceProfile {
        DeviceProfile {
            handlers: self.handlers,
            commands: self.commands,
        }
    }
}
