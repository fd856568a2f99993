use serde::{Deserialize, Serialize};

use crate::error::{NodeError, Result};

/// How an outbound command is addressed.
///
/// Named commands resolve through the profile's command registry; raw
/// opcodes bypass it (for poking at firmware during bring-up).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandRef {
    Raw(u8),
    Named(String),
}

/// A request delivered to the link node's outbound writer.
///
/// This is the boundary with the host-side message transport: whatever
/// delivers command requests (a ROS-style subscription, a CLI, a test)
/// hands them over in this shape. An omitted payload means "send the bare
/// opcode".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: CommandRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Vec<u8>>,
}

impl CommandRequest {
    /// A named command with a payload.
    pub fn named(name: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            command: CommandRef::Named(name.into()),
            payload: Some(payload.into()),
        }
    }

    /// A named command with no payload.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            command: CommandRef::Named(name.into()),
            payload: None,
        }
    }

    /// A raw-opcode command.
    pub fn raw(opcode: u8, payload: Option<Vec<u8>>) -> Self {
        Self {
            command: CommandRef::Raw(opcode),
            payload,
        }
    }
}

/// Messages on the writer task's queue.
#[derive(Debug)]
pub(crate) enum PortMessage {
    Request(CommandRequest),
    Shutdown,
}

/// Cloneable sender half of the link node's command queue.
pub struct CommandPort {
    pub(crate) tx: std::sync::mpsc::Sender<PortMessage>,
}

impl CommandPort {
    /// Queue a command for the outbound writer.
    ///
    /// Fails only once the node has shut down.
    pub fn send(&self, request: CommandRequest) -> Result<()> {
        self.tx
            .send(PortMessage::Request(request))
            .map_err(|_| NodeError::PortClosed)
    }
}

impl Clone for CommandPort {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl std::fmt::Debug for CommandPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandPort").finish()
    }
}
