use std::fmt;
use std::io;

use xmlink_channel::ChannelError;
use xmlink_frame::FrameError;
use xmlink_node::NodeError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const CHANNEL_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    match err {
        ChannelError::Open { source, .. }
        | ChannelError::Configure { source, .. }
        | ChannelError::Io(source) => io_error(context, source),
        ChannelError::UnsupportedBaud(_) => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn node_error(context: &str, err: NodeError) -> CliError {
    match err {
        NodeError::Channel(err) => channel_error(context, err),
        NodeError::Frame(err) => frame_error(context, err),
        NodeError::PortClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        NodeError::TaskPanicked(_) => CliError::new(CHANNEL_ERROR, format!("{context}: {err}")),
    }
}
