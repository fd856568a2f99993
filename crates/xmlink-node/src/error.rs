/// Errors that can occur in link node operations.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Channel-level error.
    #[error("channel error: {0}")]
    Channel(#[from] xmlink_channel::ChannelError),

    /// Framing-level error.
    #[error("frame error: {0}")]
    Frame(#[from] xmlink_frame::FrameError),

    /// The command port was used after the node shut down.
    #[error("command port closed")]
    PortClosed,

    /// A node task panicked instead of returning.
    #[error("{0} task panicked")]
    TaskPanicked(&'static str),
}

pub type Result<T> = std::result::Result<T, NodeError>;
