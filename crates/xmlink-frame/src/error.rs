/// Errors that can occur while framing messages on the link.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An I/O error occurred while reading or writing the link.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link closed before a complete message was received.
    #[error("link closed (incomplete message)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
