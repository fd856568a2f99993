use std::path::PathBuf;

/// Errors that can occur on the serial byte channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Failed to open the serial device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to configure the serial device (termios).
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The requested baud rate has no termios constant on this platform.
    #[error("unsupported baud rate: {0}")]
    UnsupportedBaud(u32),

    /// An I/O error occurred on the channel.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
