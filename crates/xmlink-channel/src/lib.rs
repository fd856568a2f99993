//! Blocking serial byte-channel abstraction for the XMega link.
//!
//! Provides a unified `Read + Write` handle over the physical transports the
//! link driver runs on:
//! - A raw-mode tty device (the real microcontroller link)
//! - A loopback socket pair (tests and demos)
//!
//! This is the lowest layer of xmega-link. Everything else builds on top of
//! the [`SerialStream`] type provided here.

pub mod error;
pub mod serial;
pub mod stream;

pub use error::{ChannelError, Result};
pub use serial::{Baud, SerialPort};
pub use stream::SerialStream;
