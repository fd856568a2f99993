use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use xmlink_channel::SerialStream;

use crate::codec::{encode_command, FrameConfig};
use crate::error::{FrameError, Result};
use crate::opcode::Opcode;
use crate::reader::channel_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Writes outbound commands to any `Write` stream.
///
/// A command is the opcode byte followed by the raw payload bytes, with no
/// length prefix (the outbound wire format is asymmetric with the inbound
/// N-byte format).
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and send a command (blocking).
    pub fn send(&mut self, opcode: Opcode, payload: Option<&[u8]>) -> Result<()> {
        self.buf.clear();
        encode_command(opcode, payload, &mut self.buf);

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                // With a write timeout configured, WouldBlock means the
                // timeout expired; otherwise it is a transient condition on
                // a non-blocking stream and the write retries.
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    if self.config.write_timeout.is_some() {
                        return Err(FrameError::Io(err));
                    }
                    continue;
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    if self.config.write_timeout.is_some() {
                        return Err(FrameError::Io(err));
                    }
                    continue;
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<SerialStream> {
    /// Create a frame writer for `SerialStream` and apply the write timeout
    /// from config.
    pub fn with_config_serial(inner: SerialStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(channel_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}
