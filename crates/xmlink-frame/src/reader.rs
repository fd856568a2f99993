use std::io::{ErrorKind, Read};

use bytes::Bytes;
use tracing::trace;
use xmlink_channel::SerialStream;

use crate::codec::{Decoded, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::opcode::{Opcode, OpcodeTable};

/// Decodes messages from any `Read` stream, one blocking call per message.
///
/// Length determination follows the opcode's leading bits: table-length
/// opcodes carry their fixed class length, registered N-byte opcodes carry
/// a length byte (decoded as an unsigned integer) followed by that many
/// payload bytes. An opcode in neither space consumes exactly one byte and
/// is reported as [`Decoded::Unknown`].
///
/// No message state is buffered across calls.
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next message (blocking).
    ///
    /// `table` tells the decoder which opcodes outside the table-length
    /// space are registered and therefore length-prefixed on the wire.
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` on EOF, whether at a
    /// message boundary or mid-message.
    pub fn read_frame(&mut self, table: &impl OpcodeTable) -> Result<Decoded> {
        let opcode = Opcode::new(self.read_byte()?);

        if let Some(n) = opcode.length_class() {
            // Table-length message: fixed payload, no length byte on the
            // wire. Class 0 yields the absence marker without reading.
            let payload = if n == 0 {
                None
            } else {
                Some(self.read_bytes(n)?)
            };
            trace!(%opcode, len = n, "table-length message");
            return Ok(Decoded::Frame(Frame::new(opcode, payload)));
        }

        if table.contains(opcode) {
            // N-byte message: one length byte, then that many payload bytes.
            let len = usize::from(self.read_byte()?);
            let payload = self.read_bytes(len)?;
            trace!(%opcode, len, "n-byte message");
            return Ok(Decoded::Frame(Frame::new(opcode, Some(payload))));
        }

        Ok(Decoded::Unknown(opcode))
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.fill(&mut byte)?;
        Ok(byte[0])
    }

    fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        let mut buf = vec![0u8; n];
        self.fill(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        // read_exact retries Interrupted internally and reports a short
        // stream as UnexpectedEof.
        match self.inner.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                Err(FrameError::ConnectionClosed)
            }
            Err(err) => Err(FrameError::Io(err)),
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

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<SerialStream> {
    /// Create a frame reader for `SerialStream` and apply the read timeout
    /// from config.
    pub fn with_config_serial(inner: SerialStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(channel_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn channel_to_frame_error(err: xmlink_channel::ChannelError) -> FrameError {
    match err {
        xmlink_channel::ChannelError::Io(io) => FrameError::Io(io),
        xmlink_channel::ChannelError::Open { source, .. }
        | xmlink_channel::ChannelError::Configure { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
