use bytes::{BufMut, Bytes, BytesMut};

use crate::opcode::Opcode;

/// One decoded (opcode, payload) unit.
///
/// `payload` is `None` for table-length-0 messages (the absence marker —
/// no payload bytes exist on the wire) and `Some` otherwise, including the
/// empty `Some` an N-byte message with length 0 produces. Frames are
/// ephemeral; nothing above the dispatch call retains them.
#[derive(Debug, Clone)]
pub struct Frame {
    pub opcode: Opcode,
    pub payload: Option<Bytes>,
}

impl Frame {
    pub fn new(opcode: Opcode, payload: Option<Bytes>) -> Self {
        Self { opcode, payload }
    }

    /// Number of payload bytes read from the wire for this frame.
    pub fn payload_len(&self) -> usize {
        self.payload.as_ref().map_or(0, Bytes::len)
    }
}

/// Outcome of one decoder iteration.
#[derive(Debug, Clone)]
pub enum Decoded {
    /// A complete message for a classified opcode.
    Frame(Frame),
    /// An opcode in neither the length table nor the registry. Exactly one
    /// byte was consumed; the caller logs and continues (no resync).
    Unknown(Opcode),
}

/// Encode an outbound command into the wire format.
///
/// Wire format (outbound):
/// ```text
/// ┌──────────────┬──────────────────────────────┐
/// │ Opcode (1B)  │ Payload (raw, optional)      │
/// └──────────────┴──────────────────────────────┘
/// ```
///
/// No length prefix is written — the outbound path is asymmetric with the
/// inbound N-byte format, matching the device firmware's expectations.
pub fn encode_command(opcode: Opcode, payload: Option<&[u8]>, dst: &mut BytesMut) {
    dst.reserve(1 + payload.map_or(0, <[u8]>::len));
    dst.put_u8(opcode.raw());
    if let Some(payload) = payload {
        dst.put_slice(payload);
    }
}

/// Configuration for the frame reader/writer.
#[derive(Debug, Clone, Default)]
pub struct FrameConfig {
    /// Read timeout for blocking operations. `None` (the default) blocks
    /// without bound between messages, which is the baseline link contract.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_command_writes_opcode_then_raw_payload() {
        let mut buf = BytesMut::new();
        encode_command(Opcode::new(0x80), Some(&[0x01, 0x02]), &mut buf);
        assert_eq!(buf.as_ref(), &[0x80, 0x01, 0x02]);
    }

    #[test]
    fn encode_command_without_payload_is_one_byte() {
        let mut buf = BytesMut::new();
        encode_command(Opcode::new(0x02), None, &mut buf);
        assert_eq!(buf.as_ref(), &[0x02]);
    }

    #[test]
    fn encode_command_has_no_length_prefix() {
        let payload = vec![0xAA; 300];
        let mut buf = BytesMut::new();
        encode_command(Opcode::new(0xC0), Some(&payload), &mut buf);
        assert_eq!(buf.len(), 1 + payload.len());
        assert_eq!(buf[0], 0xC0);
        assert_eq!(&buf[1..], payload.as_slice());
    }

    #[test]
    fn frame_payload_len() {
        let none = Frame::new(Opcode::new(0x00), None);
        assert_eq!(none.payload_len(), 0);

        let empty = Frame::new(Opcode::new(0xC0), Some(Bytes::new()));
        assert_eq!(empty.payload_len(), 0);

        let two = Frame::new(Opcode::new(0x80), Some(Bytes::from_static(&[1, 2])));
        assert_eq!(two.payload_len(), 2);
    }
}
