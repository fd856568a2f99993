//! Opcode-led message framing for the XMega serial link.
//!
//! Every inbound message starts with a single opcode byte whose top two bits
//! select a *length class*:
//! - Classes `00`/`01`/`10` carry a fixed payload of 0, 1 or 2 bytes.
//! - Class `11` is the N-byte space: a registered opcode is followed by one
//!   length byte and that many payload bytes.
//!
//! Bits 5-4 (`0b0011_0000`) are the device error flag; the framing layer
//! recognizes it but leaves its meaning to the matched handler.
//!
//! No partial reads leak across messages, and there is no resynchronization:
//! a framing-boundary loss cascades into unrecognized opcodes by design.

pub mod codec;
pub mod error;
pub mod opcode;
pub mod reader;
pub mod writer;

pub use codec::{encode_command, Decoded, Frame, FrameConfig};
pub use error::{FrameError, Result};
pub use opcode::{Opcode, OpcodeTable, ERROR_MASK, LENGTH_CLASS_MASK};
pub use reader::FrameReader;
pub use writer::FrameWriter;
