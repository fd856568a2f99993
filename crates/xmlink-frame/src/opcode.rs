//! Opcode bit layout.
//!
//! The top two bits partition the opcode space into length classes; the
//! `11` class has no table entry and is dispatched through the handler
//! registry as N-byte messages.

/// Mask selecting the length-class bits (top 2).
pub const LENGTH_CLASS_MASK: u8 = 0b1100_0000;

/// Mask for the device-side error flag (bits 5-4).
pub const ERROR_MASK: u8 = 0b0011_0000;

/// The leading byte of a message, identifying its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Opcode(u8);

impl Opcode {
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// The raw wire byte.
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Fixed payload length implied by the top 2 bits, if this opcode is in
    /// the table-length space. `None` means the N-byte space (class `11`).
    pub const fn length_class(self) -> Option<usize> {
        match self.0 & LENGTH_CLASS_MASK {
            0b0000_0000 => Some(0),
            0b0100_0000 => Some(1),
            0b1000_0000 => Some(2),
            _ => None,
        }
    }

    /// Whether the device error flag is set.
    ///
    /// The flag is informational at this layer; handlers decide what an
    /// error-flagged message means for their device.
    pub const fn is_error(self) -> bool {
        self.0 & ERROR_MASK == ERROR_MASK
    }
}

impl From<u8> for Opcode {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// The classification seam between the decoder and the handler registry.
///
/// The decoder only needs to know whether an opcode outside the
/// table-length space is registered (and therefore carries a length byte).
pub trait OpcodeTable {
    fn contains(&self, opcode: Opcode) -> bool;
}

impl OpcodeTable for std::collections::HashSet<Opcode> {
    fn contains(&self, opcode: Opcode) -> bool {
        std::collections::HashSet::contains(self, &opcode)
    }
}

impl<T: OpcodeTable + ?Sized> OpcodeTable for &T {
    fn contains(&self, opcode: Opcode) -> bool {
        (**self).contains(opcode)
    }
}
