use serde::Serialize;

/// A decoded result published by a handler.
///
/// The variants here are the union of what the shipped device profiles
/// produce; the framing core never inspects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// A nunchuck sample echoed by the towbot firmware.
    Nunchuck(NunchuckSample),
    /// A device-signaled error message (opcode error bits set).
    DeviceError { opcode: u8, payload: Vec<u8> },
    /// A test message, with whatever payload the device attached.
    Test { payload: Option<Vec<u8>> },
}

/// One inertial sample from the nunchuck attached to the towbot.
///
/// Wire layout (6 bytes): stick X, stick Y (0x80 is centered), accel X/Y/Z,
/// then a byte whose low 2 bits are the C and Z buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NunchuckSample {
    pub stick_x: u8,
    pub stick_y: u8,
    pub accel: [u8; 3],
    pub button_c: bool,
    pub button_z: bool,
}

impl NunchuckSample {
    /// Wire size of a sample.
    pub const WIRE_LEN: usize = 6;

    /// Parse a sample from its 6-byte wire form.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() != Self::WIRE_LEN {
            return None;
        }
        Some(Self {
            stick_x: payload[0],
            stick_y: payload[1],
            accel: [payload[2], payload[3], payload[4]],
            button_c: payload[5] & 0b10 != 0,
            button_z: payload[5] & 0b01 != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_centered_sample() {
        let sample = NunchuckSample::parse(&[0x80, 0x80, 0x10, 0x20, 0x30, 0b00]).unwrap();
        assert_eq!(sample.stick_x, 0x80);
        assert_eq!(sample.stick_y, 0x80);
        assert_eq!(sample.accel, [0x10, 0x20, 0x30]);
        assert!(!sample.button_c);
        assert!(!sample.button_z);
    }

    #[test]
    fn parses_button_bits() {
        let sample = NunchuckSample::parse(&[0, 0, 0, 0, 0, 0b11]).unwrap();
        assert!(sample.button_c);
        assert!(sample.button_z);

        let sample = NunchuckSample::parse(&[0, 0, 0, 0, 0, 0b01]).unwrap();
        assert!(!sample.button_c);
        assert!(sample.button_z);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(NunchuckSample::parse(&[1, 2, 3, 4, 5]).is_none());
        assert!(NunchuckSample::parse(&[1, 2, 3, 4, 5, 6, 7]).is_none());
        assert!(NunchuckSample::parse(&[]).is_none());
    }

    #[test]
    fn event_serializes_with_tag() {
        let event = DeviceEvent::Test {
            payload: Some(vec![1, 2]),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"test\""), "{json}");
    }
}
