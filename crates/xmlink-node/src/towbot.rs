//! Towbot device profile.
//!
//! Sensor manifest: a nunchuck echoed by the firmware. Actuator manifest:
//! two wheel motors. The entries here extend the base tables by
//! composition; nothing is shared with other profiles at runtime.

use tracing::warn;

use crate::event::{DeviceEvent, NunchuckSample};
use crate::profile::DeviceProfile;
use crate::registry::{EventSink, Handler};

/// Firmware error report (N-byte, error flag set).
pub const OP_DEVICE_ERROR: u8 = 0xF0;
/// Nunchuck sample echo (N-byte, 6 data bytes).
pub const OP_NUNCHUCK: u8 = 0xC0;
/// Test message (table class 1, one data byte).
pub const OP_TEST: u8 = 0x40;

/// Build the towbot profile on top of the base tables.
pub fn profile() -> DeviceProfile {
    DeviceProfile::base()
        .with_handler(OP_DEVICE_ERROR, DeviceErrorHandler)
        .with_handler(OP_NUNCHUCK, NunchuckHandler)
        .with_handler(OP_TEST, TestHandler)
        .with_command("robot_start", 0x02)
        .with_command("motors", 0x80)
        .with_command("debug", 0x40)
        .build()
}

/// Publishes firmware error reports as [`DeviceEvent::DeviceError`].
struct DeviceErrorHandler;

impl Handler for DeviceErrorHandler {
    fn handle(&mut self, payload: Option<&[u8]>, events: &mut dyn EventSink) {
        let payload = payload.unwrap_or_default().to_vec();
        warn!(len = payload.len(), "device reported an error");
        events.publish(DeviceEvent::DeviceError {
            opcode: OP_DEVICE_ERROR,
            payload,
        });
    }
}

/// Parses the 6-byte nunchuck echo and publishes the sample.
struct NunchuckHandler;

impl Handler for NunchuckHandler {
    fn handle(&mut self, payload: Option<&[u8]>, events: &mut dyn EventSink) {
        let Some(bytes) = payload else {
            warn!("nunchuck message without payload, dropping");
            return;
        };
        match NunchuckSample::parse(bytes) {
            Some(sample) => events.publish(DeviceEvent::Nunchuck(sample)),
            None => warn!(len = bytes.len(), "malformed nunchuck sample, dropping"),
        }
    }
}

/// Passes test messages through untouched.
struct TestHandler;

impl Handler for TestHandler {
    fn handle(&mut self, payload: Option<&[u8]>, events: &mut dyn EventSink) {
        events.publish(DeviceEvent::Test {
            payload: payload.map(<[u8]>::to_vec),
        });
    }
}
