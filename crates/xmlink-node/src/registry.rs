use std::collections::HashMap;

use tracing::debug;
use xmlink_frame::{Frame, Opcode, OpcodeTable};

use crate::event::DeviceEvent;

/// Where handlers publish decoded results.
///
/// This is the outbound hook of the core: a handler receives payload bytes
/// and may produce zero or more typed events for downstream consumers. The
/// event schema is device-profile territory, not framing territory.
pub trait EventSink {
    fn publish(&mut self, event: DeviceEvent);
}

impl EventSink for std::sync::mpsc::Sender<DeviceEvent> {
    fn publish(&mut self, event: DeviceEvent) {
        if self.send(event).is_err() {
            debug!("event receiver dropped, discarding event");
        }
    }
}

impl EventSink for Vec<DeviceEvent> {
    fn publish(&mut self, event: DeviceEvent) {
        self.push(event);
    }
}

/// An inbound message handler.
///
/// `payload` is `None` only for table-length-0 messages; otherwise its
/// length is exactly what the decoder read for this opcode.
pub trait Handler: Send {
    fn handle(&mut self, payload: Option<&[u8]>, events: &mut dyn EventSink);
}

impl<F> Handler for F
where
    F: FnMut(Option<&[u8]>, &mut dyn EventSink) + Send,
{
    fn handle(&mut self, payload: Option<&[u8]>, events: &mut dyn EventSink) {
        self(payload, events)
    }
}

/// Opcode → handler mapping for inbound dispatch.
///
/// Populated once by a device profile; immutable once the profile is built.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Opcode, Box<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, opcode: Opcode, handler: Box<dyn Handler>) {
        self.handlers.insert(opcode, handler);
    }

    /// Invoke the handler registered for the frame's opcode.
    ///
    /// Returns `false` when no handler is registered; the caller logs and
    /// continues the loop.
    pub fn dispatch(&mut self, frame: &Frame, events: &mut dyn EventSink) -> bool {
        match self.handlers.get_mut(&frame.opcode) {
            Some(handler) => {
                handler.handle(frame.payload.as_deref(), events);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered opcodes, unordered.
    pub fn opcodes(&self) -> impl Iterator<Item = Opcode> + '_ {
        self.handlers.keys().copied()
    }
}

impl OpcodeTable for HandlerRegistry {
    fn contains(&self, opcode: Opcode) -> bool {
        self.handlers.contains_key(&opcode)
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut opcodes: Vec<Opcode> = self.handlers.keys().copied().collect();
        opcodes.sort();
        f.debug_struct("HandlerRegistry")
            .field("opcodes", &opcodes)
            .finish()
    }
}

/// Symbolic name → opcode mapping for outbound encoding.
///
/// Independent key space from the handler registry: outbound names need not
/// correspond to inbound opcodes, though a profile may reuse numeric values
/// in both directions.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Opcode>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, opcode: Opcode) {
        self.commands.insert(name.into(), opcode);
    }

    /// Resolve a command name to its opcode.
    pub fn resolve(&self, name: &str) -> Option<Opcode> {
        self.commands.get(name).copied()
    }

    /// Registered command names, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use xmlink_frame::Frame;

    use super::*;
    use crate::event::DeviceEvent;

    fn frame(opcode: u8, payload: Option<&'static [u8]>) -> Frame {
        Frame::new(Opcode::new(opcode), payload.map(Bytes::from_static))
    }

    #[test]
    fn dispatch_invokes_matching_handler() {
        let mut registry = HandlerRegistry::new();
        registry.insert(
            Opcode::new(0x40),
            Box::new(|payload: Option<&[u8]>, events: &mut dyn EventSink| {
                events.publish(DeviceEvent::Test {
                    payload: payload.map(<[u8]>::to_vec),
                });
            }),
        );

        let mut events: Vec<DeviceEvent> = Vec::new();
        let hit = registry.dispatch(&frame(0x40, Some(&[0x07])), &mut events);

        assert!(hit);
        assert_eq!(
            events,
            vec![DeviceEvent::Test {
                payload: Some(vec![0x07])
            }]
        );
    }

    #[test]
    fn dispatch_without_handler_reports_miss() {
        let mut registry = HandlerRegistry::new();
        let mut events: Vec<DeviceEvent> = Vec::new();

        assert!(!registry.dispatch(&frame(0x40, None), &mut events));
        assert!(events.is_empty());
    }

    #[test]
    fn handler_sees_absence_marker() {
        let mut registry = HandlerRegistry::new();
        registry.insert(
            Opcode::new(0x02),
            Box::new(|payload: Option<&[u8]>, events: &mut dyn EventSink| {
                assert!(payload.is_none());
                events.publish(DeviceEvent::Test { payload: None });
            }),
        );

        let mut events: Vec<DeviceEvent> = Vec::new();
        assert!(registry.dispatch(&frame(0x02, None), &mut events));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn repeated_dispatch_has_no_cross_frame_state() {
        let mut registry = HandlerRegistry::new();
        registry.insert(
            Opcode::new(0xC0),
            Box::new(|payload: Option<&[u8]>, events: &mut dyn EventSink| {
                events.publish(DeviceEvent::Test {
                    payload: payload.map(<[u8]>::to_vec),
                });
            }),
        );

        let mut events: Vec<DeviceEvent> = Vec::new();
        for _ in 0..3 {
            registry.dispatch(&frame(0xC0, Some(&[0xAA, 0xBB])), &mut events);
        }

        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|event| {
            *event
                == DeviceEvent::Test {
                    payload: Some(vec![0xAA, 0xBB]),
                }
        }));
    }

    #[test]
    fn command_registry_resolves_known_names_only() {
        let mut registry = CommandRegistry::new();
        registry.insert("motors", Opcode::new(0x80));

        assert_eq!(registry.resolve("motors"), Some(Opcode::new(0x80)));
        assert_eq!(registry.resolve("afterburner"), None);
    }
}
