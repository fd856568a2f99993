use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};
use xmlink_channel::SerialStream;
use xmlink_frame::{Decoded, FrameConfig, FrameReader, FrameWriter, Opcode};

use crate::command::{CommandPort, CommandRef, PortMessage};
use crate::error::{NodeError, Result};
use crate::profile::DeviceProfile;
use crate::registry::{CommandRegistry, EventSink, HandlerRegistry};

/// Link node behavior configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Frame reader/writer configuration. The default blocks reads without
    /// bound, which is the baseline contract against a quiet device.
    pub frame: FrameConfig,
}

/// A running link: the inbound decode loop and the outbound command writer,
/// each on its own thread over a cloned full-duplex stream.
///
/// The two flows share only the wire; there is no shared decode state and
/// the registries are moved into their owning threads, so nothing needs a
/// lock.
pub struct LinkNode {
    stop: Arc<AtomicBool>,
    control: SerialStream,
    port: CommandPort,
    reader: Option<JoinHandle<Result<()>>>,
    writer: Option<JoinHandle<Result<()>>>,
}

impl LinkNode {
    /// Spawn the node over a stream with the given profile.
    ///
    /// Decoded results are published to `sink` from the reader thread.
    pub fn spawn(
        stream: SerialStream,
        profile: DeviceProfile,
        sink: impl EventSink + Send + 'static,
        config: NodeConfig,
    ) -> Result<Self> {
        let (handlers, commands) = profile.into_parts();
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();

        let reader_stream = stream.try_clone()?;
        let writer_stream = stream.try_clone()?;
        let reader = FrameReader::with_config_serial(reader_stream, config.frame.clone())?;
        let writer = FrameWriter::with_config_serial(writer_stream, config.frame)?;

        let reader_stop = Arc::clone(&stop);
        let reader_handle = std::thread::Builder::new()
            .name("xmlink-reader".to_string())
            .spawn(move || read_loop(reader, handlers, sink, reader_stop))
            .map_err(xmlink_channel::ChannelError::from)?;

        let writer_handle = std::thread::Builder::new()
            .name("xmlink-writer".to_string())
            .spawn(move || write_loop(writer, commands, rx))
            .map_err(xmlink_channel::ChannelError::from)?;

        info!("link node started");
        Ok(Self {
            stop,
            control: stream,
            port: CommandPort { tx },
            reader: Some(reader_handle),
            writer: Some(writer_handle),
        })
    }

    /// A cloneable handle for queueing outbound commands.
    pub fn command_port(&self) -> CommandPort {
        self.port.clone()
    }

    /// Stop both tasks and wait for them.
    ///
    /// Read errors observed after the stop flag is set count as clean
    /// shutdown; anything else propagates as the node's exit error.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.port.tx.send(PortMessage::Shutdown);
        let _ = self.control.shutdown();

        let reader = self
            .reader
            .take()
            .expect("reader handle present until shutdown");
        let writer = self
            .writer
            .take()
            .expect("writer handle present until shutdown");

        let reader_result = reader
            .join()
            .map_err(|_| NodeError::TaskPanicked("reader"))?;
        let writer_result = writer
            .join()
            .map_err(|_| NodeError::TaskPanicked("writer"))?;

        reader_result?;
        writer_result?;
        info!("link node stopped");
        Ok(())
    }

    /// Block until the reader task exits on its own (link closed or failed).
    ///
    /// Use this when the node should run until the device goes away rather
    /// than until the host decides to stop.
    pub fn wait(mut self) -> Result<()> {
        let reader = self
            .reader
            .take()
            .expect("reader handle present until wait");
        let reader_result = reader
            .join()
            .map_err(|_| NodeError::TaskPanicked("reader"))?;

        // Reader is gone; tear down the writer side too.
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.port.tx.send(PortMessage::Shutdown);
        if let Some(writer) = self.writer.take() {
            writer
                .join()
                .map_err(|_| NodeError::TaskPanicked("writer"))??;
        }

        reader_result
    }
}

impl std::fmt::Debug for LinkNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkNode")
            .field("stopped", &self.stop.load(Ordering::SeqCst))
            .finish()
    }
}

/// The unbounded inbound loop: classify, extract, dispatch, repeat.
///
/// Non-fatal conditions (unrecognized opcode, registered class-length
/// opcode with no handler) are logged and skipped; I/O failure ends the
/// loop, cleanly if shutdown was requested.
fn read_loop(
    mut reader: FrameReader<SerialStream>,
    mut handlers: HandlerRegistry,
    mut sink: impl EventSink,
    stop: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        match reader.read_frame(&handlers) {
            Ok(Decoded::Frame(frame)) => {
                if frame.opcode.is_error() {
                    debug!(opcode = %frame.opcode, "device error flag set");
                }
                if !handlers.dispatch(&frame, &mut sink) {
                    debug!(opcode = %frame.opcode, "no handler for message");
                }
            }
            Ok(Decoded::Unknown(opcode)) => {
                warn!(%opcode, "unrecognized opcode, dropping");
            }
            Err(err) => {
                if stop.load(Ordering::SeqCst) {
                    debug!("reader stopped");
                    return Ok(());
                }
                return Err(err.into());
            }
        }
    }
}

/// The outbound loop: resolve, encode, write, repeat.
///
/// An unregistered command name is logged and skipped (the caller only
/// sees it in the log, by design); write failures are fatal.
fn write_loop(
    mut writer: FrameWriter<SerialStream>,
    commands: CommandRegistry,
    rx: mpsc::Receiver<PortMessage>,
) -> Result<()> {
    for message in rx.iter() {
        let request = match message {
            PortMessage::Request(request) => request,
            PortMessage::Shutdown => break,
        };

        let opcode = match &request.command {
            CommandRef::Named(name) => match commands.resolve(name) {
                Some(opcode) => opcode,
                None => {
                    warn!(name, "unregistered command name, skipping write");
                    continue;
                }
            },
            CommandRef::Raw(raw) => Opcode::new(*raw),
        };

        debug!(%opcode, len = request.payload.as_ref().map_or(0, Vec::len), "writing command");
        writer.send(opcode, request.payload.as_deref())?;
    }
    debug!("writer stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::command::CommandRequest;
    use crate::event::DeviceEvent;
    use crate::towbot;

    const RECV_TIMEOUT: Duration = Duration::from_secs(5);

    fn spawn_towbot() -> (LinkNode, SerialStream, mpsc::Receiver<DeviceEvent>) {
        let (host_side, device_side) = SerialStream::pair().unwrap();
        let (event_tx, event_rx) = mpsc::channel();
        let node = LinkNode::spawn(
            host_side,
            towbot::profile(),
            event_tx,
            NodeConfig::default(),
        )
        .unwrap();
        (node, device_side, event_rx)
    }

    #[test]
    fn inbound_nunchuck_frame_reaches_the_sink() {
        let (node, mut device, events) = spawn_towbot();

        device
            .write_all(&[0xC0, 0x06, 0x80, 0x80, 0x10, 0x20, 0x30, 0b10])
            .unwrap();

        match events.recv_timeout(RECV_TIMEOUT).unwrap() {
            DeviceEvent::Nunchuck(sample) => {
                assert_eq!(sample.stick_x, 0x80);
                assert_eq!(sample.accel, [0x10, 0x20, 0x30]);
                assert!(sample.button_c);
                assert!(!sample.button_z);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        node.shutdown().unwrap();
    }

    #[test]
    fn named_command_hits_the_wire_without_length_prefix() {
        let (node, mut device, _events) = spawn_towbot();

        node.command_port()
            .send(CommandRequest::named("motors", vec![0x01, 0x02]))
            .unwrap();

        let mut wire = [0u8; 3];
        device.read_exact(&mut wire).unwrap();
        assert_eq!(wire, [0x80, 0x01, 0x02]);

        node.shutdown().unwrap();
    }

    #[test]
    fn empty_command_writes_bare_opcode() {
        let (node, mut device, _events) = spawn_towbot();

        node.command_port()
            .send(CommandRequest::empty("robot_start"))
            .unwrap();

        let mut wire = [0u8; 1];
        device.read_exact(&mut wire).unwrap();
        assert_eq!(wire, [0x02]);

        node.shutdown().unwrap();
    }

    #[test]
    fn unknown_command_name_writes_nothing() {
        let (node, mut device, _events) = spawn_towbot();
        let port = node.command_port();

        port.send(CommandRequest::empty("afterburner")).unwrap();
        // The next registered command must be the first thing on the wire.
        port.send(CommandRequest::empty("robot_start")).unwrap();

        let mut wire = [0u8; 1];
        device.read_exact(&mut wire).unwrap();
        assert_eq!(wire, [0x02]);

        node.shutdown().unwrap();
    }

    #[test]
    fn raw_opcode_bypasses_the_registry() {
        let (node, mut device, _events) = spawn_towbot();

        node.command_port()
            .send(CommandRequest::raw(0x7E, Some(vec![0x01])))
            .unwrap();

        let mut wire = [0u8; 2];
        device.read_exact(&mut wire).unwrap();
        assert_eq!(wire, [0x7E, 0x01]);

        node.shutdown().unwrap();
    }

    #[test]
    fn unrecognized_opcode_does_not_desync_the_stream() {
        let (node, mut device, events) = spawn_towbot();

        // 0xC1 is unknown (one byte dropped); the test frame behind it
        // must still decode.
        device.write_all(&[0xC1, 0x40, 0x55]).unwrap();

        match events.recv_timeout(RECV_TIMEOUT).unwrap() {
            DeviceEvent::Test { payload } => assert_eq!(payload, Some(vec![0x55])),
            other => panic!("unexpected event: {other:?}"),
        }

        node.shutdown().unwrap();
    }

    #[test]
    fn device_error_message_is_surfaced_to_its_handler() {
        let (node, mut device, events) = spawn_towbot();

        device.write_all(&[0xF0, 0x02, 0xDE, 0xAD]).unwrap();

        match events.recv_timeout(RECV_TIMEOUT).unwrap() {
            DeviceEvent::DeviceError { opcode, payload } => {
                assert_eq!(opcode, 0xF0);
                assert_eq!(payload, vec![0xDE, 0xAD]);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        node.shutdown().unwrap();
    }

    #[test]
    fn repeated_frames_repeat_events() {
        let (node, mut device, events) = spawn_towbot();

        for _ in 0..3 {
            device.write_all(&[0x40, 0x07]).unwrap();
        }
        for _ in 0..3 {
            match events.recv_timeout(RECV_TIMEOUT).unwrap() {
                DeviceEvent::Test { payload } => assert_eq!(payload, Some(vec![0x07])),
                other => panic!("unexpected event: {other:?}"),
            }
        }

        node.shutdown().unwrap();
    }

    #[test]
    fn shutdown_joins_both_tasks_cleanly() {
        let (node, device, _events) = spawn_towbot();
        node.shutdown().unwrap();
        drop(device);
    }

    #[test]
    fn command_port_fails_after_shutdown() {
        let (node, _device, _events) = spawn_towbot();
        let port = node.command_port();
        node.shutdown().unwrap();

        let err = port.send(CommandRequest::empty("robot_start")).unwrap_err();
        assert!(matches!(err, NodeError::PortClosed));
    }

    #[test]
    fn device_hangup_ends_wait_with_link_closed() {
        let (node, device, _events) = spawn_towbot();
        device.shutdown().unwrap();

        let err = node.wait().unwrap_err();
        assert!(matches!(
            err,
            NodeError::Frame(xmlink_frame::FrameError::ConnectionClosed)
        ));
    }
}
