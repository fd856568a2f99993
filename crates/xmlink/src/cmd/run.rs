use std::sync::mpsc;
use std::time::Duration;

use tracing::{info, warn};
use xmlink_channel::{Baud, SerialPort};
use xmlink_node::{DeviceEvent, EventSink, LinkNode, NodeConfig};

use crate::cmd::RunArgs;
use crate::exit::{channel_error, node_error, CliError, CliResult, INTERNAL, SUCCESS};

/// How long shutdown may wait for the link threads before giving up. A
/// reader parked in `read()` on an idle tty only returns once the process
/// exits, so the join must be bounded.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Prints each published event as one JSON line on stdout.
struct StdoutSink;

impl EventSink for StdoutSink {
    fn publish(&mut self, event: DeviceEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::error!(%err, "failed to serialize event"),
        }
    }
}

pub fn run(args: RunArgs) -> CliResult<i32> {
    let baud =
        Baud::from_rate(args.baud).map_err(|err| channel_error("invalid baud rate", err))?;
    let stream = SerialPort::open(&args.device, baud)
        .map_err(|err| channel_error("failed to open device", err))?;

    let node = LinkNode::spawn(
        stream,
        args.profile.build(),
        StdoutSink,
        NodeConfig::default(),
    )
    .map_err(|err| node_error("failed to start link", err))?;

    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;

    info!(device = %args.device.display(), "link running, press ctrl-c to stop");
    let _ = stop_rx.recv();

    match join_with_grace(SHUTDOWN_GRACE, move || node.shutdown()) {
        Some(result) => result.map_err(|err| node_error("shutdown failed", err))?,
        None => {
            warn!("reader still blocked on an idle line, exiting without joining");
            std::process::exit(SUCCESS);
        }
    }
    Ok(SUCCESS)
}

/// Run `task` on its own thread and wait at most `grace` for its result.
///
/// `None` means the task is still running; the thread is left detached and
/// the caller decides what to do about it.
fn join_with_grace<T: Send + 'static>(
    grace: Duration,
    task: impl FnOnce() -> T + Send + 'static,
) -> Option<T> {
    let (done_tx, done_rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = done_tx.send(task());
    });
    done_rx.recv_timeout(grace).ok()
}
