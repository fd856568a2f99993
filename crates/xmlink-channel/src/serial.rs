//! Serial device setup.
//!
//! Opens a tty device in raw 8N1 mode with blocking single-byte reads
//! (VMIN=1, VTIME=0). The microcontroller side runs the same fixed line
//! settings, so nothing is negotiated at runtime.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ChannelError, Result};
use crate::stream::SerialStream;

/// Supported line speeds.
///
/// A closed set keyed to the termios `B*` constants; rates without a
/// constant on the platform are rejected at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baud {
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
    B230400,
}

impl Baud {
    /// Map a numeric rate to a supported baud, if any.
    pub fn from_rate(rate: u32) -> Result<Self> {
        match rate {
            9_600 => Ok(Baud::B9600),
            19_200 => Ok(Baud::B19200),
            38_400 => Ok(Baud::B38400),
            57_600 => Ok(Baud::B57600),
            115_200 => Ok(Baud::B115200),
            230_400 => Ok(Baud::B230400),
            other => Err(ChannelError::UnsupportedBaud(other)),
        }
    }

    /// The numeric rate in bits per second.
    pub fn rate(self) -> u32 {
        match self {
            Baud::B9600 => 9_600,
            Baud::B19200 => 19_200,
            Baud::B38400 => 38_400,
            Baud::B57600 => 57_600,
            Baud::B115200 => 115_200,
            Baud::B230400 => 230_400,
        }
    }

    #[cfg(unix)]
    fn speed(self) -> libc::speed_t {
        match self {
            Baud::B9600 => libc::B9600,
            Baud::B19200 => libc::B19200,
            Baud::B38400 => libc::B38400,
            Baud::B57600 => libc::B57600,
            Baud::B115200 => libc::B115200,
            Baud::B230400 => libc::B230400,
        }
    }
}

impl std::fmt::Display for Baud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rate())
    }
}

/// Serial device transport.
///
/// Opens and configures a tty for the link; the returned [`SerialStream`]
/// is the only handle the rest of the stack sees.
pub struct SerialPort;

impl SerialPort {
    /// Open a serial device in raw 8N1 mode at the given baud (blocking reads).
    #[cfg(unix)]
    pub fn open(path: impl AsRef<Path>, baud: Baud) -> Result<SerialStream> {
        use std::os::fd::AsRawFd;
        use std::os::unix::fs::OpenOptionsExt;

        let path: PathBuf = path.as_ref().to_path_buf();

        // O_NONBLOCK so open() does not hang waiting for carrier detect;
        // cleared again below once CLOCAL is set.
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&path)
            .map_err(|e| ChannelError::Open {
                path: path.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();
        configure_raw(fd, baud).map_err(|e| ChannelError::Configure {
            path: path.clone(),
            source: e,
        })?;
        clear_nonblock(fd).map_err(|e| ChannelError::Configure {
            path: path.clone(),
            source: e,
        })?;

        info!(?path, baud = baud.rate(), "opened serial device");
        Ok(SerialStream::from_tty(file))
    }
}

/// Put the tty into raw 8N1 mode with VMIN=1/VTIME=0 blocking reads.
#[cfg(unix)]
fn configure_raw(fd: std::os::fd::RawFd, baud: Baud) -> std::io::Result<()> {
    // SAFETY: `termios` is plain-old-data and fully initialized by
    // tcgetattr before any field is consulted; `fd` is an open descriptor
    // owned by the caller for the duration of the call.
    unsafe {
        let mut tio: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut tio) != 0 {
            return Err(std::io::Error::last_os_error());
        }

        libc::cfmakeraw(&mut tio);
        // 8 data bits, no parity, 1 stop bit; ignore modem control lines.
        tio.c_cflag &= !(libc::PARENB | libc::CSTOPB | libc::CSIZE);
        tio.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;
        // Block until at least one byte is available, no inter-byte timer.
        tio.c_cc[libc::VMIN] = 1;
        tio.c_cc[libc::VTIME] = 0;

        if libc::cfsetispeed(&mut tio, baud.speed()) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        if libc::cfsetospeed(&mut tio, baud.speed()) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        if libc::tcsetattr(fd, libc::TCSANOW, &tio) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        if libc::tcflush(fd, libc::TCIOFLUSH) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    debug!(fd, "tty configured raw 8N1");
    Ok(())
}

#[cfg(unix)]
fn clear_nonblock(fd: std::os::fd::RawFd) -> std::io::Result<()> {
    // SAFETY: fcntl on an owned open descriptor with valid flag arguments.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 {
            return Err(std::io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) < 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}
