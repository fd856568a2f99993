use std::io::{Read, Write};

use crate::error::Result;

/// A connected serial byte stream — implements Read + Write.
///
/// This is the fundamental I/O type the link driver runs on. The read and
/// write cursors are independent (full-duplex), so a cloned handle may write
/// while the original blocks in a read.
pub struct SerialStream {
    inner: SerialStreamInner,
}

enum SerialStreamInner {
    /// A raw-mode tty device file.
    #[cfg(unix)]
    Tty(std::fs::File),
    /// A socket-pair loopback, used by tests and the CLI demo mode.
    #[cfg(unix)]
    Loopback(std::os::unix::net::UnixStream),
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Tty(file) => file.read(buf),
            #[cfg(unix)]
            SerialStreamInner::Loopback(stream) => stream.read(buf),
        }
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Tty(file) => file.write(buf),
            #[cfg(unix)]
            SerialStreamInner::Loopback(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Tty(file) => file.flush(),
            #[cfg(unix)]
            SerialStreamInner::Loopback(stream) => stream.flush(),
        }
    }
}

impl SerialStream {
    /// Create a SerialStream from an already-configured tty device file.
    #[cfg(unix)]
    pub(crate) fn from_tty(file: std::fs::File) -> Self {
        Self {
            inner: SerialStreamInner::Tty(file),
        }
    }

    /// Create a connected loopback pair.
    ///
    /// Bytes written to one end are read from the other, in order. Used by
    /// tests and the CLI loopback mode in place of a physical device.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((
            Self {
                inner: SerialStreamInner::Loopback(left),
            },
            Self {
                inner: SerialStreamInner::Loopback(right),
            },
        ))
    }

    /// Set read timeout on the underlying stream.
    ///
    /// Only loopback streams support timeouts; a tty stream blocks without
    /// bound between bytes (VMIN=1), which is the baseline link contract.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Tty(_) => {
                if timeout.is_some() {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::Unsupported,
                        "tty reads block without timeout",
                    )
                    .into());
                }
                Ok(())
            }
            #[cfg(unix)]
            SerialStreamInner::Loopback(stream) => {
                stream.set_read_timeout(timeout).map_err(Into::into)
            }
        }
    }

    /// Set write timeout on the underlying stream.
    ///
    /// Same contract as [`Self::set_read_timeout`]: loopback only.
    pub fn set_write_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Tty(_) => {
                if timeout.is_some() {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::Unsupported,
                        "tty writes block without timeout",
                    )
                    .into());
                }
                Ok(())
            }
            #[cfg(unix)]
            SerialStreamInner::Loopback(stream) => {
                stream.set_write_timeout(timeout).map_err(Into::into)
            }
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Tty(file) => {
                let cloned = file.try_clone()?;
                Ok(Self::from_tty(cloned))
            }
            #[cfg(unix)]
            SerialStreamInner::Loopback(stream) => {
                let cloned = stream.try_clone()?;
                Ok(Self {
                    inner: SerialStreamInner::Loopback(cloned),
                })
            }
        }
    }

    /// Tear down the stream, unblocking any reader on a cloned handle.
    ///
    /// On a loopback this shuts down both directions of the socket, so a
    /// blocked `read` returns 0 (EOF). On a tty it discards unread input;
    /// a reader blocked on an idle line unblocks on the next byte or at
    /// process exit, which is the link's baseline termination contract.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Tty(file) => {
                use std::os::fd::AsRawFd;
                let fd = file.as_raw_fd();
                // SAFETY: `fd` is an open tty descriptor owned by this stream.
                let rc = unsafe { libc::tcflush(fd, libc::TCIFLUSH) };
                if rc != 0 {
                    return Err(std::io::Error::last_os_error().into());
                }
                Ok(())
            }
            #[cfg(unix)]
            SerialStreamInner::Loopback(stream) => stream
                .shutdown(std::net::Shutdown::Both)
                .map_err(Into::into),
        }
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Tty(_) => f
                .debug_struct("SerialStream")
                .field("type", &"tty")
                .finish(),
            #[cfg(unix)]
            SerialStreamInner::Loopback(_) => f
                .debug_struct("SerialStream")
                .field("type", &"loopback")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_pair_roundtrip() {
        let (mut left, mut right) = SerialStream::pair().unwrap();

        left.write_all(b"hello").unwrap();
        let mut buf = [0u8; 5];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        right.write_all(b"olleh").unwrap();
        left.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"olleh");
    }

    #[test]
    fn clone_shares_the_wire() {
        let (left, mut right) = SerialStream::pair().unwrap();
        let mut writer = left.try_clone().unwrap();

        writer.write_all(b"via-clone").unwrap();
        let mut buf = [0u8; 9];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"via-clone");
    }

    #[test]
    fn shutdown_unblocks_reader() {
        let (left, right) = SerialStream::pair().unwrap();
        let mut reader = right.try_clone().unwrap();

        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 1];
            reader.read(&mut buf)
        });

        right.shutdown().unwrap();
        let read = handle.join().unwrap().unwrap();
        assert_eq!(read, 0, "EOF after shutdown");
        drop(left);
    }

    #[test]
    fn loopback_write_timeout() {
        let (mut left, _right) = SerialStream::pair().unwrap();
        left.set_write_timeout(Some(std::time::Duration::from_millis(10)))
            .unwrap();

        // Nothing drains the other end, so the socket buffer fills and the
        // timeout fires.
        let chunk = [0u8; 64 * 1024];
        let err = loop {
            if let Err(err) = left.write_all(&chunk) {
                break err;
            }
        };
        assert!(matches!(
            err.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
        ));
    }

    #[test]
    fn loopback_read_timeout() {
        let (_left, mut right) = SerialStream::pair().unwrap();
        right
            .set_read_timeout(Some(std::time::Duration::from_millis(10)))
            .unwrap();

        let mut buf = [0u8; 1];
        let err = right.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
        ));
    }
}
