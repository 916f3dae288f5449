use std::net::TcpStream;

use tracing::{debug, warn};

use crate::error::{Result, TransportError};

/// Send/receive buffer size requested for command sockets: 64 KiB.
pub const DEFAULT_SOCKET_BUFFER_SIZE: usize = 64 * 1024;

/// Socket options applied to every freshly opened command stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketOptions {
    /// Disable Nagle's algorithm (`TCP_NODELAY`).
    pub nodelay: bool,
    /// Enable `SO_KEEPALIVE`.
    pub keepalive: bool,
    /// `SO_SNDBUF` in bytes. `None` leaves the kernel default.
    pub send_buffer_size: Option<usize>,
    /// `SO_RCVBUF` in bytes. `None` leaves the kernel default.
    pub recv_buffer_size: Option<usize>,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            nodelay: true,
            keepalive: true,
            send_buffer_size: Some(DEFAULT_SOCKET_BUFFER_SIZE),
            recv_buffer_size: Some(DEFAULT_SOCKET_BUFFER_SIZE),
        }
    }
}

impl SocketOptions {
    /// Apply options to a connected stream.
    ///
    /// `TCP_NODELAY` failures are returned. Keep-alive and buffer sizing are
    /// tuning only; failures there are logged and skipped.
    pub fn apply(&self, stream: &TcpStream) -> Result<()> {
        stream
            .set_nodelay(self.nodelay)
            .map_err(|source| TransportError::SocketOption {
                option: "TCP_NODELAY",
                source,
            })?;

        if self.keepalive {
            if let Err(err) = set_keepalive(stream) {
                warn!(error = %err, "keep-alive not applied");
            }
        }
        if let Some(size) = self.send_buffer_size {
            if let Err(err) = set_send_buffer_size(stream, size) {
                warn!(error = %err, size, "send buffer size not applied");
            }
        }
        if let Some(size) = self.recv_buffer_size {
            if let Err(err) = set_recv_buffer_size(stream, size) {
                warn!(error = %err, size, "receive buffer size not applied");
            }
        }

        debug!(options = ?self, "socket options applied");
        Ok(())
    }
}

#[cfg(unix)]
fn set_keepalive(stream: &TcpStream) -> Result<()> {
    setsockopt_int(stream, libc::SO_KEEPALIVE, 1, "SO_KEEPALIVE")
}

#[cfg(unix)]
fn set_send_buffer_size(stream: &TcpStream, size: usize) -> Result<()> {
    setsockopt_int(stream, libc::SO_SNDBUF, clamp_to_c_int(size), "SO_SNDBUF")
}

#[cfg(unix)]
fn set_recv_buffer_size(stream: &TcpStream, size: usize) -> Result<()> {
    setsockopt_int(stream, libc::SO_RCVBUF, clamp_to_c_int(size), "SO_RCVBUF")
}

#[cfg(unix)]
fn clamp_to_c_int(size: usize) -> libc::c_int {
    libc::c_int::try_from(size).unwrap_or(libc::c_int::MAX)
}

#[cfg(unix)]
fn setsockopt_int(
    stream: &TcpStream,
    name: libc::c_int,
    value: libc::c_int,
    option: &'static str,
) -> Result<()> {
    use std::os::fd::AsRawFd;

    let fd = stream.as_raw_fd();
    // SAFETY: `value` is a live c_int for the duration of the call, the length
    // matches its size, and `fd` is an open socket owned by `stream`.
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            name,
            (&value as *const libc::c_int).cast::<libc::c_void>(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };

    if rc == 0 {
        Ok(())
    } else {
        Err(TransportError::SocketOption {
            option,
            source: std::io::Error::last_os_error(),
        })
    }
}

#[cfg(all(test, unix))]
fn getsockopt_int(stream: &TcpStream, name: libc::c_int) -> Option<libc::c_int> {
    use std::os::fd::AsRawFd;

    let fd = stream.as_raw_fd();
    let mut value: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;

    // SAFETY: `value` and `len` are valid writable pointers for the provided
    // sizes, and `fd` is an open socket owned by `stream`.
    let rc = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            name,
            (&mut value as *mut libc::c_int).cast::<libc::c_void>(),
            &mut len,
        )
    };

    if rc == 0 {
        Some(value)
    } else {
        None
    }
}

#[cfg(not(unix))]
fn set_keepalive(_stream: &TcpStream) -> Result<()> {
    debug!("SO_KEEPALIVE not supported on this platform");
    Ok(())
}

#[cfg(not(unix))]
fn set_send_buffer_size(_stream: &TcpStream, _size: usize) -> Result<()> {
    debug!("SO_SNDBUF not supported on this platform");
    Ok(())
}

#[cfg(not(unix))]
fn set_recv_buffer_size(_stream: &TcpStream, _size: usize) -> Result<()> {
    debug!("SO_RCVBUF not supported on this platform");
    Ok(())
}
