//! Datagram channel seam between the endpoint and the host network stack.
//!
//! The protocol layers never touch a socket directly; they go through
//! [`DatagramChannel`], which [`UdpChannel`] implements over a non-blocking
//! `std::net::UdpSocket`. Tests substitute the in-memory channel from
//! [`crate::testing`].

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

/// Size of the receive buffer handed to `recv_from`.
pub const RECV_BUFFER: usize = 2048;

/// A best-effort, non-blocking datagram transport.
pub trait DatagramChannel {
    /// Send one datagram toward `target`.
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// Non-blocking receive: `Ok(None)` when nothing is queued.
    fn poll_recv_from(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// UDP implementation over the host socket layer.
pub struct UdpChannel {
    socket: UdpSocket,
}

impl UdpChannel {
    /// Bind to `local_port` on all interfaces, in non-blocking mode.
    pub fn bind(local_port: u16) -> io::Result<Self> {
        Self::bind_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, local_port)))
    }

    /// Bind to an explicit local address, in non-blocking mode.
    pub fn bind_addr(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        tracing::debug!(local = %socket.local_addr()?, "UDP channel bound");
        Ok(Self { socket })
    }
}

impl DatagramChannel for UdpChannel {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(buf, target)
    }

    fn poll_recv_from(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buf) {
            Ok((len, from)) => Ok(Some((len, from))),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}
