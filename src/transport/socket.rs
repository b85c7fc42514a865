//! Socket wrappers and the readiness set.
//!
//! Stream (TCP) and datagram (UDP) sockets share one creation and
//! readiness model. Waiting is implemented over the platform poller
//! through `mio`; on non-Unix platforms the readiness set reports
//! `NotSupported`.

use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use log::debug;
use socket2::{Domain, Protocol, Socket, Type};

use crate::{Error, Result};

#[cfg(unix)]
use std::os::fd::{AsRawFd, RawFd};

/// Resolved address of a created socket.
#[derive(Debug, Clone)]
pub struct SocketAddressInfo {
    pub host: String,
    pub port: u16,
    pub address: SocketAddr,
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(Error::from)?
        .next()
        .ok_or(Error::InvalidParameters)
}

/// A transport socket handle.
#[derive(Debug)]
pub enum UaSocket {
    Stream(TcpStream),
    Listener(TcpListener),
    Datagram(UdpSocket),
}

impl UaSocket {
    /// Connects a TCP socket; returns the handle and the resolved address.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameters` on unresolvable hosts and with the
    /// I/O error kind otherwise.
    pub fn tcp_connect(host: &str, port: u16, blocking: bool) -> Result<(Self, SocketAddressInfo)> {
        let address = resolve(host, port)?;
        let stream = TcpStream::connect(address)?;
        stream.set_nonblocking(!blocking)?;
        stream.set_nodelay(true)?;
        debug!("tcp socket connected to {address}");
        Ok((
            Self::Stream(stream),
            SocketAddressInfo {
                host: host.to_owned(),
                port,
                address,
            },
        ))
    }

    /// Binds a TCP listener.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameters` on unresolvable hosts and with the
    /// I/O error kind otherwise.
    pub fn tcp_listen(host: &str, port: u16, blocking: bool) -> Result<(Self, SocketAddressInfo)> {
        let address = resolve(host, port)?;
        let listener = TcpListener::bind(address)?;
        listener.set_nonblocking(!blocking)?;
        let local = listener.local_addr()?;
        Ok((
            Self::Listener(listener),
            SocketAddressInfo {
                host: host.to_owned(),
                port: local.port(),
                address: local,
            },
        ))
    }

    /// Creates a UDP socket bound to the given local address, with address
    /// reuse so several receivers can share a multicast port.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameters` on unresolvable hosts and with the
    /// I/O error kind otherwise.
    pub fn udp_bind(host: &str, port: u16, blocking: bool) -> Result<(Self, SocketAddressInfo)> {
        let address = resolve(host, port)?;
        let domain = if address.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&address.into())?;
        socket.set_nonblocking(!blocking)?;
        let socket: UdpSocket = socket.into();
        let local = socket.local_addr()?;
        Ok((
            Self::Datagram(socket),
            SocketAddressInfo {
                host: host.to_owned(),
                port: local.port(),
                address: local,
            },
        ))
    }

    /// Reads available bytes; `WouldBlock` in non-blocking mode when
    /// nothing is pending, `Closed` on an orderly peer shutdown.
    ///
    /// # Errors
    ///
    /// As described above, or the mapped I/O error kind.
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        use std::io::Read;
        match self {
            Self::Stream(stream) => {
                let read = stream.read(buffer)?;
                if read == 0 && !buffer.is_empty() {
                    // Orderly shutdown by the peer.
                    return Err(Error::Closed);
                }
                Ok(read)
            }
            Self::Datagram(socket) => Ok(socket.recv(buffer)?),
            Self::Listener(_) => Err(Error::InvalidParameters),
        }
    }

    /// Writes bytes; `WouldBlock` when the send buffer is full.
    ///
    /// # Errors
    ///
    /// As described above, or the mapped I/O error kind.
    pub fn write(&mut self, buffer: &[u8]) -> Result<usize> {
        use std::io::Write;
        match self {
            Self::Stream(stream) => Ok(stream.write(buffer)?),
            Self::Datagram(socket) => Ok(socket.send(buffer)?),
            Self::Listener(_) => Err(Error::InvalidParameters),
        }
    }

    /// Shuts the socket down; dropping completes the close.
    pub fn close(&mut self) {
        if let Self::Stream(stream) = self {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }

    #[must_use]
    pub const fn datagram(&self) -> Option<&UdpSocket> {
        match self {
            Self::Datagram(socket) => Some(socket),
            _ => None,
        }
    }

    #[cfg(unix)]
    fn raw_fd(&self) -> RawFd {
        match self {
            Self::Stream(stream) => stream.as_raw_fd(),
            Self::Listener(listener) => listener.as_raw_fd(),
            Self::Datagram(socket) => socket.as_raw_fd(),
        }
    }
}

/// Readiness reported for one set member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketReadiness {
    /// Index of the socket in add order.
    pub index: usize,
    pub readable: bool,
    pub writable: bool,
    pub error: bool,
}

/// Aggregates sockets for a select-like readiness wait.
///
/// The highest raw handle in the set is recorded, as the POSIX select shape
/// requires; the wait itself goes through the platform poller.
#[cfg(unix)]
#[derive(Debug)]
pub struct SocketSet {
    poll: mio::Poll,
    events: mio::Events,
    len: usize,
    max_handle: RawFd,
}

#[cfg(unix)]
impl SocketSet {
    /// Creates an empty set.
    ///
    /// # Errors
    ///
    /// Fails when the platform poller cannot be created.
    pub fn new() -> Result<Self> {
        Ok(Self {
            poll: mio::Poll::new()?,
            events: mio::Events::with_capacity(64),
            len: 0,
            max_handle: -1,
        })
    }

    /// Adds a socket with read and/or write interest; returns its index.
    ///
    /// # Errors
    ///
    /// Fails when registration with the poller fails.
    pub fn add(&mut self, socket: &UaSocket, read: bool, write: bool) -> Result<usize> {
        let mut interest = None;
        if read {
            interest = Some(mio::Interest::READABLE);
        }
        if write {
            interest = Some(match interest {
                Some(other) => other | mio::Interest::WRITABLE,
                None => mio::Interest::WRITABLE,
            });
        }
        let Some(interest) = interest else {
            return Err(Error::InvalidParameters);
        };

        let fd = socket.raw_fd();
        let index = self.len;
        self.poll.registry().register(
            &mut mio::unix::SourceFd(&fd),
            mio::Token(index),
            interest,
        )?;
        self.len += 1;
        if fd > self.max_handle {
            self.max_handle = fd;
        }
        Ok(index)
    }

    /// Highest raw handle registered so far.
    #[must_use]
    pub const fn max_handle(&self) -> RawFd {
        self.max_handle
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Blocks until at least one member is ready or the timeout elapses.
    /// An empty result means the wait timed out.
    ///
    /// # Errors
    ///
    /// Fails when the poller wait fails.
    pub fn wait_events(&mut self, timeout: Option<Duration>) -> Result<Vec<SocketReadiness>> {
        self.poll.poll(&mut self.events, timeout)?;
        let mut ready = Vec::new();
        for event in &self.events {
            ready.push(SocketReadiness {
                index: event.token().0,
                readable: event.is_readable(),
                writable: event.is_writable(),
                error: event.is_error() || event.is_read_closed(),
            });
        }
        Ok(ready)
    }
}

/// Readiness sets are only available on poll-capable platforms.
#[cfg(not(unix))]
#[derive(Debug)]
pub struct SocketSet;

#[cfg(not(unix))]
impl SocketSet {
    pub fn new() -> Result<Self> {
        Err(Error::NotSupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn udp_bind_resolves_address() {
        let (socket, info) = UaSocket::udp_bind("127.0.0.1", 0, false).unwrap();
        assert_eq!(info.host, "127.0.0.1");
        assert_ne!(info.port, 0);
        assert!(socket.datagram().is_some());
    }

    #[test]
    fn unresolvable_host_is_invalid() {
        assert!(UaSocket::udp_bind("", 0, false).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn socket_set_reports_readable_datagram() {
        let (receiver, info) = UaSocket::udp_bind("127.0.0.1", 0, false).unwrap();
        let (sender, _) = UaSocket::udp_bind("127.0.0.1", 0, false).unwrap();

        let mut set = SocketSet::new().unwrap();
        let index = set.add(&receiver, true, false).unwrap();
        assert!(set.max_handle() >= 0);

        // Nothing pending yet.
        let ready = set.wait_events(Some(Duration::from_millis(10))).unwrap();
        assert!(ready.is_empty());

        sender
            .datagram()
            .unwrap()
            .send_to(b"ping", info.address)
            .unwrap();

        let ready = set.wait_events(Some(Duration::from_secs(1))).unwrap();
        assert!(ready.iter().any(|r| r.index == index && r.readable));
    }
}
