//! UDP transport.

use crate::error::WriterError;
use bytes::Bytes;
use parking_lot::Mutex;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

/// Unconnected UDP socket bound to an ephemeral local port.
pub struct UdpTransport {
    socket: Mutex<UdpSocket>,
    destination: SocketAddr,
}

impl UdpTransport {
    /// Resolves `addr` and opens a local socket of the matching family.
    pub fn connect(addr: &str) -> Result<Self, WriterError> {
        if addr.trim().is_empty() {
            return Err(WriterError::InvalidAddress("address is empty".to_string()));
        }

        let destination = addr
            .to_socket_addrs()
            .map_err(|source| WriterError::Resolve {
                addr: addr.to_string(),
                source,
            })?
            .next()
            .ok_or_else(|| WriterError::InvalidAddress(format!("'{}' resolved to nothing", addr)))?;

        let bind_addr: SocketAddr = if destination.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind_addr)?;

        tracing::debug!(%destination, local = ?socket.local_addr().ok(), "opened UDP transport");

        Ok(Self {
            socket: Mutex::new(socket),
            destination,
        })
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.lock().local_addr()
    }

    /// Sends each datagram in order, stopping at the first failure.
    ///
    /// The socket stays locked for the whole message so chunks from
    /// concurrent writers never interleave on this handle.
    pub fn send(&self, datagrams: &[Bytes]) -> Result<usize, WriterError> {
        let socket = self.socket.lock();
        let mut bytes_sent = 0;
        for (sent, datagram) in datagrams.iter().enumerate() {
            match socket.send_to(datagram, self.destination) {
                Ok(n) => {
                    tracing::trace!(len = n, index = sent, "sent datagram");
                    bytes_sent += n;
                }
                Err(source) => {
                    return Err(WriterError::Transport {
                        sent,
                        total: datagrams.len(),
                        source,
                    });
                }
            }
        }
        Ok(bytes_sent)
    }
}
