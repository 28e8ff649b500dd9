//! UDP transport for the query engine

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use crate::dns::client::Transport;

/// Owns the socket for one query. Binding happens once, before the first
/// send, so every retry goes out from the same source port; the socket is
/// released when the transport is dropped, on every exit path.
pub struct DnsUdpTransport {
    socket: UdpSocket,
}

impl DnsUdpTransport {
    pub fn new(server: Ipv4Addr, port: u16) -> io::Result<DnsUdpTransport> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(SocketAddrV4::new(server, port))?;

        Ok(DnsUdpTransport { socket })
    }
}

impl Transport for DnsUdpTransport {
    fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        self.socket.send(payload)?;

        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        self.socket.set_read_timeout(Some(timeout))?;

        match self.socket.recv(buf) {
            Ok(len) => Ok(Some(len)),
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
