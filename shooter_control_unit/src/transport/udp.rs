//! UDP command channel.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use tracing::debug;

use super::{CommandChannel, RecvOutcome, TransportError};

/// Command channel bound to a local UDP port.
#[derive(Debug)]
pub struct UdpCommandChannel {
    socket: UdpSocket,
    /// Read timeout currently set on the socket.
    read_timeout: Option<Duration>,
}

impl UdpCommandChannel {
    /// Bind `addr:port`.
    pub fn bind(addr: &str, port: u16) -> Result<Self, TransportError> {
        let target = format!("{addr}:{port}");
        let socket = UdpSocket::bind(target.as_str()).map_err(|source| TransportError::Bind {
            addr: target.clone(),
            source,
        })?;
        debug!("UDP command channel bound to {target}");
        Ok(Self {
            socket,
            read_timeout: None,
        })
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        // A zero read timeout is rejected by the OS.
        let timeout = timeout.map(|t| t.max(Duration::from_millis(1)));
        if timeout != self.read_timeout {
            self.socket
                .set_read_timeout(timeout)
                .map_err(TransportError::Receive)?;
            self.read_timeout = timeout;
        }
        Ok(())
    }
}

impl CommandChannel for UdpCommandChannel {
    fn recv(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<RecvOutcome, TransportError> {
        self.set_timeout(timeout)?;
        match self.socket.recv_from(buf) {
            Ok((len, _peer)) => Ok(RecvOutcome::Packet(len)),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(RecvOutcome::TimedOut)
            }
            Err(e) => Err(TransportError::Receive(e)),
        }
    }
}
