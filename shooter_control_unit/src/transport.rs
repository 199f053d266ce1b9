//! Command channel: where target datagrams come from.

pub mod udp;

use std::io;
use std::time::Duration;

use thiserror::Error;

pub use udp::UdpCommandChannel;

/// Result of one receive attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvOutcome {
    /// A datagram of this many bytes was written into the buffer.
    Packet(usize),
    /// Nothing arrived within the timeout.
    TimedOut,
}

/// Command channel errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// One receive failed; the channel is still usable.
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),

    /// The channel can no longer deliver commands.
    #[error("command channel closed")]
    Closed,
}

/// Blocking source of command datagrams.
pub trait CommandChannel {
    /// Receive one datagram into `buf`.
    ///
    /// `None` waits indefinitely. Datagrams longer than `buf` are truncated.
    fn recv(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<RecvOutcome, TransportError>;
}

impl<T: CommandChannel + ?Sized> CommandChannel for Box<T> {
    fn recv(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<RecvOutcome, TransportError> {
        (**self).recv(buf, timeout)
    }
}
