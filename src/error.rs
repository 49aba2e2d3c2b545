//! Error types for the test server.

use std::io;
use std::net::SocketAddr;

/// Errors raised while starting or running a responder.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Another process (or another responder) already holds the port.
    #[error("port {} is already in use on {}; stop the other service or pick another port", .addr.port(), .addr.ip())]
    AddrInUse { addr: SocketAddr },

    /// Any other failure to bind the listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// None of the requested ports could be bound.
    #[error("no listener could be started (tried {attempted} ports)")]
    NothingStarted { attempted: usize },
}

impl ServerError {
    /// Classify a bind failure for `addr`.
    pub fn from_bind(addr: SocketAddr, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::AddrInUse {
            ServerError::AddrInUse { addr }
        } else {
            ServerError::Bind { addr, source }
        }
    }

    /// True when the port was taken by someone else.
    pub fn is_addr_in_use(&self) -> bool {
        matches!(self, ServerError::AddrInUse { .. })
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
