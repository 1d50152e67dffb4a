//! Minimal ONC RPC (RFC 5531) client for NFSv3 `FSSTAT`.
//!
//! ```text
//!  NfsConnection ──► RpcClient ──► UDP datagram / TCP record marking
//!        │               │
//!   FSSTAT3 args     call header + AUTH_SYS credentials
//!   FSSTAT3res       reply header (accepted / denied)
//! ```
//!
//! Only what `nfsdf` needs is implemented: one program per client, blocking
//! calls with a fixed timeout, and the portmapper `GETPORT` lookup.

pub mod auth;
mod client;
pub mod message;
pub mod nfs;
pub mod portmap;
pub mod xdr;

pub use client::RpcClient;
pub use nfs::{FsStat, FsStatReply, NfsConnection, NfsConnector, NfsStatus};

use std::io;

/// Errors from the RPC layer. Any of these means no usable reply was obtained.
#[derive(Debug)]
pub enum RpcError {
    /// Socket creation, bind, connect, send or receive failed.
    Io(io::Error),
    /// No reply within the timeout.
    Timeout,
    /// Reply could not be decoded.
    Garbage(String),
    /// Server rejected the call (RPC version mismatch or authentication error).
    Denied(String),
    /// Server accepted the call but could not run it.
    NotAccepted(String),
    /// Portmapper has no registration for the program.
    Unregistered { program: u32, version: u32 },
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcError::Io(e) => write!(f, "RPC: {}", e),
            RpcError::Timeout => write!(f, "RPC: Timed out"),
            RpcError::Garbage(msg) => write!(f, "RPC: Can't decode result: {}", msg),
            RpcError::Denied(msg) => write!(f, "RPC: Call rejected: {}", msg),
            RpcError::NotAccepted(msg) => write!(f, "RPC: {}", msg),
            RpcError::Unregistered { program, version } => write!(
                f,
                "RPC: Program not registered (program {} version {})",
                program, version
            ),
        }
    }
}

impl std::error::Error for RpcError {}

impl From<io::Error> for RpcError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => RpcError::Timeout,
            _ => RpcError::Io(e),
        }
    }
}
