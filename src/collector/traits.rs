//! Seams between the stat-call adapter and the network.
//!
//! [`Connector`] creates one [`Connection`] per host. Production code uses
//! [`NfsConnector`](crate::rpc::NfsConnector); tests use
//! [`MockConnector`](super::mock::MockConnector) to script replies without a
//! server.

use crate::rpc::{FsStatReply, RpcError};
use crate::target::Host;

/// An open client for one host.
pub trait Connection {
    /// Issues `FSSTAT` for the filesystem rooted at `handle`.
    ///
    /// # Arguments
    /// * `handle` - Opaque NFSv3 file handle of the export root
    ///
    /// # Returns
    /// The decoded reply. A reply carrying an NFS error status is `Ok` with
    /// that status; `Err` means no usable reply arrived.
    fn fsstat(&mut self, handle: &[u8]) -> Result<FsStatReply, RpcError>;
}

/// Creates connections on first use of a host.
pub trait Connector {
    /// Opens a connection to `host`.
    ///
    /// # Arguments
    /// * `host` - Server to connect to; its address and name are used as-is
    ///
    /// # Returns
    /// A ready connection, or the error that prevented opening it
    fn connect(&self, host: &Host) -> Result<Box<dyn Connection>, RpcError>;
}
