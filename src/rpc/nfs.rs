//! NFSv3 `FSSTAT` procedure (RFC 1813 section 3.3.18).

use std::fmt;
use std::net::SocketAddr;

use bytes::BytesMut;
use tracing::debug;

use super::auth::{AuthSys, Credential};
use super::xdr::{XdrEncode, XdrReader};
use super::{RpcClient, RpcError, portmap};
use crate::collector::{Connection, Connector};
use crate::config::ConnectConfig;
use crate::target::Host;

pub const NFS_PROGRAM: u32 = 100003;
pub const NFS_V3: u32 = 3;
const NFSPROC3_FSSTAT: u32 = 18;

/// Largest NFSv3 file handle.
pub const FHSIZE3: usize = 64;

/// Encoded size of `fattr3`.
const FATTR3_SIZE: usize = 84;

/// `nfsstat3` code from a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NfsStatus(pub u32);

impl NfsStatus {
    pub const OK: NfsStatus = NfsStatus(0);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    /// Symbolic name, e.g. `NFS3ERR_STALE`.
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "NFS3_OK",
            1 => "NFS3ERR_PERM",
            2 => "NFS3ERR_NOENT",
            5 => "NFS3ERR_IO",
            6 => "NFS3ERR_NXIO",
            13 => "NFS3ERR_ACCES",
            17 => "NFS3ERR_EXIST",
            18 => "NFS3ERR_XDEV",
            19 => "NFS3ERR_NODEV",
            20 => "NFS3ERR_NOTDIR",
            21 => "NFS3ERR_ISDIR",
            22 => "NFS3ERR_INVAL",
            27 => "NFS3ERR_FBIG",
            28 => "NFS3ERR_NOSPC",
            30 => "NFS3ERR_ROFS",
            31 => "NFS3ERR_MLINK",
            63 => "NFS3ERR_NAMETOOLONG",
            66 => "NFS3ERR_NOTEMPTY",
            69 => "NFS3ERR_DQUOT",
            70 => "NFS3ERR_STALE",
            71 => "NFS3ERR_REMOTE",
            10001 => "NFS3ERR_BADHANDLE",
            10002 => "NFS3ERR_NOT_SYNC",
            10003 => "NFS3ERR_BAD_COOKIE",
            10004 => "NFS3ERR_NOTSUPP",
            10005 => "NFS3ERR_TOOSMALL",
            10006 => "NFS3ERR_SERVERFAULT",
            10007 => "NFS3ERR_BADTYPE",
            10008 => "NFS3ERR_JUKEBOX",
            _ => "NFS3ERR_UNKNOWN",
        }
    }
}

impl fmt::Display for NfsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

/// Filesystem usage from a successful `FSSTAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FsStat {
    /// Total size in bytes.
    pub tbytes: u64,
    /// Free bytes.
    pub fbytes: u64,
    /// Total file slots (inodes).
    pub tfiles: u64,
    /// Free file slots.
    pub ffiles: u64,
}

impl FsStat {
    pub fn used_bytes(&self) -> u64 {
        self.tbytes.saturating_sub(self.fbytes)
    }

    pub fn used_files(&self) -> u64 {
        self.tfiles.saturating_sub(self.ffiles)
    }
}

/// Decoded `FSSTAT3res`. `stats` is present exactly when `status` is OK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStatReply {
    pub status: NfsStatus,
    pub stats: Option<FsStat>,
}

/// Encodes `FSSTAT3args`: the file system root handle.
pub fn encode_fsstat_args(handle: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(4 + FHSIZE3);
    buf.put_xdr_opaque(handle);
    buf
}

/// Decodes `FSSTAT3res`.
pub fn decode_fsstat_reply(results: &[u8]) -> Result<FsStatReply, RpcError> {
    let mut r = XdrReader::new(results);
    let status = NfsStatus(r.u32()?);

    // post_op_attr obj_attributes
    if r.bool()? {
        r.skip(FATTR3_SIZE)?;
    }

    if !status.is_ok() {
        return Ok(FsStatReply { status, stats: None });
    }

    let tbytes = r.u64()?;
    let fbytes = r.u64()?;
    let _abytes = r.u64()?;
    let tfiles = r.u64()?;
    let ffiles = r.u64()?;
    let _afiles = r.u64()?;
    let _invarsec = r.u32()?;

    Ok(FsStatReply {
        status,
        stats: Some(FsStat {
            tbytes,
            fbytes,
            tfiles,
            ffiles,
        }),
    })
}

/// NFSv3 connection to one server.
pub struct NfsConnection {
    client: RpcClient,
}

impl NfsConnection {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }
}

impl Connection for NfsConnection {
    fn fsstat(&mut self, handle: &[u8]) -> Result<FsStatReply, RpcError> {
        let args = encode_fsstat_args(handle);
        let results = self.client.call(NFSPROC3_FSSTAT, &args)?;
        decode_fsstat_reply(&results)
    }
}

/// Creates [`NfsConnection`]s with AUTH_SYS credentials of the running process.
pub struct NfsConnector {
    config: ConnectConfig,
}

impl NfsConnector {
    pub fn new(config: ConnectConfig) -> Self {
        Self { config }
    }
}

impl Connector for NfsConnector {
    fn connect(&self, host: &Host) -> Result<Box<dyn Connection>, RpcError> {
        let port = if self.config.port == 0 {
            portmap::get_port(host.ip, NFS_PROGRAM, NFS_V3, &self.config)?
        } else {
            self.config.port
        };
        let server = SocketAddr::new(host.ip, port);
        debug!("Creating NFS client for {} ({})", host.name, server);

        let client = RpcClient::connect(
            server,
            self.config.transport,
            self.config.source,
            NFS_PROGRAM,
            NFS_V3,
            Credential::Sys(AuthSys::from_process()),
            self.config.timeout,
        )?;
        Ok(Box::new(NfsConnection::new(client)))
    }
}
