//! Portmapper (rpcbind v2) `GETPORT` lookup.

use std::net::{IpAddr, SocketAddr};

use bytes::BytesMut;
use tracing::debug;

use super::auth::Credential;
use super::xdr::{XdrEncode, XdrReader};
use super::{RpcClient, RpcError};
use crate::config::ConnectConfig;

pub const PMAP_PORT: u16 = 111;
const PMAP_PROGRAM: u32 = 100000;
const PMAP_VERSION: u32 = 2;
const PMAPPROC_GETPORT: u32 = 3;

/// Encodes the `mapping` argument of `GETPORT`.
pub fn encode_getport(program: u32, version: u32, protocol: u32) -> BytesMut {
    let mut buf = BytesMut::with_capacity(16);
    buf.put_xdr_u32(program);
    buf.put_xdr_u32(version);
    buf.put_xdr_u32(protocol);
    buf.put_xdr_u32(0);
    buf
}

/// Decodes the `GETPORT` result. Port zero means "not registered".
pub fn decode_getport(results: &[u8], program: u32, version: u32) -> Result<u16, RpcError> {
    let port = XdrReader::new(results).u32()?;
    match port {
        0 => Err(RpcError::Unregistered { program, version }),
        p if p > u32::from(u16::MAX) => {
            Err(RpcError::Garbage(format!("portmapper returned port {}", p)))
        }
        p => Ok(p as u16),
    }
}

/// Asks the portmapper on `host` which port `program`/`version` listens on,
/// using the configured transport.
pub fn get_port(
    host: IpAddr,
    program: u32,
    version: u32,
    config: &ConnectConfig,
) -> Result<u16, RpcError> {
    let mut client = RpcClient::connect(
        SocketAddr::new(host, PMAP_PORT),
        config.transport,
        config.source,
        PMAP_PROGRAM,
        PMAP_VERSION,
        Credential::None,
        config.timeout,
    )?;
    let args = encode_getport(program, version, config.transport.protocol_number());
    let results = client.call(PMAPPROC_GETPORT, &args)?;
    let port = decode_getport(&results, program, version)?;
    debug!("Portmapper on {}: program {} v{} is on port {}", host, program, version, port);
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_getport() {
        let buf = encode_getport(100003, 3, 17);
        let mut r = XdrReader::new(&buf);
        assert_eq!(r.u32().unwrap(), 100003);
        assert_eq!(r.u32().unwrap(), 3);
        assert_eq!(r.u32().unwrap(), 17);
        assert_eq!(r.u32().unwrap(), 0);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_decode_getport() {
        assert_eq!(decode_getport(&[0, 0, 8, 1], 100003, 3).unwrap(), 2049);
        assert!(matches!(
            decode_getport(&[0, 0, 0, 0], 100003, 3),
            Err(RpcError::Unregistered { program: 100003, version: 3 })
        ));
        assert!(matches!(
            decode_getport(&[0, 1, 0, 0], 100003, 3),
            Err(RpcError::Garbage(_))
        ));
    }
}
