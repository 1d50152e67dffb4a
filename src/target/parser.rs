//! Parsing of `host:path:hexhandle` export descriptors.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};

use crate::rpc::nfs::FHSIZE3;

/// One parsed input line, ready to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub host: String,
    pub ip: IpAddr,
    pub path: String,
    pub handle: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer than two `:` separators.
    MissingField,
    EmptyHost,
    EmptyPath,
    EmptyHandle,
    /// Handle is not valid hex or has an odd number of digits.
    BadHandle(String),
    /// Handle decodes to more than 64 bytes.
    HandleTooLong(usize),
    /// Host name has no IPv4 address.
    Unresolved(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingField => write!(f, "expected host:path:filehandle"),
            ParseError::EmptyHost => write!(f, "empty host"),
            ParseError::EmptyPath => write!(f, "empty path"),
            ParseError::EmptyHandle => write!(f, "empty file handle"),
            ParseError::BadHandle(h) => write!(f, "invalid file handle {:?}", h),
            ParseError::HandleTooLong(n) => {
                write!(f, "file handle of {} bytes exceeds {}", n, FHSIZE3)
            }
            ParseError::Unresolved(h) => write!(f, "cannot resolve {}", h),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parses one descriptor, resolving the host to its first IPv4 address.
///
/// The host ends at the first `:` and the handle starts after the last one,
/// so paths may contain `:` themselves.
pub fn parse_descriptor(line: &str) -> Result<Descriptor, ParseError> {
    let line = line.trim();
    let (host, rest) = line.split_once(':').ok_or(ParseError::MissingField)?;
    let (path, hex) = rest.rsplit_once(':').ok_or(ParseError::MissingField)?;

    if host.is_empty() {
        return Err(ParseError::EmptyHost);
    }
    if path.is_empty() {
        return Err(ParseError::EmptyPath);
    }
    let handle = decode_hex(hex)?;
    let ip = resolve(host)?;

    Ok(Descriptor {
        host: host.to_string(),
        ip,
        path: path.to_string(),
        handle,
    })
}

fn decode_hex(hex: &str) -> Result<Vec<u8>, ParseError> {
    if hex.is_empty() {
        return Err(ParseError::EmptyHandle);
    }
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return Err(ParseError::BadHandle(hex.to_string()));
    }
    if hex.len() / 2 > FHSIZE3 {
        return Err(ParseError::HandleTooLong(hex.len() / 2));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| ParseError::BadHandle(hex.to_string()))
        })
        .collect()
}

fn resolve(host: &str) -> Result<IpAddr, ParseError> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(IpAddr::V4(ip));
    }
    let addrs = (host, 0)
        .to_socket_addrs()
        .map_err(|_| ParseError::Unresolved(host.to_string()))?;
    addrs
        .map(|a| a.ip())
        .find(IpAddr::is_ipv4)
        .ok_or_else(|| ParseError::Unresolved(host.to_string()))
}

/// Reverses the labels of a host name for metric names:
/// `server.example.com` becomes `com.example.server`. An IPv4 literal keeps
/// its order and has its dots replaced with `_`.
pub fn reverse_name(name: &str) -> String {
    if name.parse::<Ipv4Addr>().is_ok() {
        return name.replace('.', "_");
    }
    name.rsplit('.').collect::<Vec<_>>().join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ip_literal() {
        let d = parse_descriptor("10.0.0.1:/export/vol1:01ab02cd\n").unwrap();
        assert_eq!(d.host, "10.0.0.1");
        assert_eq!(d.ip, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(d.path, "/export/vol1");
        assert_eq!(d.handle, vec![0x01, 0xab, 0x02, 0xcd]);
    }

    #[test]
    fn test_path_with_colon() {
        let d = parse_descriptor("10.0.0.1:/a:b:ff").unwrap();
        assert_eq!(d.path, "/a:b");
        assert_eq!(d.handle, vec![0xff]);
    }

    #[test]
    fn test_malformed_lines() {
        assert_eq!(parse_descriptor("10.0.0.1"), Err(ParseError::MissingField));
        assert_eq!(parse_descriptor("10.0.0.1:/x"), Err(ParseError::MissingField));
        assert_eq!(parse_descriptor(":/x:ff"), Err(ParseError::EmptyHost));
        assert_eq!(parse_descriptor("10.0.0.1::ff"), Err(ParseError::EmptyPath));
        assert_eq!(parse_descriptor("10.0.0.1:/x:"), Err(ParseError::EmptyHandle));
        assert!(matches!(
            parse_descriptor("10.0.0.1:/x:abc"),
            Err(ParseError::BadHandle(_))
        ));
        assert!(matches!(
            parse_descriptor("10.0.0.1:/x:zz"),
            Err(ParseError::BadHandle(_))
        ));
    }

    #[test]
    fn test_handle_size_limit() {
        let max = "ab".repeat(FHSIZE3);
        assert_eq!(
            parse_descriptor(&format!("10.0.0.1:/x:{}", max)).unwrap().handle.len(),
            FHSIZE3
        );
        let over = "ab".repeat(FHSIZE3 + 1);
        assert_eq!(
            parse_descriptor(&format!("10.0.0.1:/x:{}", over)),
            Err(ParseError::HandleTooLong(FHSIZE3 + 1))
        );
    }

    #[test]
    fn test_reverse_name() {
        assert_eq!(reverse_name("server.example.com"), "com.example.server");
        assert_eq!(reverse_name("serverA"), "serverA");
        assert_eq!(reverse_name("192.168.1.20"), "192_168_1_20");
    }
}
