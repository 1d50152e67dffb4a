//! RPC credentials: AUTH_NONE and AUTH_SYS.

use bytes::BytesMut;

use super::xdr::XdrEncode;

const AUTH_NONE: u32 = 0;
const AUTH_SYS: u32 = 1;

/// AUTH_SYS allows at most 16 supplementary groups and a 255 byte machine name.
const MAX_GROUPS: usize = 16;
const MAX_MACHINE_NAME: usize = 255;

/// Credentials attached to every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    None,
    Sys(AuthSys),
}

/// Unix-style credentials (RFC 5531 appendix A).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSys {
    pub stamp: u32,
    pub machine_name: String,
    pub uid: u32,
    pub gid: u32,
    pub gids: Vec<u32>,
}

impl AuthSys {
    /// Credentials of the current process, like `authunix_create_default()`.
    pub fn from_process() -> Self {
        // SAFETY: getuid/getgid never fail and have no preconditions.
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };

        Self {
            stamp: chrono::Utc::now().timestamp() as u32,
            machine_name: hostname(),
            uid,
            gid,
            gids: groups(),
        }
    }

    fn encode_body(&self) -> BytesMut {
        let mut body = BytesMut::with_capacity(64);
        body.put_xdr_u32(self.stamp);
        let name = truncate_at_char_boundary(&self.machine_name, MAX_MACHINE_NAME);
        body.put_xdr_string(name);
        body.put_xdr_u32(self.uid);
        body.put_xdr_u32(self.gid);
        let gids = &self.gids[..self.gids.len().min(MAX_GROUPS)];
        body.put_xdr_u32(gids.len() as u32);
        for gid in gids {
            body.put_xdr_u32(*gid);
        }
        body
    }
}

impl Credential {
    /// Appends the credential followed by an AUTH_NONE verifier.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Credential::None => {
                buf.put_xdr_u32(AUTH_NONE);
                buf.put_xdr_opaque(&[]);
            }
            Credential::Sys(sys) => {
                buf.put_xdr_u32(AUTH_SYS);
                buf.put_xdr_opaque(&sys.encode_body());
            }
        }
        buf.put_xdr_u32(AUTH_NONE);
        buf.put_xdr_opaque(&[]);
    }
}

fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn hostname() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for writes of buf.len() bytes.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return String::from("localhost");
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

fn groups() -> Vec<u32> {
    let mut gids: [libc::gid_t; MAX_GROUPS] = [0; MAX_GROUPS];
    // SAFETY: gids has room for MAX_GROUPS entries. When the process has more
    // groups the call fails with EINVAL and we send none.
    let n = unsafe { libc::getgroups(MAX_GROUPS as libc::c_int, gids.as_mut_ptr()) };
    if n < 0 {
        return Vec::new();
    }
    gids[..n as usize].to_vec()
}
