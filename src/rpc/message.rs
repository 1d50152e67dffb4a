//! RPC call and reply headers.

use bytes::BytesMut;

use super::RpcError;
use super::auth::Credential;
use super::xdr::{XdrEncode, XdrReader};

const RPC_VERSION: u32 = 2;

const MSG_CALL: u32 = 0;
const MSG_REPLY: u32 = 1;

const MSG_ACCEPTED: u32 = 0;
const MSG_DENIED: u32 = 1;

/// Header of an outgoing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallHeader {
    pub xid: u32,
    pub program: u32,
    pub version: u32,
    pub procedure: u32,
}

/// Encodes a complete call message: header, credentials, then `args` as-is.
pub fn encode_call(header: &CallHeader, cred: &Credential, args: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(128 + args.len());
    buf.put_xdr_u32(header.xid);
    buf.put_xdr_u32(MSG_CALL);
    buf.put_xdr_u32(RPC_VERSION);
    buf.put_xdr_u32(header.program);
    buf.put_xdr_u32(header.version);
    buf.put_xdr_u32(header.procedure);
    cred.encode(&mut buf);
    buf.extend_from_slice(args);
    buf
}

/// Returns the transaction id of a reply without decoding the rest.
pub fn reply_xid(reply: &[u8]) -> Option<u32> {
    XdrReader::new(reply).u32().ok()
}

/// Decodes a reply header and returns the procedure results that follow it.
///
/// Anything other than an accepted, successful reply to `xid` is an error.
pub fn decode_reply(reply: &[u8], xid: u32) -> Result<&[u8], RpcError> {
    let mut r = XdrReader::new(reply);

    let got_xid = r.u32()?;
    if got_xid != xid {
        return Err(RpcError::Garbage(format!(
            "reply xid {:#x} does not match call {:#x}",
            got_xid, xid
        )));
    }
    let msg_type = r.u32()?;
    if msg_type != MSG_REPLY {
        return Err(RpcError::Garbage(format!("message type {} is not a reply", msg_type)));
    }

    match r.u32()? {
        MSG_ACCEPTED => {
            // verifier: flavor + opaque body
            r.u32()?;
            r.opaque()?;
            match r.u32()? {
                0 => Ok(r.rest()),
                1 => Err(RpcError::NotAccepted("Program unavailable".to_string())),
                2 => {
                    let low = r.u32()?;
                    let high = r.u32()?;
                    Err(RpcError::NotAccepted(format!(
                        "Program/version mismatch; low version = {}, high version = {}",
                        low, high
                    )))
                }
                3 => Err(RpcError::NotAccepted("Procedure unavailable".to_string())),
                4 => Err(RpcError::NotAccepted("Server can't decode arguments".to_string())),
                5 => Err(RpcError::NotAccepted("Remote system error".to_string())),
                other => Err(RpcError::Garbage(format!("unknown accept status {}", other))),
            }
        }
        MSG_DENIED => match r.u32()? {
            0 => {
                let low = r.u32()?;
                let high = r.u32()?;
                Err(RpcError::Denied(format!(
                    "RPC version mismatch; low version = {}, high version = {}",
                    low, high
                )))
            }
            1 => Err(RpcError::Denied(auth_error_name(r.u32()?).to_string())),
            other => Err(RpcError::Garbage(format!("unknown reject status {}", other))),
        },
        other => Err(RpcError::Garbage(format!("unknown reply status {}", other))),
    }
}

fn auth_error_name(stat: u32) -> &'static str {
    match stat {
        1 => "Authentication error; bad credentials",
        2 => "Authentication error; rejected credentials",
        3 => "Authentication error; bad verifier",
        4 => "Authentication error; rejected verifier",
        5 => "Authentication error; client credential too weak",
        6 => "Authentication error; invalid server verifier",
        7 => "Authentication error; server failed",
        _ => "Authentication error",
    }
}
