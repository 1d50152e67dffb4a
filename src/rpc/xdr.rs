//! XDR (RFC 4506) encoding helpers.
//!
//! Everything on the wire is big-endian and padded to a multiple of four bytes.
//! Decoding never panics: running out of input is reported as
//! [`RpcError::Garbage`].

use bytes::{Buf, BufMut, BytesMut};

use super::RpcError;

/// Appends XDR primitives to a buffer.
pub trait XdrEncode {
    fn put_xdr_u32(&mut self, v: u32);
    fn put_xdr_u64(&mut self, v: u64);
    fn put_xdr_bool(&mut self, v: bool);
    /// Variable-length opaque data: length, bytes, zero padding.
    fn put_xdr_opaque(&mut self, data: &[u8]);
    fn put_xdr_string(&mut self, s: &str);
}

impl XdrEncode for BytesMut {
    fn put_xdr_u32(&mut self, v: u32) {
        self.put_u32(v);
    }

    fn put_xdr_u64(&mut self, v: u64) {
        self.put_u64(v);
    }

    fn put_xdr_bool(&mut self, v: bool) {
        self.put_u32(u32::from(v));
    }

    fn put_xdr_opaque(&mut self, data: &[u8]) {
        self.put_u32(data.len() as u32);
        self.put_slice(data);
        self.put_bytes(0, padding(data.len()));
    }

    fn put_xdr_string(&mut self, s: &str) {
        self.put_xdr_opaque(s.as_bytes());
    }
}

/// Number of zero bytes needed after `len` bytes to reach a 4-byte boundary.
pub fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Reads XDR primitives from a byte slice.
pub struct XdrReader<'a> {
    buf: &'a [u8],
}

impl<'a> XdrReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// The unread part of the input.
    pub fn rest(&self) -> &'a [u8] {
        self.buf
    }

    fn need(&self, n: usize, what: &str) -> Result<(), RpcError> {
        if self.buf.remaining() < n {
            return Err(RpcError::Garbage(format!(
                "truncated reply reading {} ({} of {} bytes)",
                what,
                self.buf.remaining(),
                n
            )));
        }
        Ok(())
    }

    pub fn u32(&mut self) -> Result<u32, RpcError> {
        self.need(4, "u32")?;
        Ok(self.buf.get_u32())
    }

    pub fn u64(&mut self) -> Result<u64, RpcError> {
        self.need(8, "u64")?;
        Ok(self.buf.get_u64())
    }

    pub fn bool(&mut self) -> Result<bool, RpcError> {
        match self.u32()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(RpcError::Garbage(format!("invalid XDR bool {}", other))),
        }
    }

    /// Variable-length opaque data, returned without the padding.
    pub fn opaque(&mut self) -> Result<&'a [u8], RpcError> {
        let len = self.u32()? as usize;
        let padded = len + padding(len);
        self.need(padded, "opaque")?;
        let buf: &'a [u8] = self.buf;
        let (data, rest) = buf.split_at(len);
        self.buf = &rest[padding(len)..];
        Ok(data)
    }

    /// Skips `n` bytes of fixed-size data.
    pub fn skip(&mut self, n: usize) -> Result<(), RpcError> {
        self.need(n, "fixed data")?;
        self.buf.advance(n);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_is_padded() {
        let mut buf = BytesMut::new();
        buf.put_xdr_opaque(&[1, 2, 3, 4, 5]);
        assert_eq!(&buf[..], &[0, 0, 0, 5, 1, 2, 3, 4, 5, 0, 0, 0]);

        let mut reader = XdrReader::new(&buf);
        assert_eq!(reader.opaque().unwrap(), &[1, 2, 3, 4, 5]);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_padding() {
        assert_eq!(padding(0), 0);
        assert_eq!(padding(1), 3);
        assert_eq!(padding(4), 0);
        assert_eq!(padding(7), 1);
    }

    #[test]
    fn test_truncated_input_is_garbage() {
        let mut reader = XdrReader::new(&[0, 0, 1]);
        assert!(matches!(reader.u32(), Err(RpcError::Garbage(_))));

        let mut reader = XdrReader::new(&[0, 0, 0, 8, 1, 2]);
        assert!(matches!(reader.opaque(), Err(RpcError::Garbage(_))));
    }

    #[test]
    fn test_bool_rejects_other_values() {
        let mut reader = XdrReader::new(&[0, 0, 0, 2]);
        assert!(reader.bool().is_err());
    }

    #[test]
    fn test_u64_big_endian() {
        let mut buf = BytesMut::new();
        buf.put_xdr_u64(0x0102_0304_0506_0708);
        assert_eq!(&buf[..], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(XdrReader::new(&buf).u64().unwrap(), 0x0102_0304_0506_0708);
    }
}
