//! Blocking RPC client over UDP or TCP.

use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream, UdpSocket};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, trace};

use super::RpcError;
use super::auth::Credential;
use super::message::{CallHeader, decode_reply, encode_call, reply_xid};
use crate::config::Transport;

/// Largest reply accepted from the server, either as a datagram or as a TCP record.
const MAX_REPLY: usize = 64 * 1024;

/// TCP record marking: high bit set on the last fragment.
const LAST_FRAGMENT: u32 = 0x8000_0000;

enum Channel {
    Udp(UdpSocket),
    Tcp(TcpChannel),
}

/// A TCP stream plus the reply record it is in the middle of reading.
///
/// A call that times out part way through a record leaves the rest of it in
/// the stream. The read position is kept here so the next call finishes that
/// record, sees the stale xid and drops it, instead of losing track of the
/// record boundaries.
struct TcpChannel {
    stream: TcpStream,
    reader: RecordReader,
}

#[derive(Debug)]
struct RecordReader {
    marker: [u8; 4],
    /// Bytes of `marker` read so far.
    marker_len: usize,
    /// Inside a fragment whose marker has been read.
    in_fragment: bool,
    /// Bytes of the current fragment not read yet.
    fragment_left: usize,
    /// The current fragment ends its record.
    last: bool,
    /// Fragments of the current record read so far.
    record: Vec<u8>,
}

/// A connected client for one RPC program/version on one server.
pub struct RpcClient {
    channel: Channel,
    server: SocketAddr,
    program: u32,
    version: u32,
    credential: Credential,
    timeout: Duration,
    next_xid: u32,
}

impl RpcClient {
    /// Opens a socket to `server`, optionally bound to `source`, and connects it.
    pub fn connect(
        server: SocketAddr,
        transport: Transport,
        source: Option<Ipv4Addr>,
        program: u32,
        version: u32,
        credential: Credential,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let (ty, proto) = match transport {
            Transport::Udp => (Type::DGRAM, Protocol::UDP),
            Transport::Tcp => (Type::STREAM, Protocol::TCP),
        };
        let socket = Socket::new(Domain::for_address(server), ty, Some(proto))?;
        if let Some(src) = source {
            socket.bind(&SockAddr::from(SocketAddrV4::new(src, 0)))?;
        }

        let server_addr = SockAddr::from(server);
        let channel = match transport {
            Transport::Udp => {
                socket.connect(&server_addr)?;
                Channel::Udp(socket.into())
            }
            Transport::Tcp => {
                socket.connect_timeout(&server_addr, timeout)?;
                let stream: TcpStream = socket.into();
                stream.set_nodelay(true)?;
                Channel::Tcp(TcpChannel {
                    stream,
                    reader: RecordReader::default(),
                })
            }
        };
        debug!("Connected to {} over {} (program {} v{})", server, transport, program, version);

        Ok(Self {
            channel,
            server,
            program,
            version,
            credential,
            timeout,
            // seed from the clock so restarts don't reuse xids the server may have cached
            next_xid: chrono::Utc::now().timestamp_subsec_nanos(),
        })
    }

    /// Server address this client is connected to.
    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Sends one call and waits for the matching reply.
    ///
    /// `args` must already be XDR encoded. Returns the procedure results that
    /// follow the reply header.
    pub fn call(&mut self, procedure: u32, args: &[u8]) -> Result<Vec<u8>, RpcError> {
        let xid = self.next_xid;
        self.next_xid = self.next_xid.wrapping_add(1);

        let header = CallHeader {
            xid,
            program: self.program,
            version: self.version,
            procedure,
        };
        let message = encode_call(&header, &self.credential, args);
        trace!("xid {:#x}: calling {} proc {}", xid, self.server, procedure);

        let reply = match &mut self.channel {
            Channel::Udp(socket) => udp_exchange(socket, &message, xid, self.timeout)?,
            Channel::Tcp(channel) => channel.exchange(&message, xid, self.timeout)?,
        };

        decode_reply(&reply, xid).map(|results| results.to_vec())
    }
}

fn udp_exchange(
    socket: &UdpSocket,
    message: &[u8],
    xid: u32,
    timeout: Duration,
) -> Result<Vec<u8>, RpcError> {
    socket.send(message)?;

    let deadline = Instant::now() + timeout;
    let mut buf = vec![0u8; MAX_REPLY];
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return Err(RpcError::Timeout);
        }
        socket.set_read_timeout(Some(left))?;
        let n = socket.recv(&mut buf)?;
        // late replies to earlier calls that timed out
        if reply_xid(&buf[..n]) != Some(xid) {
            trace!("discarding datagram with stale xid");
            continue;
        }
        buf.truncate(n);
        return Ok(buf);
    }
}

impl TcpChannel {
    /// Sends `message` as one record and waits for the record answering `xid`.
    ///
    /// Records with other xids are replies to earlier calls that timed out
    /// and are skipped.
    fn exchange(
        &mut self,
        message: &[u8],
        xid: u32,
        timeout: Duration,
    ) -> Result<Vec<u8>, RpcError> {
        let deadline = Instant::now() + timeout;
        self.stream.set_write_timeout(Some(timeout))?;

        let mut record = BytesMut::with_capacity(message.len() + 4);
        record.extend_from_slice(&(LAST_FRAGMENT | message.len() as u32).to_be_bytes());
        record.extend_from_slice(message);
        self.stream.write_all(&record)?;

        loop {
            let reply = self.reader.read_record(&mut self.stream, deadline)?;
            if reply_xid(&reply) != Some(xid) {
                trace!("discarding record with stale xid");
                continue;
            }
            return Ok(reply);
        }
    }
}

impl Default for RecordReader {
    fn default() -> Self {
        Self {
            marker: [0; 4],
            marker_len: 0,
            in_fragment: false,
            fragment_left: 0,
            last: false,
            record: Vec::new(),
        }
    }
}

impl RecordReader {
    /// Reads up to the end of the next complete record.
    ///
    /// On a timeout everything read so far is kept, and the next call carries
    /// on from the same position.
    fn read_record(
        &mut self,
        stream: &mut TcpStream,
        deadline: Instant,
    ) -> Result<Vec<u8>, RpcError> {
        loop {
            if !self.in_fragment {
                while self.marker_len < self.marker.len() {
                    let n = read_before(stream, &mut self.marker[self.marker_len..], deadline)?;
                    self.marker_len += n;
                }
                let marker = u32::from_be_bytes(self.marker);
                self.marker_len = 0;
                self.in_fragment = true;
                self.fragment_left = (marker & !LAST_FRAGMENT) as usize;
                self.last = marker & LAST_FRAGMENT != 0;

                let size = self.record.len() + self.fragment_left;
                if size > MAX_REPLY {
                    *self = Self::default();
                    return Err(RpcError::Garbage(format!("record of {} bytes too large", size)));
                }
            }

            while self.fragment_left > 0 {
                let start = self.record.len();
                self.record.resize(start + self.fragment_left, 0);
                match read_before(stream, &mut self.record[start..], deadline) {
                    Ok(n) => {
                        self.record.truncate(start + n);
                        self.fragment_left -= n;
                    }
                    Err(e) => {
                        self.record.truncate(start);
                        return Err(e);
                    }
                }
            }

            self.in_fragment = false;
            if self.last {
                return Ok(std::mem::take(&mut self.record));
            }
        }
    }
}

/// One `read` that gives up at `deadline`. End of stream is an error.
fn read_before(
    stream: &mut TcpStream,
    buf: &mut [u8],
    deadline: Instant,
) -> Result<usize, RpcError> {
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return Err(RpcError::Timeout);
        }
        stream.set_read_timeout(Some(left))?;
        match stream.read(buf) {
            Ok(0) => return Err(RpcError::Io(io::ErrorKind::UnexpectedEof.into())),
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
