//! Scripted connector for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::traits::{Connection, Connector};
use crate::rpc::{FsStat, FsStatReply, NfsStatus, RpcError};
use crate::target::Host;

/// What the next `FSSTAT` call returns.
#[derive(Debug, Clone, Copy)]
pub enum MockReply {
    Stat(FsStat),
    Status(u32),
    Timeout,
}

#[derive(Debug, Default)]
struct State {
    replies: VecDeque<MockReply>,
    fallback: Option<MockReply>,
    failing_connects: usize,
    connects: usize,
    calls: Vec<Vec<u8>>,
}

/// Hands out connections that share one reply script.
///
/// Replies are consumed in call order across all hosts. When the script is
/// empty the fallback reply is used, or a timeout if there is none.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<State>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call succeeds with `stat`.
    pub fn always(stat: FsStat) -> Self {
        Self::new().with_fallback(MockReply::Stat(stat))
    }

    pub fn with_reply(self, reply: MockReply) -> Self {
        self.state.lock().unwrap().replies.push_back(reply);
        self
    }

    pub fn with_fallback(self, reply: MockReply) -> Self {
        self.state.lock().unwrap().fallback = Some(reply);
        self
    }

    /// The next `n` connection attempts fail.
    pub fn with_failing_connects(self, n: usize) -> Self {
        self.state.lock().unwrap().failing_connects = n;
        self
    }

    /// Successful connection creations so far.
    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    /// Handles passed to `fsstat`, in call order.
    pub fn calls(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl Connector for MockConnector {
    fn connect(&self, _host: &Host) -> Result<Box<dyn Connection>, RpcError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(RpcError::Io(std::io::ErrorKind::ConnectionRefused.into()));
        }
        state.connects += 1;
        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockConnection {
    state: Arc<Mutex<State>>,
}

impl Connection for MockConnection {
    fn fsstat(&mut self, handle: &[u8]) -> Result<FsStatReply, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(handle.to_vec());
        let reply = state
            .replies
            .pop_front()
            .or(state.fallback)
            .unwrap_or(MockReply::Timeout);
        match reply {
            MockReply::Stat(stat) => Ok(FsStatReply {
                status: NfsStatus::OK,
                stats: Some(stat),
            }),
            MockReply::Status(code) => Ok(FsStatReply {
                status: NfsStatus(code),
                stats: None,
            }),
            MockReply::Timeout => Err(RpcError::Timeout),
        }
    }
}
