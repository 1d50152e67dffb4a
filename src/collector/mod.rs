//! Stat-call adapter.
//!
//! Turns one `FSSTAT` exchange into a [`CallRecord`]: the classified outcome,
//! the wall-clock time the call started and its latency. Connections are
//! created through a [`Connector`] the first time a host is polled and kept
//! for the rest of the run.

#[cfg(test)]
pub(crate) mod mock;
mod traits;

pub use traits::{Connection, Connector};

use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::rpc::{FsStat, NfsStatus};
use crate::target::Host;

/// Classified result of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatOutcome {
    Success(FsStat),
    /// The server answered with a non-OK NFS status.
    ProtocolError(NfsStatus),
    /// No usable reply: connection failure, timeout, RPC-level rejection.
    TransportError(String),
}

impl StatOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StatOutcome::Success(_))
    }
}

/// One call as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub outcome: StatOutcome,
    /// Latency, measured with a monotonic clock.
    pub elapsed: Duration,
    /// Unix time in seconds, taken just before the call.
    pub timestamp: i64,
}

/// Turns one export into one classified, timed call.
pub struct StatCollector<C: Connector> {
    connector: C,
}

impl<C: Connector> StatCollector<C> {
    /// # Arguments
    /// * `connector` - Opens the per-host connections on first use
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Polls export `index` of `host` and updates its counters.
    ///
    /// A connection that cannot be created is a transport error for this
    /// call only; creation is retried on the next call to the same host.
    ///
    /// # Arguments
    /// * `host` - Owner of the export and of its connection
    /// * `index` - Position of the export within `host`
    ///
    /// # Returns
    /// The outcome with its latency and start time
    pub fn call(&self, host: &mut Host, index: usize) -> CallRecord {
        let mut connect_error = None;
        if !host.is_connected() {
            match self.connector.connect(host) {
                Ok(conn) => {
                    debug!("{}: client created", host.name);
                    *host.call_parts(index).0 = Some(conn);
                }
                Err(e) => connect_error = Some(format!("cannot create client: {}", e)),
            }
        }

        let name = host.name.clone();
        let (connection, export) = host.call_parts(index);

        let timestamp = chrono::Utc::now().timestamp();
        let start = Instant::now();
        let outcome = match connection.as_mut() {
            None => StatOutcome::TransportError(connect_error.unwrap_or_default()),
            Some(conn) => match conn.fsstat(&export.handle) {
                Ok(reply) => match reply.stats {
                    Some(stats) if reply.status.is_ok() => StatOutcome::Success(stats),
                    _ => StatOutcome::ProtocolError(reply.status),
                },
                Err(e) => StatOutcome::TransportError(e.to_string()),
            },
        };
        let elapsed = start.elapsed();

        export.record(outcome.is_success());
        match &outcome {
            StatOutcome::Success(_) => {}
            StatOutcome::ProtocolError(status) => {
                error!("{}:{} nfsproc3_fsstat_3: {}", name, export.path, status)
            }
            StatOutcome::TransportError(msg) => {
                error!("{}:{} nfsproc3_fsstat_3: {}", name, export.path, msg)
            }
        }

        CallRecord {
            outcome,
            elapsed,
            timestamp,
        }
    }
}
