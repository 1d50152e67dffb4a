//! Run configuration.
//!
//! Built once by the binary from command-line flags and passed by reference to
//! the scheduler, the formatters and the connector. Nothing here changes after
//! startup.

use std::net::Ipv4Addr;
use std::time::Duration;

use crate::fmt::Prefix;

/// Standard NFS server port.
pub const NFS_PORT: u16 = 2049;

/// Default polling frequency in Hz.
pub const DEFAULT_HERTZ: u64 = 1;

/// Default RPC timeout (2.5 seconds).
pub const RPC_TIMEOUT: Duration = Duration::from_millis(2500);

/// Default prefix for Graphite metric names.
pub const DEFAULT_METRIC_PREFIX: &str = "nfs";

/// Error for invalid or conflicting startup options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Two options that can't be combined were both given.
    Conflict(&'static str, &'static str),
    /// An option value is out of range or unparsable.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Conflict(a, b) => write!(f, "can't specify both {} and {}", a, b),
            ConfigError::Invalid(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// How results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Aligned df-style table with a repeating header.
    #[default]
    Table,
    /// One Graphite plaintext line per metric.
    Graphite,
}

/// When the scheduler stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// A single round.
    #[default]
    Once,
    /// Until the first export of the first host has been polled this many times.
    Count(u64),
    /// Until interrupted.
    Loop,
}

impl RunMode {
    /// Builds the run mode from the `-c` and `-l` flags.
    pub fn from_flags(count: Option<u64>, looping: bool) -> Result<Self, ConfigError> {
        match (count, looping) {
            (Some(_), true) => Err(ConfigError::Conflict("-c", "-l")),
            (Some(0), false) => Err(ConfigError::Invalid(
                "zero count, nothing to do".to_string(),
            )),
            (Some(n), false) => Ok(RunMode::Count(n)),
            (None, true) => Ok(RunMode::Loop),
            (None, false) => Ok(RunMode::Once),
        }
    }
}

/// RPC transport protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Udp,
    Tcp,
}

impl Transport {
    /// IP protocol number, as used in portmapper requests.
    pub fn protocol_number(self) -> u32 {
        match self {
            Transport::Udp => 17,
            Transport::Tcp => 6,
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Udp => f.write_str("udp"),
            Transport::Tcp => f.write_str("tcp"),
        }
    }
}

/// Settings for creating per-host RPC connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectConfig {
    /// NFS port. Zero means ask the portmapper.
    pub port: u16,
    pub transport: Transport,
    /// Local address to bind before connecting.
    pub source: Option<Ipv4Addr>,
    pub timeout: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            port: NFS_PORT,
            transport: Transport::Udp,
            source: None,
            timeout: RPC_TIMEOUT,
        }
    }
}

/// Polling and display settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Target rounds per second.
    pub hertz: u64,
    pub prefix: Prefix,
    pub output: OutputMode,
    pub run: RunMode,
    /// Table shows the inode-only layout.
    pub inodes: bool,
    /// Table shows host IP addresses instead of names.
    pub display_ips: bool,
    /// Print the table header only once.
    pub one_header: bool,
    /// Prefix of every Graphite metric name.
    pub metric_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hertz: DEFAULT_HERTZ,
            prefix: Prefix::Human,
            output: OutputMode::Table,
            run: RunMode::Once,
            inodes: false,
            display_ips: false,
            one_header: false,
            metric_prefix: DEFAULT_METRIC_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Time between the starts of consecutive rounds.
    ///
    /// Frequencies of 1 Hz or less all map to one second.
    pub fn period(&self) -> Duration {
        if self.hertz > 1 {
            Duration::from_nanos(1_000_000_000 / self.hertz)
        } else {
            Duration::from_secs(1)
        }
    }
}

/// Parses the `-S` source address.
pub fn parse_source_address(s: &str) -> Result<Ipv4Addr, ConfigError> {
    s.trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| ConfigError::Invalid(format!("invalid source IP address '{}'", s)))
}
