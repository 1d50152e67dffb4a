//! Poll targets: hosts and the exports polled on each of them.
//!
//! The registry is filled once from standard input before polling starts.
//! After that only the per-export counters and the lazily created host
//! connections change.

mod parser;

pub use parser::{Descriptor, ParseError, parse_descriptor, reverse_name};

use std::fmt;
use std::net::IpAddr;

use crate::collector::Connection;

/// One exported filesystem root on a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPoint {
    pub path: String,
    /// Server-assigned root file handle. Opaque to this crate.
    pub handle: Vec<u8>,
    sent: u64,
    received: u64,
}

impl ExportPoint {
    pub fn new(path: impl Into<String>, handle: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            handle,
            sent: 0,
            received: 0,
        }
    }

    /// Calls issued for this export.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Successful replies. Never exceeds [`sent`](Self::sent).
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Counts a call. `ok` also counts it as received.
    pub(crate) fn record(&mut self, ok: bool) {
        self.sent += 1;
        if ok {
            self.received += 1;
        }
    }
}

/// An NFS server and its exports.
pub struct Host {
    /// Name as given in the input.
    pub name: String,
    /// Name with its labels reversed, for metric names.
    pub ndqf: String,
    pub ip: IpAddr,
    /// `ip` as displayed in the table.
    pub ip_address: String,
    exports: Vec<ExportPoint>,
    connection: Option<Box<dyn Connection>>,
}

impl Host {
    pub fn new(name: impl Into<String>, ip: IpAddr) -> Self {
        let name = name.into();
        Self {
            ndqf: reverse_name(&name),
            ip_address: ip.to_string(),
            name,
            ip,
            exports: Vec::new(),
            connection: None,
        }
    }

    /// Exports in registration order.
    pub fn exports(&self) -> &[ExportPoint] {
        &self.exports
    }

    /// Name or IP address, whichever the table displays.
    pub fn display_name(&self, display_ips: bool) -> &str {
        if display_ips { &self.ip_address } else { &self.name }
    }

    /// Whether a connection has been created for this host.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Splits the host into the pieces a stat call needs at the same time.
    pub(crate) fn call_parts(
        &mut self,
        index: usize,
    ) -> (&mut Option<Box<dyn Connection>>, &mut ExportPoint) {
        (&mut self.connection, &mut self.exports[index])
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("name", &self.name)
            .field("ndqf", &self.ndqf)
            .field("ip", &self.ip)
            .field("exports", &self.exports)
            .field("connected", &self.connection.is_some())
            .finish()
    }
}

/// Widths of the `host:path` column, fixed before the first round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnWidths {
    pub host: usize,
    pub path: usize,
}

impl ColumnWidths {
    /// Width of the whole `host:path` field.
    pub fn filesystem(&self) -> usize {
        self.host + 1 + self.path
    }
}

/// All hosts in input order.
#[derive(Debug, Default)]
pub struct Registry {
    hosts: Vec<Host>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an export, appending to an existing host of the same name or
    /// creating a new host at the end.
    pub fn register(&mut self, descriptor: Descriptor) {
        let export = ExportPoint::new(descriptor.path, descriptor.handle);
        match self.hosts.iter_mut().find(|h| h.name == descriptor.host) {
            Some(host) => host.exports.push(export),
            None => {
                let mut host = Host::new(descriptor.host, descriptor.ip);
                host.exports.push(export);
                self.hosts.push(host);
            }
        }
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub(crate) fn hosts_mut(&mut self) -> std::slice::IterMut<'_, Host> {
        self.hosts.iter_mut()
    }

    /// Every (host, export) pair in registration order. Can be restarted any
    /// number of times.
    pub fn iter(&self) -> impl Iterator<Item = (&Host, &ExportPoint)> {
        self.hosts
            .iter()
            .flat_map(|host| host.exports.iter().map(move |export| (host, export)))
    }

    /// Number of exports across all hosts.
    pub fn len(&self) -> usize {
        self.hosts.iter().map(|h| h.exports.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First export of the first host.
    pub fn first_export(&self) -> Option<&ExportPoint> {
        self.hosts.first().and_then(|h| h.exports.first())
    }

    /// Longest host name, or IP address when `display_ips` is set.
    pub fn max_name_width(&self, display_ips: bool) -> usize {
        self.hosts
            .iter()
            .map(|h| h.display_name(display_ips).len())
            .max()
            .unwrap_or(0)
    }

    /// Longest export path.
    pub fn max_path_width(&self) -> usize {
        self.iter().map(|(_, e)| e.path.len()).max().unwrap_or(0)
    }

    pub fn column_widths(&self, display_ips: bool) -> ColumnWidths {
        ColumnWidths {
            host: self.max_name_width(display_ips),
            path: self.max_path_width(),
        }
    }

    /// Calls sent and replies received, summed over all exports.
    pub fn totals(&self) -> (u64, u64) {
        self.iter()
            .fold((0, 0), |(s, r), (_, e)| (s + e.sent, r + e.received))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn desc(host: &str, ip: [u8; 4], path: &str) -> Descriptor {
        Descriptor {
            host: host.to_string(),
            ip: Ipv4Addr::from(ip).into(),
            path: path.to_string(),
            handle: vec![1, 2, 3, 4],
        }
    }

    #[test]
    fn test_register_groups_by_host_in_order() {
        let mut registry = Registry::new();
        registry.register(desc("serverA", [10, 0, 0, 1], "/export/vol1"));
        registry.register(desc("serverB", [10, 0, 0, 2], "/data"));
        registry.register(desc("serverA", [10, 0, 0, 1], "/export/vol2"));

        assert_eq!(registry.hosts().len(), 2);
        assert_eq!(registry.len(), 3);

        let pairs: Vec<(&str, &str)> = registry
            .iter()
            .map(|(h, e)| (h.name.as_str(), e.path.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("serverA", "/export/vol1"),
                ("serverA", "/export/vol2"),
                ("serverB", "/data"),
            ]
        );

        // restartable
        assert_eq!(registry.iter().count(), 3);
        assert_eq!(registry.first_export().unwrap().path, "/export/vol1");
    }

    #[test]
    fn test_widths_by_name_or_ip() {
        let mut registry = Registry::new();
        registry.register(desc("a", [192, 168, 100, 200], "/x"));
        registry.register(desc("longer-name", [10, 0, 0, 1], "/export/home"));

        assert_eq!(registry.max_name_width(false), 11);
        assert_eq!(registry.max_name_width(true), 15);
        assert_eq!(registry.max_path_width(), 12);
        assert_eq!(registry.column_widths(false).filesystem(), 11 + 1 + 12);
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.first_export().is_none());
        assert_eq!(registry.column_widths(true), ColumnWidths::default());
        assert_eq!(registry.totals(), (0, 0));
    }

    #[test]
    fn test_export_counters() {
        let mut export = ExportPoint::new("/x", vec![]);
        export.record(true);
        export.record(false);
        export.record(true);
        assert_eq!(export.sent(), 3);
        assert_eq!(export.received(), 2);
    }

    #[test]
    fn test_host_names() {
        let host = Host::new("nfs1.example.com", Ipv4Addr::new(10, 1, 2, 3).into());
        assert_eq!(host.ndqf, "com.example.nfs1");
        assert_eq!(host.display_name(false), "nfs1.example.com");
        assert_eq!(host.display_name(true), "10.1.2.3");
        assert!(!host.is_connected());
    }
}
