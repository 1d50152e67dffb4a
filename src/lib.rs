//! nfsdf - poll NFS servers for filesystem usage.
//!
//! Reads `host:path:filehandle` descriptors, issues NFSv3 `FSSTAT` calls to
//! every export at a fixed frequency and prints the results as a df-style
//! table or as Graphite plaintext lines.
//!
//! - [`target`] - hosts, exports and descriptor parsing
//! - [`rpc`] - ONC RPC client, portmapper and the `FSSTAT` procedure
//! - [`collector`] - one classified, timed call per export
//! - [`scheduler`] - rounds, pacing and termination
//! - [`output`] - table and Graphite renderers

pub mod collector;
pub mod config;
pub mod fmt;
pub mod output;
pub mod rpc;
pub mod scheduler;
pub mod target;
pub mod util;
