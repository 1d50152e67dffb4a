//! Utility modules for nfsdf.

mod sanitize;

pub use sanitize::{METRIC_DISALLOWED, replace_chars, sanitize_metric_path};
