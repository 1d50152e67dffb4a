//! Graphite plaintext protocol lines.

use std::io::{self, Write};

use super::{Output, Sample};
use crate::util::sanitize_metric_path;

/// Writes `{prefix}.{host}.df.{path}.{metric} {value} {timestamp}` lines,
/// five per sample, with the host name reversed and the path sanitized.
pub struct GraphiteOutput<W: Write> {
    out: W,
    prefix: String,
}

impl<W: Write> GraphiteOutput<W> {
    pub fn new(out: W, prefix: impl Into<String>) -> Self {
        Self {
            out,
            prefix: prefix.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Output for GraphiteOutput<W> {
    fn start(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn emit(&mut self, sample: &Sample<'_>, _successes: u64) -> io::Result<()> {
        let base = format!(
            "{}.{}.df.{}",
            self.prefix,
            sample.host.ndqf,
            sanitize_metric_path(&sample.export.path)
        );
        let stats = &sample.stats;
        for (metric, value) in [
            ("tbytes", stats.tbytes),
            ("fbytes", stats.fbytes),
            ("tfiles", stats.tfiles),
            ("ffiles", stats.ffiles),
            ("usec", sample.usec()),
        ] {
            writeln!(self.out, "{}.{} {} {}", base, metric, value, sample.timestamp)?;
        }
        Ok(())
    }

    fn end_round(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
