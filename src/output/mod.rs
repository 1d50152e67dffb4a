//! Rendering of successful samples.

mod graphite;
mod table;

pub use graphite::GraphiteOutput;
pub use table::TableOutput;

use std::io;
use std::time::Duration;

use crate::rpc::FsStat;
use crate::target::{ExportPoint, Host};

/// A successful call, ready to render.
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    pub host: &'a Host,
    pub export: &'a ExportPoint,
    pub stats: FsStat,
    pub elapsed: Duration,
    /// Unix time in seconds when the call started.
    pub timestamp: i64,
}

impl Sample<'_> {
    /// Latency in whole microseconds.
    pub fn usec(&self) -> u64 {
        self.elapsed.as_micros().min(u128::from(u64::MAX)) as u64
    }
}

/// Sink for samples. Errors are write failures on the underlying stream.
pub trait Output {
    /// Called once before the first round.
    fn start(&mut self) -> io::Result<()>;

    /// Called at the start of every round.
    fn begin_round(&mut self) {}

    /// Renders one sample.
    ///
    /// # Arguments
    /// * `sample` - A successful call
    /// * `successes` - Successful calls in the run so far, this one included
    fn emit(&mut self, sample: &Sample<'_>, successes: u64) -> io::Result<()>;

    /// Called after every round.
    fn end_round(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<O: Output + ?Sized> Output for Box<O> {
    fn start(&mut self) -> io::Result<()> {
        (**self).start()
    }

    fn begin_round(&mut self) {
        (**self).begin_round()
    }

    fn emit(&mut self, sample: &Sample<'_>, successes: u64) -> io::Result<()> {
        (**self).emit(sample, successes)
    }

    fn end_round(&mut self) -> io::Result<()> {
        (**self).end_round()
    }
}
