//! Polling loop.
//!
//! Each round calls every export in registry order and hands successful
//! results to the output. Rounds start one period apart: the time a round
//! took is subtracted from the sleep that follows it, and a round that takes
//! longer than the period is followed by the next one straight away.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::collector::{Connector, StatCollector, StatOutcome};
use crate::config::RunMode;
use crate::output::{Output, Sample};
use crate::target::Registry;

/// Granularity of the cancellation check while sleeping.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Waits between rounds.
pub trait Pacer {
    /// Blocks for up to `duration`.
    ///
    /// # Arguments
    /// * `duration` - Time left in the current period
    ///
    /// Implementations may return early when the run is being stopped.
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps on the current thread, waking early once `running` is cleared.
pub struct ThreadPacer {
    running: Arc<AtomicBool>,
}

impl ThreadPacer {
    /// # Arguments
    /// * `running` - Flag cleared by the Ctrl-C handler
    pub fn new(running: Arc<AtomicBool>) -> Self {
        Self { running }
    }
}

impl Pacer for ThreadPacer {
    fn sleep(&mut self, duration: Duration) {
        let mut remaining = duration;
        while remaining > Duration::ZERO && self.running.load(Ordering::SeqCst) {
            let slice = remaining.min(SLEEP_SLICE);
            std::thread::sleep(slice);
            remaining = remaining.saturating_sub(slice);
        }
    }
}

/// Time to sleep after a round that took `elapsed`, or `None` if the round
/// used up the whole period.
pub fn sleep_for(period: Duration, elapsed: Duration) -> Option<Duration> {
    if elapsed < period {
        Some(period - elapsed)
    } else {
        None
    }
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub rounds: u64,
    pub sent: u64,
    pub received: u64,
}

impl RunSummary {
    /// At least one call was made and every call succeeded.
    pub fn success(&self) -> bool {
        self.sent > 0 && self.sent == self.received
    }
}

/// Drives rounds of stat calls and feeds the results to an output.
pub struct Poller<C: Connector, O: Output, P: Pacer> {
    collector: StatCollector<C>,
    output: O,
    pacer: P,
    run: RunMode,
    period: Duration,
    running: Arc<AtomicBool>,
}

impl<C: Connector, O: Output, P: Pacer> Poller<C, O, P> {
    /// Creates a poller.
    ///
    /// # Arguments
    /// * `collector` - Issues the stat calls
    /// * `output` - Receives every successful sample
    /// * `pacer` - Waits between rounds
    /// * `run` - How many rounds to make
    /// * `period` - Time from the start of one round to the start of the next
    /// * `running` - Cleared to stop after the current round
    pub fn new(
        collector: StatCollector<C>,
        output: O,
        pacer: P,
        run: RunMode,
        period: Duration,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            collector,
            output,
            pacer,
            run,
            period,
            running,
        }
    }

    /// The output, mostly for inspecting it after a run.
    pub fn output(&self) -> &O {
        &self.output
    }

    /// The pacer, mostly for inspecting it after a run.
    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    /// Polls until the run mode says stop or `running` is cleared.
    ///
    /// # Arguments
    /// * `registry` - Exports to poll; per-export counters are updated in place
    ///
    /// # Returns
    /// Run counters, or the first write error from the output, which ends
    /// the run early
    pub fn run(&mut self, registry: &mut Registry) -> io::Result<RunSummary> {
        if registry.is_empty() {
            warn!("No export points to poll");
            return Ok(RunSummary::default());
        }

        self.output.start()?;

        let mut rounds = 0u64;
        let mut successes = 0u64;
        loop {
            let started = Instant::now();
            self.round(registry, &mut successes)?;
            rounds += 1;

            let took = started.elapsed();
            debug!("Polling took {:?}", took);

            if !self.running.load(Ordering::SeqCst) {
                debug!("Interrupted after {} rounds", rounds);
                break;
            }
            if self.finished(registry) {
                break;
            }

            match sleep_for(self.period, took) {
                Some(pause) => {
                    debug!("Sleeping for {:?}", pause);
                    self.pacer.sleep(pause);
                }
                None => debug!("Slow poll, not sleeping"),
            }

            if !self.running.load(Ordering::SeqCst) {
                debug!("Interrupted after {} rounds", rounds);
                break;
            }
        }

        let (sent, received) = registry.totals();
        Ok(RunSummary {
            rounds,
            sent,
            received,
        })
    }

    fn round(&mut self, registry: &mut Registry, successes: &mut u64) -> io::Result<()> {
        self.output.begin_round();
        for host in registry.hosts_mut() {
            for index in 0..host.exports().len() {
                let record = self.collector.call(host, index);
                if let StatOutcome::Success(stats) = record.outcome {
                    *successes += 1;
                    let sample = Sample {
                        host: &*host,
                        export: &host.exports()[index],
                        stats,
                        elapsed: record.elapsed,
                        timestamp: record.timestamp,
                    };
                    self.output.emit(&sample, *successes)?;
                }
            }
        }
        self.output.end_round()
    }

    fn finished(&self, registry: &Registry) -> bool {
        match self.run {
            RunMode::Once => true,
            RunMode::Count(count) => registry
                .first_export()
                .is_none_or(|export| export.sent() >= count),
            RunMode::Loop => false,
        }
    }
}
