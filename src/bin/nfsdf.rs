//! nfsdf - df for NFS exports.
//!
//! Reads `host:path:filehandle` lines from standard input and polls each
//! export with NFSv3 `FSSTAT`, printing a df-style table or Graphite lines.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io::{self, BufRead};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{ArgGroup, Parser};
use tracing::{Level, debug, error, warn};
use tracing_subscriber::EnvFilter;

use nfsdf::collector::StatCollector;
use nfsdf::config::{
    Config, ConfigError, ConnectConfig, DEFAULT_HERTZ, DEFAULT_METRIC_PREFIX, NFS_PORT, OutputMode,
    RunMode, Transport, parse_source_address,
};
use nfsdf::fmt::Prefix;
use nfsdf::output::{GraphiteOutput, Output, TableOutput};
use nfsdf::rpc::NfsConnector;
use nfsdf::scheduler::{Poller, ThreadPacer};
use nfsdf::target::{Registry, parse_descriptor};

/// Exit status for usage and configuration errors.
const EXIT_USAGE: u8 = 3;

/// Poll NFS exports for filesystem usage.
///
/// Export descriptors (host:path:filehandle, one per line) are read from
/// standard input.
#[derive(Parser, Debug)]
#[command(
    name = "nfsdf",
    version,
    disable_help_flag = true,
    group(ArgGroup::new("units").multiple(false)),
    group(ArgGroup::new("rounds").multiple(false))
)]
struct Args {
    /// Show IP addresses instead of host names.
    #[arg(short = 'A')]
    display_ips: bool,

    /// Display sizes in bytes.
    #[arg(short = 'b', group = "units")]
    bytes: bool,

    /// Display sizes in kilobytes.
    #[arg(short = 'k', group = "units")]
    kilobytes: bool,

    /// Display sizes in megabytes.
    #[arg(short = 'm', group = "units")]
    megabytes: bool,

    /// Display sizes in gigabytes.
    #[arg(short = 'g', group = "units")]
    gigabytes: bool,

    /// Display sizes in terabytes.
    #[arg(short = 't', group = "units")]
    terabytes: bool,

    /// Display human readable sizes (default).
    #[arg(short = 'h', group = "units")]
    human: bool,

    /// Display inodes.
    #[arg(short = 'i')]
    inodes: bool,

    /// Graphite format output.
    #[arg(short = 'G', conflicts_with = "units")]
    graphite: bool,

    /// Frequency in Hertz (requests per second).
    #[arg(short = 'H', value_name = "N", default_value_t = DEFAULT_HERTZ)]
    hertz: u64,

    /// Count of requests to send for each export.
    #[arg(short = 'c', value_name = "N", group = "rounds")]
    count: Option<u64>,

    /// Loop until interrupted.
    #[arg(short = 'l', group = "rounds")]
    looping: bool,

    /// Only display the header once.
    #[arg(short = 'n')]
    one_header: bool,

    /// Prefix for Graphite metric names.
    #[arg(short = 'p', value_name = "STRING", default_value = DEFAULT_METRIC_PREFIX)]
    prefix: String,

    /// Source IPv4 address.
    #[arg(short = 'S', value_name = "ADDR")]
    source: Option<String>,

    /// Use TCP (default UDP).
    #[arg(short = 'T')]
    tcp: bool,

    /// Ask the portmapper for the NFS port.
    #[arg(short = 'M')]
    portmapper: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print help.
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,
}

impl Args {
    fn unit_prefix(&self) -> Prefix {
        if self.human {
            Prefix::Human
        } else if self.bytes {
            Prefix::Byte
        } else if self.kilobytes {
            Prefix::Kilo
        } else if self.megabytes {
            Prefix::Mega
        } else if self.gigabytes {
            Prefix::Giga
        } else if self.terabytes {
            Prefix::Tera
        } else {
            Prefix::Human
        }
    }

    fn config(&self) -> Result<(Config, ConnectConfig), ConfigError> {
        let config = Config {
            hertz: self.hertz,
            prefix: self.unit_prefix(),
            output: if self.graphite {
                OutputMode::Graphite
            } else {
                OutputMode::Table
            },
            run: RunMode::from_flags(self.count, self.looping)?,
            inodes: self.inodes,
            display_ips: self.display_ips,
            one_header: self.one_header,
            metric_prefix: self.prefix.clone(),
        };

        let connect = ConnectConfig {
            port: if self.portmapper { 0 } else { NFS_PORT },
            transport: if self.tcp { Transport::Tcp } else { Transport::Udp },
            source: self.source.as_deref().map(parse_source_address).transpose()?,
            ..ConnectConfig::default()
        };

        Ok((config, connect))
    }
}

/// `RUST_LOG` plus a directive for this crate's own level.
fn log_filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env();
    match format!("nfsdf={}", level).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Diagnostics go to stderr so stdout stays parseable.
fn init_logging(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Builds the registry from descriptor lines, skipping the ones that don't parse.
fn read_targets(input: impl BufRead) -> Registry {
    let mut registry = Registry::new();
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read standard input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_descriptor(&line) {
            Ok(descriptor) => registry.register(descriptor),
            Err(e) => warn!("Skipping '{}': {}", line.trim(), e),
        }
    }
    registry
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(EXIT_USAGE);
        }
    };

    init_logging(args.verbose);

    let (config, connect) = match args.config() {
        Ok(configs) => configs,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };
    debug!("{:?}", config);
    debug!("{:?}", connect);

    let mut registry = read_targets(io::stdin().lock());
    debug!(
        "{} exports on {} hosts",
        registry.len(),
        registry.hosts().len()
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        debug!("Received interrupt");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let output: Box<dyn Output> = match config.output {
        OutputMode::Table => Box::new(TableOutput::new(
            io::stdout().lock(),
            &config,
            registry.column_widths(config.display_ips),
        )),
        OutputMode::Graphite => Box::new(GraphiteOutput::new(
            io::stdout().lock(),
            config.metric_prefix.clone(),
        )),
    };

    let mut poller = Poller::new(
        StatCollector::new(NfsConnector::new(connect)),
        output,
        ThreadPacer::new(running.clone()),
        config.run,
        config.period(),
        running,
    );

    match poller.run(&mut registry) {
        Ok(summary) => {
            debug!(
                "{} rounds, {} sent, {} received",
                summary.rounds, summary.sent, summary.received
            );
            if summary.success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("Failed to write output: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("nfsdf").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        let (config, connect) = args.config().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(connect, ConnectConfig::default());
    }

    #[test]
    fn test_flags_map_to_config() {
        let args = parse(&[
            "-A", "-t", "-i", "-n", "-H", "10", "-c", "5", "-T", "-M", "-S", "10.1.1.1",
        ])
        .unwrap();
        let (config, connect) = args.config().unwrap();
        assert!(config.display_ips);
        assert_eq!(config.prefix, Prefix::Tera);
        assert!(config.inodes);
        assert!(config.one_header);
        assert_eq!(config.hertz, 10);
        assert_eq!(config.run, RunMode::Count(5));
        assert_eq!(connect.transport, Transport::Tcp);
        assert_eq!(connect.port, 0);
        assert_eq!(connect.source, Some("10.1.1.1".parse().unwrap()));
    }

    #[test]
    fn test_h_is_human_not_help() {
        let args = parse(&["-h"]).unwrap();
        assert_eq!(args.unit_prefix(), Prefix::Human);

        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_multiple_units_conflict() {
        let err = parse(&["-b", "-k"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_graphite_conflicts_with_units() {
        let err = parse(&["-G", "-m"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);

        let args = parse(&["-G", "-p", "storage"]).unwrap();
        let (config, _) = args.config().unwrap();
        assert_eq!(config.output, OutputMode::Graphite);
        assert_eq!(config.metric_prefix, "storage");
    }

    #[test]
    fn test_count_conflicts_with_loop() {
        let err = parse(&["-c", "3", "-l"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse(&["-c", "0"]).unwrap().config().is_err());
        assert!(parse(&["-S", "not-an-ip"]).unwrap().config().is_err());
        assert!(parse(&["-H", "fast"]).is_err());
        assert!(parse(&["-x"]).is_err());
    }

    #[test]
    fn test_log_filter_is_scoped_to_crate() {
        for (verbose, expected) in [(0, "nfsdf=info"), (1, "nfsdf=debug"), (5, "nfsdf=trace")] {
            let filter = log_filter(verbose).to_string().to_lowercase();
            assert!(filter.contains(expected), "{}", filter);
        }
    }

    #[test]
    fn test_read_targets_skips_bad_lines() {
        let input = "10.0.0.1:/export/vol1:0102\n\
                     \n\
                     garbage\n\
                     10.0.0.1:/export/vol2:0304\n\
                     10.0.0.2:/data:zz\n";
        let registry = read_targets(input.as_bytes());
        assert_eq!(registry.hosts().len(), 1);
        assert_eq!(registry.len(), 2);
    }
}
