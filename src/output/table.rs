//! df-style table.
//!
//! ```text
//! Filesystem              bytes    used   avail capacity      iused      ifree  %iused    ms
//! serverA:/export/vol1    100Gi    60Gi    40Gi      60%        400        600     40%  0.42
//! ```
//!
//! The header is repeated every screenful like `vmstat`, using the terminal
//! height read at the start of each round.

use std::io::{self, IsTerminal, Write};

use super::{Output, Sample};
use crate::config::Config;
use crate::fmt::{INODE_WIDTH, Prefix, format_ms, format_prefixed, percent_used};
use crate::target::ColumnWidths;

/// Width of the latency column.
const MS_WIDTH: usize = 5;

/// Terminal rows, or `None` when stdout is not a terminal.
fn terminal_height() -> Option<u16> {
    if !io::stdout().is_terminal() {
        return None;
    }
    crossterm::terminal::size().ok().map(|(_, rows)| rows)
}

pub struct TableOutput<W: Write> {
    out: W,
    widths: ColumnWidths,
    prefix: Prefix,
    inodes: bool,
    display_ips: bool,
    one_header: bool,
    height_lookup: fn() -> Option<u16>,
    height: Option<u16>,
}

impl<W: Write> TableOutput<W> {
    /// Column widths are fixed here and never change afterwards.
    pub fn new(out: W, config: &Config, widths: ColumnWidths) -> Self {
        Self {
            out,
            widths,
            prefix: config.prefix,
            inodes: config.inodes,
            display_ips: config.display_ips,
            one_header: config.one_header,
            height_lookup: terminal_height,
            height: None,
        }
    }

    /// Replaces the terminal height lookup.
    pub fn with_height_lookup(mut self, lookup: fn() -> Option<u16>) -> Self {
        self.height_lookup = lookup;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_header(&mut self) -> io::Result<()> {
        let fs = self.widths.filesystem();
        if self.inodes {
            writeln!(
                self.out,
                "{:<fs$} {:>iw$} {:>iw$} {:>iw$} %iused    ms",
                "Filesystem",
                "inodes",
                "iused",
                "ifree",
                iw = INODE_WIDTH,
            )
        } else {
            let w = self.prefix.column_width();
            writeln!(
                self.out,
                "{:<fs$} {:>w$} {:>w$} {:>w$} capacity {:>iw$} {:>iw$}  %iused    ms",
                "Filesystem",
                self.prefix.header_label(),
                "used",
                "avail",
                "iused",
                "ifree",
                iw = INODE_WIDTH,
            )
        }
    }

    fn write_row(&mut self, sample: &Sample<'_>) -> io::Result<()> {
        let fs = self.widths.filesystem();
        let name = format!(
            "{}:{}",
            sample.host.display_name(self.display_ips),
            sample.export.path
        );
        let stats = &sample.stats;
        let inode_pct = percent_used(stats.ffiles, stats.tfiles);
        let ms = format_ms(sample.usec(), MS_WIDTH);

        if self.inodes {
            writeln!(
                self.out,
                "{:<fs$} {:>iw$} {:>iw$} {:>iw$} {:>5.0}% {}",
                name,
                stats.tfiles,
                stats.used_files(),
                stats.ffiles,
                inode_pct,
                ms,
                iw = INODE_WIDTH,
            )
        } else {
            let w = self.prefix.column_width();
            writeln!(
                self.out,
                "{:<fs$} {:>w$} {:>w$} {:>w$} {:>7.0}% {:>iw$} {:>iw$}  {:>5.0}% {}",
                name,
                format_prefixed(stats.tbytes, self.prefix),
                format_prefixed(stats.used_bytes(), self.prefix),
                format_prefixed(stats.fbytes, self.prefix),
                percent_used(stats.fbytes, stats.tbytes),
                stats.used_files(),
                stats.ffiles,
                inode_pct,
                ms,
                iw = INODE_WIDTH,
            )
        }
    }
}

impl<W: Write> Output for TableOutput<W> {
    fn start(&mut self) -> io::Result<()> {
        self.write_header()
    }

    fn begin_round(&mut self) {
        self.height = (self.height_lookup)();
    }

    fn emit(&mut self, sample: &Sample<'_>, successes: u64) -> io::Result<()> {
        if !self.one_header {
            if let Some(rows) = self.height.filter(|&h| h > 0) {
                if successes > 0 && successes % u64::from(rows) == 0 {
                    self.write_header()?;
                }
            }
        }
        self.write_row(sample)
    }

    fn end_round(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
