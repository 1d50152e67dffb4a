//! Unit-prefix formatting for byte counts.
//!
//! Fixed prefixes shift the value right by a multiple of 10 bits and print an
//! integer, so a column can be sized once from the largest value a `u64` can
//! hold at that prefix. The human prefix picks a unit per value and appends a
//! short label instead.

use std::fmt;

/// Column width for inode counts. Assumes 32-bit inode numbers (10 digits);
/// larger counts still print but push the following columns right.
pub const INODE_WIDTH: usize = 10;

/// Human-mode units, smallest first. Index is the power of 1024.
const HUMAN_LABELS: [&str; 7] = ["B", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];

/// Byte unit used for the size columns of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prefix {
    Byte,
    Kilo,
    Mega,
    Giga,
    Tera,
    /// Per-value unit with a label suffix ("1.5Gi", "512B").
    #[default]
    Human,
}

impl Prefix {
    /// Number of bits the value is shifted right by. Zero for `Byte` and `Human`.
    pub fn shift(self) -> u32 {
        match self {
            Prefix::Byte | Prefix::Human => 0,
            Prefix::Kilo => 10,
            Prefix::Mega => 20,
            Prefix::Giga => 30,
            Prefix::Tera => 40,
        }
    }

    /// Widest number this prefix can print, without the label in human mode.
    ///
    /// For fixed prefixes this is the digit count of `u64::MAX >> shift`.
    pub fn width(self) -> usize {
        match self {
            Prefix::Byte => 20,
            Prefix::Kilo => 17,
            Prefix::Mega => 14,
            Prefix::Giga => 11,
            Prefix::Tera => 8,
            Prefix::Human => 4,
        }
    }

    /// Width of a table column for this prefix, including the gap before it
    /// and room for the unit label in human mode.
    pub fn column_width(self) -> usize {
        match self {
            Prefix::Human => self.width() + 1 + 2,
            _ => self.width() + 1,
        }
    }

    /// Header label of the total-size column.
    pub fn header_label(self) -> &'static str {
        match self {
            Prefix::Byte => "bytes",
            Prefix::Kilo => "kbytes",
            Prefix::Mega => "mbytes",
            Prefix::Giga => "gbytes",
            Prefix::Tera => "tbytes",
            // every value carries its own unit
            Prefix::Human => "bytes",
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Prefix::Byte => "bytes",
            Prefix::Kilo => "kilobytes",
            Prefix::Mega => "megabytes",
            Prefix::Giga => "gigabytes",
            Prefix::Tera => "terabytes",
            Prefix::Human => "human",
        };
        f.write_str(name)
    }
}

/// Format a byte count with the given prefix, without padding.
///
/// Fixed prefixes: `"1"` for 1 TiB with [`Prefix::Tera`].
/// Human: `"512B"`, `"1.5Ki"`, `"112Gi"`, `"1.0Ti"`.
pub fn format_prefixed(bytes: u64, prefix: Prefix) -> String {
    match prefix {
        Prefix::Human => format_human(bytes),
        _ => (bytes >> prefix.shift()).to_string(),
    }
}

/// Format a byte count using the largest power of 1024 that keeps the value >= 1.
///
/// One decimal below 10, none above, so the number never exceeds four characters.
pub fn format_human(bytes: u64) -> String {
    let power = (1..HUMAN_LABELS.len())
        .rev()
        .find(|&p| bytes >> (10 * p) > 0)
        .unwrap_or(0);

    if power == 0 {
        return format!("{}{}", bytes, HUMAN_LABELS[0]);
    }

    let scaled = bytes as f64 / (1u64 << (10 * power)) as f64;
    if scaled < 10.0 {
        format!("{:.1}{}", scaled, HUMAN_LABELS[power])
    } else {
        format!("{:.0}{}", scaled, HUMAN_LABELS[power])
    }
}

/// Percentage of `total` in use given the `free` amount: `(1 - free/total) * 100`.
///
/// A zero total reports 0% rather than NaN.
pub fn percent_used(free: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (1.0 - free as f64 / total as f64) * 100.0
}

/// Milliseconds with two decimals from a microsecond count.
pub fn format_ms(usec: u64, width: usize) -> String {
    format!("{:>width$.2}", usec as f64 / 1000.0, width = width)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIB: u64 = 1_099_511_627_776;

    #[test]
    fn test_tera_prefix_of_one_tib() {
        assert_eq!(format_prefixed(TIB, Prefix::Tera), "1");
    }

    #[test]
    fn test_human_of_one_tib() {
        assert_eq!(format_prefixed(TIB, Prefix::Human), "1.0Ti");
    }

    #[test]
    fn test_fixed_prefixes_truncate() {
        assert_eq!(format_prefixed(1023, Prefix::Kilo), "0");
        assert_eq!(format_prefixed(1024, Prefix::Kilo), "1");
        assert_eq!(format_prefixed(5 * 1024 * 1024 + 1, Prefix::Mega), "5");
        assert_eq!(format_prefixed(3 << 30, Prefix::Giga), "3");
        assert_eq!(format_prefixed(12345, Prefix::Byte), "12345");
    }

    #[test]
    fn test_human_picks_largest_unit() {
        assert_eq!(format_human(0), "0B");
        assert_eq!(format_human(512), "512B");
        assert_eq!(format_human(1023), "1023B");
        assert_eq!(format_human(1024), "1.0Ki");
        assert_eq!(format_human(1536), "1.5Ki");
        assert_eq!(format_human(100 * 1024 * 1024), "100Mi");
        assert_eq!(format_human(112 << 30), "112Gi");
        assert_eq!(format_human(u64::MAX), "16Ei");
    }

    #[test]
    fn test_human_fits_width() {
        for v in [1023u64, 1024 * 1023 + 1000, (1 << 40) * 1023, u64::MAX] {
            let s = format_human(v);
            let digits = s.trim_end_matches(|c: char| c.is_ascii_alphabetic());
            assert!(digits.len() <= Prefix::Human.width(), "{s}");
        }
    }

    #[test]
    fn test_width_matches_u64_max() {
        for prefix in [Prefix::Byte, Prefix::Kilo, Prefix::Mega, Prefix::Giga, Prefix::Tera] {
            assert_eq!(
                format_prefixed(u64::MAX, prefix).len(),
                prefix.width(),
                "{prefix}"
            );
        }
    }

    #[test]
    fn test_percent_used() {
        assert!((percent_used(40, 100) - 60.0).abs() < 1e-9);
        assert!((percent_used(600, 1000) - 40.0).abs() < 1e-9);
        assert_eq!(percent_used(0, 0), 0.0);
        assert_eq!(percent_used(100, 100), 0.0);
    }

    #[test]
    fn test_format_ms() {
        assert_eq!(format_ms(1234, 5), " 1.23");
        assert_eq!(format_ms(99_999_990, 5), "99999.99");
    }
}
