//! Metric name sanitizing for Graphite identifiers.
//!
//! Graphite splits metric names on `.`, so export paths have to be flattened
//! into a single path segment before they can appear in an identifier.

/// Characters that are not allowed inside a single metric path segment.
pub const METRIC_DISALLOWED: [char; 4] = [' ', '.', '-', '/'];

/// Returns a copy of `input` with every character from `disallowed` replaced
/// by `replacement`.
///
/// The input is never modified. Applying the function a second time with the
/// same arguments is a no-op as long as `replacement` itself is not listed in
/// `disallowed`.
pub fn replace_chars(input: &str, disallowed: &[char], replacement: char) -> String {
    input
        .chars()
        .map(|c| if disallowed.contains(&c) { replacement } else { c })
        .collect()
}

/// Flattens an export path into a Graphite-safe segment (`/export/vol-1` -> `_export_vol_1`).
pub fn sanitize_metric_path(path: &str) -> String {
    replace_chars(path, &METRIC_DISALLOWED, '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_all_disallowed() {
        assert_eq!(sanitize_metric_path("/export/vol1"), "_export_vol1");
        assert_eq!(sanitize_metric_path("/a b.c-d/e"), "_a_b_c_d_e");
        assert_eq!(sanitize_metric_path("plain"), "plain");
        assert_eq!(sanitize_metric_path(""), "");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for input in ["/export/vol1", " . - / ", "/home/user.name/my-dir", "ok_already"] {
            let once = sanitize_metric_path(input);
            assert_eq!(sanitize_metric_path(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_replace_chars_does_not_touch_input() {
        let input = String::from("/a/b");
        let out = replace_chars(&input, &['/'], '-');
        assert_eq!(input, "/a/b");
        assert_eq!(out, "-a-b");
    }

    #[test]
    fn test_replace_chars_handles_multibyte() {
        assert_eq!(replace_chars("/données/été", &['/'], '_'), "_données_été");
    }
}
