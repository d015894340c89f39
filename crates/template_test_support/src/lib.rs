//! Shared helpers for fixture-driven template tests.
pub mod render_cases;

use std::fmt::Write;

/// Escape control characters and quotes so a line prints on one row.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch < ' ' => {
                let _ = write!(&mut out, "\\u{{{:02X}}}", ch as u32);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Human-readable report of the first difference between two line lists,
/// with two lines of context on each side.
pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    const MISSING: &str = "<missing>";
    fn line(lines: &[String], i: usize) -> &str {
        lines.get(i).map_or(MISSING, String::as_str)
    }
    let total = expected.len().max(actual.len());
    let mut out = String::new();
    let first = (0..total).find(|&i| line(expected, i) != line(actual, i));
    match first {
        Some(i) => {
            let start = i.saturating_sub(2);
            let end = (i + 3).min(total);
            let _ = writeln!(&mut out, "first mismatch at line {}:", i + 1);
            for n in start..end {
                let marker = if n == i { ">" } else { " " };
                let _ = writeln!(&mut out, "{marker} {:>4}  expected: {}", n + 1, line(expected, n));
                let _ = writeln!(&mut out, "{marker} {:>4}    actual: {}", n + 1, line(actual, n));
            }
        }
        None => {
            let _ = writeln!(&mut out, "no differing lines");
        }
    }
    let _ = writeln!(
        &mut out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_text("a\"b\n\u{1}"), "a\\\"b\\n\\u{01}");
    }

    #[test]
    fn diff_points_at_first_mismatch() {
        let report = diff_lines(&lines(&["a", "b", "c"]), &lines(&["a", "x"]));
        assert!(report.contains("first mismatch at line 2"));
        assert!(report.contains(">    2  expected: b"));
        assert!(report.contains(">    2    actual: x"));
        assert!(report.contains("     3    actual: <missing>"));
        assert!(report.ends_with("expected 3 lines, actual 2 lines\n"));
    }
}
