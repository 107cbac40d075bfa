//! Outside source: file text with every view's line range cut out.
//!
//! Comparing it between runs tells view-local edits apart from edits to
//! shared code. Overlapping or touching ranges are merged first, so a
//! line is never cut twice and later ranges never shift.

use crate::cache::ViewSpan;

/// Merge 1-based inclusive line ranges.
pub fn merge_ranges(spans: &[ViewSpan]) -> Vec<(usize, usize)> {
    let mut ranges: Vec<_> = spans
        .iter()
        .map(|s| (s.start_line.min(s.end_line), s.start_line.max(s.end_line)))
        .collect();
    ranges.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 + 1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// `text` minus every line covered by a view.
pub fn outside_source(text: &str, spans: &[ViewSpan]) -> String {
    let ranges = merge_ranges(spans);
    let mut ranges = ranges.iter().peekable();

    let mut kept = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        while ranges.next_if(|(_, end)| *end < line_no).is_some() {}
        let covered = ranges
            .peek()
            .is_some_and(|(start, end)| (*start..=*end).contains(&line_no));
        if !covered {
            kept.push(line);
        }
    }
    kept.join("\n")
}
