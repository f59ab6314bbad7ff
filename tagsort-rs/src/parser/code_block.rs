//! Code block detection for skipping parsing inside code.
//!
//! Fence state is tracked per line; inline code spans are masked within a line.

use regex::Regex;
use std::sync::LazyLock;

// Matches the opening of a fenced code block: ``` or ~~~ at start of line
static FENCE_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(`{3,}|~{3,})").unwrap()
});

// Matches inline code with double backticks (can contain single backticks)
static INLINE_CODE_DOUBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"``(?:[^`]|`[^`])*``").unwrap()
});

// Matches inline code - simple pattern for single backticks
static INLINE_CODE_SINGLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`[^`]+`").unwrap()
});

/// Mark every line that belongs to a fenced code block (fence lines included).
///
/// Only matched fences count: an opening fence with no closing fence of the
/// same character and at least the same length is treated as plain text.
pub fn fenced_lines(lines: &[&str]) -> Vec<bool> {
    let mut fenced = vec![false; lines.len()];
    let mut i = 0;

    while i < lines.len() {
        let Some(open) = FENCE_OPEN.find(lines[i]) else {
            i += 1;
            continue;
        };

        let fence = open.as_str();
        let fence_char = fence.chars().next().unwrap_or('`');
        let fence_len = fence.len();

        let close = (i + 1..lines.len()).find(|&j| {
            let trimmed = lines[j].trim();
            trimmed.len() >= fence_len && trimmed.chars().all(|c| c == fence_char)
        });

        match close {
            Some(end) => {
                for flag in &mut fenced[i..=end] {
                    *flag = true;
                }
                i = end + 1;
            }
            None => i += 1,
        }
    }

    fenced
}

/// Replace the contents of inline code spans in a line with spaces.
///
/// Character count is preserved so columns computed on the masked line
/// still point at the same characters in the original.
pub fn mask_inline_code(line: &str) -> String {
    if !line.contains('`') {
        return line.to_string();
    }

    let mut spans: Vec<(usize, usize)> = INLINE_CODE_DOUBLE
        .find_iter(line)
        .map(|m| (m.start(), m.end()))
        .collect();

    for m in INLINE_CODE_SINGLE.find_iter(line) {
        let overlaps = spans
            .iter()
            .any(|&(start, end)| m.start() < end && m.end() > start);
        if !overlaps {
            spans.push((m.start(), m.end()));
        }
    }

    let mut masked = String::with_capacity(line.len());
    for (offset, c) in line.char_indices() {
        if spans.iter().any(|&(start, end)| offset >= start && offset < end) {
            masked.push(' ');
        } else {
            masked.push(c);
        }
    }
    masked
}
