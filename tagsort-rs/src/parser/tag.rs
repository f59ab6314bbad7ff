//! Tag parsing (#tag and #tag/subtag), normalization and validation.

use crate::parser::code_block::{fenced_lines, mask_inline_code};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// One tag body: ASCII word characters, `-`, or anything from U+0080 up,
/// optionally repeated with `/` for hierarchy.
pub(crate) const TAG_BODY: &str =
    r"[A-Za-z0-9_\x{80}-\x{10FFFF}-]+(?:/[A-Za-z0-9_\x{80}-\x{10FFFF}-]+)*";

/// Characters a tag may never contain.
pub const FORBIDDEN_TAG_CHARS: &[char] = &[
    '<', '>', ':', '"', '|', '?', '*', '(', ')', '[', ']', '{', '}',
];

// Rust regex has no lookbehind, so the character before # is matched too:
// start of line, or anything that is not a word character, & (HTML entity) or #.
static HASHTAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?:^|[^\w&#])#({})", TAG_BODY)).unwrap()
});

/// Why a tag was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "detail")]
pub enum TagIssueKind {
    MissingHash,
    Empty,
    DoubleSeparator,
    TrailingSeparator,
    Whitespace,
    ForbiddenCharacter(char),
}

impl std::fmt::Display for TagIssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagIssueKind::MissingHash => write!(f, "tag must start with #"),
            TagIssueKind::Empty => write!(f, "tag is empty"),
            TagIssueKind::DoubleSeparator => write!(f, "tag contains //"),
            TagIssueKind::TrailingSeparator => write!(f, "tag ends with /"),
            TagIssueKind::Whitespace => write!(f, "tag contains whitespace"),
            TagIssueKind::ForbiddenCharacter(c) => write!(f, "tag contains '{}'", c),
        }
    }
}

/// Normalize a raw tag: ensure a leading `#`, use `/` as the only separator,
/// drop trailing separators and surrounding whitespace.
///
/// `normalize_tag(normalize_tag(x)) == normalize_tag(x)` for every input.
pub fn normalize_tag(raw: &str) -> String {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix('#').unwrap_or(trimmed).replace('\\', "/");
    let body = body.trim_end_matches(|c: char| c == '/' || c.is_whitespace());
    format!("#{}", body)
}

/// Check a normalized tag against the tag invariants.
pub fn validate_tag(tag: &str) -> Result<(), TagIssueKind> {
    let Some(body) = tag.strip_prefix('#') else {
        return Err(TagIssueKind::MissingHash);
    };
    if body.is_empty() {
        return Err(TagIssueKind::Empty);
    }
    if body.chars().any(char::is_whitespace) {
        return Err(TagIssueKind::Whitespace);
    }
    if let Some(c) = body.chars().find(|c| FORBIDDEN_TAG_CHARS.contains(c)) {
        return Err(TagIssueKind::ForbiddenCharacter(c));
    }
    if body.contains("//") {
        return Err(TagIssueKind::DoubleSeparator);
    }
    if body.ends_with('/') {
        return Err(TagIssueKind::TrailingSeparator);
    }
    Ok(())
}

/// Collapse a hierarchical tag to its first segment.
/// e.g., "#a/b/c" -> "#a"
pub fn root_tag(tag: &str) -> String {
    let body = tag.strip_prefix('#').unwrap_or(tag);
    let root = body.split('/').next().unwrap_or(body);
    format!("#{}", root)
}

/// Parse inline hashtags from body text, in document order.
///
/// Lines inside fenced code blocks are skipped, inline code spans are
/// masked, and a `#` inside `[[...]]` is left to the wiki-link parser.
/// Returned strings include the leading `#`.
pub fn parse_hashtags(body: &str) -> Vec<String> {
    let lines: Vec<&str> = body.lines().collect();
    let fenced = fenced_lines(&lines);
    let mut tags = Vec::new();

    for (line, in_fence) in lines.iter().zip(fenced) {
        if in_fence || !line.contains('#') {
            continue;
        }
        let masked = mask_inline_code(line);

        for cap in HASHTAG.captures_iter(&masked) {
            let Some(tag_match) = cap.get(1) else {
                continue;
            };
            // The # is just before the tag name
            let start = tag_match.start() - 1;

            if is_in_wikilink(&masked, start) {
                continue;
            }

            tags.push(format!("#{}", tag_match.as_str()));
        }
    }

    tags
}

/// Check if a byte offset within a line is inside a wikilink.
fn is_in_wikilink(line: &str, pos: usize) -> bool {
    let before = &line[..pos];
    let after = &line[pos..];

    match (before.rfind("[["), before.rfind("]]")) {
        (Some(open), Some(close)) if open > close => after.contains("]]"),
        (Some(_), None) => after.contains("]]"),
        _ => false,
    }
}

/// Find the first line containing `needle`, as (line, column, line text).
///
/// Line and column are 1-indexed, column counted in characters.
pub fn locate_first(text: &str, needle: &str) -> Option<(usize, usize, String)> {
    text.lines().enumerate().find_map(|(idx, line)| {
        line.find(needle).map(|byte_col| {
            let column = line[..byte_col].chars().count() + 1;
            (idx + 1, column, line.trim().to_string())
        })
    })
}
