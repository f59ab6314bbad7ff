//! YAML-ish frontmatter splitting and tag-list parsing.
//!
//! Only the tag syntaxes notes actually use are understood; this is not a
//! YAML parser. Anything that does not fit simply yields no tags.

use regex::Regex;
use std::sync::LazyLock;

// tags: [a, b, c]
static INLINE_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^tags:\s*\[(.*)\]\s*$").unwrap()
});

// tags:   (values follow as "- item" lines)
static LIST_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^tags:\s*$").unwrap()
});

// - item
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)-(?:\s+(.*?))?\s*$").unwrap()
});

// tag: value
static SCALAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^tag:\s*(.+?)\s*$").unwrap()
});

/// Frontmatter extraction result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontmatterSplit<'a> {
    /// The raw YAML string (without delimiters).
    pub yaml: Option<&'a str>,
    /// The content after the frontmatter.
    pub body: &'a str,
    /// Line number where the body starts (1-indexed).
    pub body_start_line: usize,
}

/// A raw tag value read from frontmatter, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontmatterTag {
    pub raw: String,
    /// The frontmatter line the value came from.
    pub context: String,
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']).trim_end() == "---"
}

/// Split content into frontmatter and body.
///
/// Frontmatter must open with a `---` line at the very start and close with
/// another `---` line. Without a closing delimiter the whole content is body.
pub fn split_frontmatter(content: &str) -> FrontmatterSplit<'_> {
    let no_frontmatter = FrontmatterSplit {
        yaml: None,
        body: content,
        body_start_line: 1,
    };

    let mut lines = content.split_inclusive('\n');
    match lines.next() {
        Some(first) if is_delimiter(first) && first.ends_with('\n') => {}
        _ => return no_frontmatter,
    }

    let yaml_start = content.split_inclusive('\n').next().map_or(0, str::len);
    let mut offset = yaml_start;
    let mut line_no = 1;

    for line in lines {
        line_no += 1;
        if is_delimiter(line) {
            let yaml = content[yaml_start..offset].trim_end_matches(['\n', '\r']);
            return FrontmatterSplit {
                yaml: Some(yaml),
                body: &content[offset + line.len()..],
                body_start_line: line_no + 1,
            };
        }
        offset += line.len();
    }

    no_frontmatter
}

/// Strip one layer of matching quotes and surrounding whitespace.
fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].trim();
        }
    }
    value
}

/// Drop a trailing YAML comment (` # ...`) from an unquoted list item.
fn strip_comment(value: &str) -> &str {
    if value.starts_with(['"', '\'']) {
        return value;
    }
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end(),
        None => value,
    }
}

/// Read raw tag values from a frontmatter block.
///
/// Three syntaxes are tried independently and all results kept, in the order
/// their lines appear:
/// - `tags: [a, b, c]`
/// - `tags:` followed by `- item` lines
/// - `tag: value`
pub fn parse_frontmatter_tags(yaml: &str) -> Vec<FrontmatterTag> {
    let lines: Vec<&str> = yaml.lines().collect();
    let mut found: Vec<(usize, FrontmatterTag)> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if let Some(cap) = INLINE_ARRAY.captures(line) {
            let inner = &cap[1];
            // Nested or stray brackets mean we can't trust the split.
            if inner.contains('[') || inner.contains(']') {
                continue;
            }
            for item in inner.split(',') {
                let value = unquote(item);
                if !value.is_empty() {
                    found.push((
                        idx,
                        FrontmatterTag {
                            raw: value.to_string(),
                            context: line.trim().to_string(),
                        },
                    ));
                }
            }
        }
    }

    for (idx, line) in lines.iter().enumerate() {
        if !LIST_KEY.is_match(line) {
            continue;
        }

        let mut indent: Option<usize> = None;
        for (item_idx, item_line) in lines.iter().enumerate().skip(idx + 1) {
            if item_line.trim().is_empty() {
                continue;
            }
            let Some(cap) = LIST_ITEM.captures(item_line) else {
                break;
            };
            let item_indent = cap[1].len();
            match indent {
                None => indent = Some(item_indent),
                Some(expected) if expected != item_indent => break,
                Some(_) => {}
            }

            let value = unquote(strip_comment(cap.get(2).map_or("", |m| m.as_str())));
            if !value.is_empty() {
                found.push((
                    item_idx,
                    FrontmatterTag {
                        raw: value.to_string(),
                        context: item_line.trim().to_string(),
                    },
                ));
            }
        }
    }

    for (idx, line) in lines.iter().enumerate() {
        if let Some(cap) = SCALAR.captures(line) {
            let value = unquote(&cap[1]);
            if value.is_empty() || value.starts_with('[') {
                continue;
            }
            found.push((
                idx,
                FrontmatterTag {
                    raw: value.to_string(),
                    context: line.trim().to_string(),
                },
            ));
        }
    }

    found.sort_by_key(|(idx, _)| *idx);
    found.into_iter().map(|(_, tag)| tag).collect()
}
