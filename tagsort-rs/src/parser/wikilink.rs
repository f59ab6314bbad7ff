//! Wikilink, embed and Markdown link parsing.

use crate::parser::code_block::{fenced_lines, mask_inline_code};
use crate::parser::tag::TAG_BODY;
use crate::types::LinkType;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

// Wikilink pattern: [[target]] or [[target|alias]] or [[target#heading]]
// (!)?                 - Optional ! for embeds (group 1)
// \[\[                 - Opening [[
// ([^\]\|#]*)          - Target path (group 2)
// (?:#([^\]\|]*))?     - Heading reference (group 3)
// (?:\|([^\]]*))?      - Alias (group 4)
// \]\]                 - Closing ]]
static WIKILINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(!?)\[\[([^\]\|#]*)(?:#([^\]\|]*))?(?:\|([^\]]*))?\]\]").unwrap()
});

// [text](target) - the target stops at whitespace or the closing paren
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\]]*\]\(([^)\s]+)\)").unwrap()
});

// [[note#tag]] or [[#tag]]: the part after # must look like a tag
static WIKILINK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\[\[[^\[\]|#]*#({})\]\]", TAG_BODY)).unwrap()
});

/// A link found in a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub link_type: LinkType,

    /// The link target as written (without heading or alias).
    pub target: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Line number where this link appears (1-indexed).
    pub line: usize,

    /// Column in characters (1-indexed).
    pub column: usize,
}

/// A tag written as the heading part of a wikilink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLinkTag {
    /// The tag including its leading #.
    pub tag: String,
    /// Line number (1-indexed, relative to the parsed text).
    pub line: usize,
    /// Column of the opening [[ in characters (1-indexed).
    pub column: usize,
    pub context: String,
}

fn char_column(line: &str, byte_offset: usize) -> usize {
    line[..byte_offset].chars().count() + 1
}

/// Iterate over lines outside fenced code, with inline code masked.
fn scannable_lines(content: &str) -> impl Iterator<Item = (usize, &str, String)> {
    let lines: Vec<&str> = content.lines().collect();
    let fenced = fenced_lines(&lines);
    lines
        .into_iter()
        .zip(fenced)
        .enumerate()
        .filter(|(_, (_, in_fence))| !in_fence)
        .map(|(idx, (line, _))| (idx + 1, line, mask_inline_code(line)))
}

/// Parse tags written as `[[note#tag]]` or `[[#tag]]`, in document order.
pub fn parse_wikilink_tags(content: &str) -> Vec<WikiLinkTag> {
    let mut tags = Vec::new();

    for (line_no, line, masked) in scannable_lines(content) {
        if !masked.contains("[[") {
            continue;
        }
        for cap in WIKILINK_TAG.captures_iter(&masked) {
            let (Some(full), Some(body)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            tags.push(WikiLinkTag {
                tag: format!("#{}", body.as_str()),
                line: line_no,
                column: char_column(&masked, full.start()),
                context: line.trim().to_string(),
            });
        }
    }

    tags
}

/// Parse all wikilinks, embeds and Markdown links, skipping code.
pub fn parse_all_links(content: &str) -> Vec<Link> {
    let mut links = Vec::new();

    for (line_no, _, masked) in scannable_lines(content) {
        let mut wiki_spans = Vec::new();

        for cap in WIKILINK.captures_iter(&masked) {
            let Some(full) = cap.get(0) else {
                continue;
            };
            wiki_spans.push((full.start(), full.end()));

            let is_embed = cap.get(1).is_some_and(|m| !m.as_str().is_empty());
            let heading = cap.get(3).map(|m| m.as_str().to_string());
            let alias = cap.get(4).map(|m| m.as_str().to_string());

            let link_type = if is_embed {
                LinkType::Embed
            } else if alias.is_some() {
                LinkType::AliasedWikiLink
            } else if heading.is_some() {
                LinkType::HeadingWikiLink
            } else {
                LinkType::WikiLink
            };

            links.push(Link {
                link_type,
                target: cap.get(2).map_or("", |m| m.as_str()).trim().to_string(),
                heading,
                alias,
                line: line_no,
                column: char_column(&masked, full.start()),
            });
        }

        for cap in MARKDOWN_LINK.captures_iter(&masked) {
            let (Some(full), Some(target)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            if wiki_spans
                .iter()
                .any(|&(start, end)| full.start() < end && full.end() > start)
            {
                continue;
            }
            links.push(Link {
                link_type: LinkType::MarkdownLink,
                target: target.as_str().to_string(),
                heading: None,
                alias: None,
                line: line_no,
                column: char_column(&masked, full.start()),
            });
        }
    }

    links.sort_by_key(|l| (l.line, l.column));
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wikilink_tag() {
        let tags = parse_wikilink_tags("See [[Note#project/active]] and [[#d]].");
        let names: Vec<_> = tags.iter().map(|t| t.tag.as_str()).collect();
        assert_eq!(names, vec!["#project/active", "#d"]);
        assert_eq!(tags[0].line, 1);
        assert_eq!(tags[0].column, 5);
        assert_eq!(tags[1].column, 33);
    }

    #[test]
    fn test_heading_with_spaces_not_a_tag() {
        assert!(parse_wikilink_tags("[[Note#My Heading]]").is_empty());
    }

    #[test]
    fn test_aliased_heading_not_a_tag() {
        assert!(parse_wikilink_tags("[[Note#tag|alias]]").is_empty());
    }

    #[test]
    fn test_wikilink_tag_in_code_skipped() {
        let content = "[[#real]]\n```\n[[#fake]]\n```\n`[[#inline]]`";
        let tags = parse_wikilink_tags(content);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].tag, "#real");
    }

    #[test]
    fn test_simple_link() {
        let links = parse_all_links("See [[My Note]] for details.");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, "My Note");
        assert_eq!(links[0].link_type, LinkType::WikiLink);
        assert_eq!(links[0].column, 5);
    }

    #[test]
    fn test_link_kinds() {
        let content = "[[A|alias]] [[B#Section]] ![[c.png]] [text](d.md) [[E]]";
        let kinds: Vec<_> = parse_all_links(content)
            .into_iter()
            .map(|l| (l.link_type, l.target))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (LinkType::AliasedWikiLink, "A".to_string()),
                (LinkType::HeadingWikiLink, "B".to_string()),
                (LinkType::Embed, "c.png".to_string()),
                (LinkType::MarkdownLink, "d.md".to_string()),
                (LinkType::WikiLink, "E".to_string()),
            ]
        );
    }

    #[test]
    fn test_link_with_heading_and_alias() {
        let links = parse_all_links("[[Note#Section|alias]]");
        assert_eq!(links[0].heading, Some("Section".to_string()));
        assert_eq!(links[0].alias, Some("alias".to_string()));
        assert_eq!(links[0].link_type, LinkType::AliasedWikiLink);
    }

    #[test]
    fn test_link_in_code_block_skipped() {
        let content = "See [[real link]]\n\n```\n[[fake link]]\n```\n\nMore text";
        let links = parse_all_links(content);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, "real link");
    }

    #[test]
    fn test_link_line_numbers() {
        let content = "Line 1\n[[Link on line 2]]\nLine 3\n[text](line4.md)";
        let links = parse_all_links(content);
        assert_eq!(links[0].line, 2);
        assert_eq!(links[1].line, 4);
    }
}
