//! Applying link updates to one document.

use crate::config::LinkUpdateConfig;
use crate::rewrite::patterns::{CompiledUpdate, Step};
use crate::types::{LinkType, LinkUpdate, TextLocation};
use regex::Captures;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An update whose patterns could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUpdate {
    pub original_target: String,
    pub new_target: String,
    pub error: String,
}

/// Result of rewriting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteOutcome {
    pub content: String,
    /// One entry per substitution made, with its link type and position.
    pub applied: Vec<LinkUpdate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedUpdate>,
}

/// Rewrites links in note text.
#[derive(Debug, Clone, Default)]
pub struct LinkRewriter {
    config: LinkUpdateConfig,
}

impl LinkRewriter {
    pub fn new(config: LinkUpdateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LinkUpdateConfig {
        &self.config
    }

    fn enabled(&self, link_type: LinkType) -> bool {
        match link_type {
            LinkType::WikiLink => self.config.update_wiki_links,
            LinkType::AliasedWikiLink => self.config.update_aliased_links,
            LinkType::HeadingWikiLink => self.config.update_heading_links,
            LinkType::Embed => self.config.update_embedded_files,
            LinkType::MarkdownLink => self.config.update_markdown_links,
        }
    }

    /// Apply updates to a document and return the new text.
    pub fn rewrite(&self, content: &str, updates: &[LinkUpdate]) -> String {
        self.rewrite_with_report(content, updates).content
    }

    /// Apply updates to a document, reporting every substitution.
    ///
    /// Syntaxes are handled in order: plain, aliased and heading wiki-links,
    /// embeds, then Markdown links. Each syntax is one pass over the text, so
    /// a link is rewritten at most once even when one update's new target is
    /// another update's old target.
    pub fn rewrite_with_report(&self, content: &str, updates: &[LinkUpdate]) -> RewriteOutcome {
        let (compiled, failed) = compile(updates);
        let (content, applied) = self.apply(content, &compiled);
        RewriteOutcome {
            content,
            applied,
            failed,
        }
    }

    pub(crate) fn apply(
        &self,
        content: &str,
        compiled: &[CompiledUpdate],
    ) -> (String, Vec<LinkUpdate>) {
        let mut text = content.to_string();
        let mut applied = Vec::new();

        for &link_type in LinkType::all() {
            if !self.enabled(link_type) {
                continue;
            }
            let steps: Vec<(&Step, &LinkUpdate)> = compiled
                .iter()
                .flat_map(|c| {
                    c.steps
                        .iter()
                        .filter(move |s| s.link_type == link_type)
                        .map(move |s| (s, &c.update))
                })
                .collect();
            if let Some(rewritten) = apply_syntax(&text, &steps, &mut applied) {
                text = rewritten;
            }
        }

        (text, applied)
    }
}

/// Compile every non-trivial update.
pub(crate) fn compile(updates: &[LinkUpdate]) -> (Vec<CompiledUpdate>, Vec<FailedUpdate>) {
    let mut compiled = Vec::new();
    let mut failed = Vec::new();

    for update in updates.iter().filter(|u| !u.is_noop()) {
        match CompiledUpdate::new(update.clone()) {
            Ok(c) => compiled.push(c),
            Err(e) => {
                log::warn!(
                    "cannot rewrite links to {}: {}",
                    update.original_target,
                    e
                );
                failed.push(FailedUpdate {
                    original_target: update.original_target.clone(),
                    new_target: update.new_target.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    (compiled, failed)
}

/// A link matched by one step, located in the pass input.
struct Found<'a> {
    start: usize,
    end: usize,
    order: usize,
    original: &'a str,
    replacement: String,
    step: &'a Step,
    update: &'a LinkUpdate,
}

/// Run every step of one syntax against the same input.
///
/// Matches are collected first and spliced into a fresh buffer, so replaced
/// text is never matched again. Where matches overlap, the earliest and then
/// longest wins; equal spans go to the earlier update. Returns `None` when
/// nothing matched.
fn apply_syntax(
    text: &str,
    steps: &[(&Step, &LinkUpdate)],
    applied: &mut Vec<LinkUpdate>,
) -> Option<String> {
    let mut found: Vec<Found> = Vec::new();

    for (order, &(step, update)) in steps.iter().enumerate() {
        if !text.contains(step.old.as_str()) {
            continue;
        }
        for caps in step.regex.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let Some(replacement) = replacement(step.link_type, &caps, &step.new) else {
                continue;
            };
            found.push(Found {
                start: whole.start(),
                end: whole.end(),
                order,
                original: whole.as_str(),
                replacement,
                step,
                update,
            });
        }
    }

    if found.is_empty() {
        return None;
    }
    found.sort_by_key(|f| (f.start, std::cmp::Reverse(f.end), f.order));

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for f in found {
        if f.start < cursor {
            continue;
        }
        out.push_str(&text[cursor..f.start]);
        out.push_str(&f.replacement);
        applied.push(LinkUpdate {
            id: Uuid::new_v4(),
            original_text: f.original.to_string(),
            new_text: f.replacement,
            link_type: f.step.link_type,
            original_target: f.step.old.clone(),
            new_target: f.step.new.clone(),
            location: Some(text_location(text, f.start)),
            reason: f.update.reason,
        });
        cursor = f.end;
    }
    out.push_str(&text[cursor..]);
    Some(out)
}

/// New link text for a match, or `None` to leave it as is.
fn replacement(link_type: LinkType, caps: &Captures, new_target: &str) -> Option<String> {
    let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());

    match link_type {
        // An embed matched by a wiki-link pattern belongs to the embed step
        LinkType::WikiLink | LinkType::AliasedWikiLink | LinkType::HeadingWikiLink
            if !group(1).is_empty() =>
        {
            None
        }
        LinkType::WikiLink => Some(format!("[[{}]]", new_target)),
        LinkType::AliasedWikiLink => Some(format!("[[{}|{}]]", new_target, group(2))),
        LinkType::HeadingWikiLink => {
            Some(format!("[[{}#{}{}]]", new_target, group(2), group(3)))
        }
        LinkType::Embed => Some(format!("![[{}{}]]", new_target, group(1))),
        LinkType::MarkdownLink => Some(format!("[{}]({}{})", group(1), new_target, group(2))),
    }
}

/// Convert a byte offset to a 1-indexed line and character column.
fn text_location(text: &str, byte_offset: usize) -> TextLocation {
    let before = &text[..byte_offset];
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    TextLocation {
        line: before.matches('\n').count() + 1,
        column: before[line_start..].chars().count() + 1,
    }
}
