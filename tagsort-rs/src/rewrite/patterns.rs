//! Link targets and the per-syntax patterns used to rewrite them.

use crate::error::Result;
use crate::types::{LinkType, LinkUpdate, UpdateReason};
use regex::Regex;
use std::path::{Component, Path};

/// Vault path as written inside a link: `/`-separated, optionally without `.md`.
pub fn link_target(path: &Path, keep_extension: bool) -> String {
    let mut parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if !keep_extension {
        if let Some(last) = parts.last_mut() {
            if let Some(stem) = last.strip_suffix(".md") {
                *last = stem.to_string();
            }
        }
    }

    parts.join("/")
}

/// Percent-encode each path segment, keeping the `/` separators.
///
/// e.g., "My Notes/a b.md" -> "My%20Notes/a%20b.md"
pub fn encode_target(target: &str) -> String {
    target
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Updates needed once the file at `old` lives at `new`.
///
/// Links may name the vault path with or without `.md`, or just the note
/// name; the note name only changes when the file itself was renamed.
pub fn link_updates_for_move(old: &Path, new: &Path) -> Vec<LinkUpdate> {
    let renamed = old.file_name() != new.file_name();
    let reason = if old.parent() == new.parent() {
        UpdateReason::FileRenamed
    } else {
        UpdateReason::FileMoved
    };

    let mut pairs = vec![
        (link_target(old, true), link_target(new, true)),
        (link_target(old, false), link_target(new, false)),
    ];
    if renamed {
        let name = |p: &Path| link_target(Path::new(p.file_name().unwrap_or_default()), false);
        pairs.push((name(old), name(new)));
    }

    let mut updates: Vec<LinkUpdate> = Vec::new();
    for (from, to) in pairs {
        if from.is_empty() || from == to || updates.iter().any(|u| u.original_target == from) {
            continue;
        }
        updates.push(LinkUpdate::retarget(from, to, reason));
    }
    updates
}

/// One compiled syntax pattern for an update.
#[derive(Debug)]
pub(crate) struct Step {
    pub link_type: LinkType,
    pub regex: Regex,
    /// Target the pattern matches, and the target it is replaced with.
    pub old: String,
    pub new: String,
}

/// All patterns for one update, in application order.
#[derive(Debug)]
pub(crate) struct CompiledUpdate {
    pub update: LinkUpdate,
    pub steps: Vec<Step>,
}

impl CompiledUpdate {
    pub fn new(update: LinkUpdate) -> Result<Self> {
        let old = update.original_target.as_str();
        let new = update.new_target.as_str();
        let mut steps = Vec::with_capacity(6);

        for &link_type in LinkType::all() {
            steps.push(step(link_type, old, new)?);
        }

        // Markdown links usually carry the percent-encoded path
        let encoded_old = encode_target(old);
        if encoded_old != old {
            steps.push(step(LinkType::MarkdownLink, &encoded_old, &encode_target(new))?);
        }

        Ok(Self { update, steps })
    }

    /// Whether the text could contain a link this update rewrites.
    pub fn may_match(&self, content: &str) -> bool {
        self.steps.iter().any(|s| content.contains(s.old.as_str()))
    }
}

fn step(link_type: LinkType, old: &str, new: &str) -> Result<Step> {
    let escaped = regex::escape(old);

    // Wiki-link patterns capture an optional leading ! so embeds can be
    // recognized and left alone; the regex crate has no lookbehind.
    let pattern = match link_type {
        LinkType::WikiLink => format!(r"(!?)\[\[{}\]\]", escaped),
        LinkType::AliasedWikiLink => format!(r"(!?)\[\[{}\|([^\]\n]*)\]\]", escaped),
        LinkType::HeadingWikiLink => {
            format!(r"(!?)\[\[{}#([^\]\|\n]*)((?:\|[^\]\n]*)?)\]\]", escaped)
        }
        LinkType::Embed => format!(r"!\[\[{}((?:[#|][^\]\n]*)?)\]\]", escaped),
        LinkType::MarkdownLink => {
            format!(r"\[([^\]\n]*)\]\({}((?:#[^)\s]*)?)\)", escaped)
        }
    };

    Ok(Step {
        link_type,
        regex: Regex::new(&pattern)?,
        old: old.to_string(),
        new: new.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(updates: &[LinkUpdate]) -> Vec<(&str, &str)> {
        updates
            .iter()
            .map(|u| (u.original_target.as_str(), u.new_target.as_str()))
            .collect()
    }

    #[test]
    fn test_link_target() {
        let path = Path::new("Projects/Active/plan.md");
        assert_eq!(link_target(path, true), "Projects/Active/plan.md");
        assert_eq!(link_target(path, false), "Projects/Active/plan");
        assert_eq!(link_target(Path::new("img.png"), false), "img.png");
    }

    #[test]
    fn test_encode_target() {
        assert_eq!(encode_target("My Notes/a b.md"), "My%20Notes/a%20b.md");
        assert_eq!(encode_target("plain/path.md"), "plain/path.md");
    }

    #[test]
    fn test_updates_for_move_keeps_name() {
        let updates = link_updates_for_move(Path::new("Inbox/idea.md"), Path::new("Projects/idea.md"));
        assert_eq!(
            targets(&updates),
            vec![
                ("Inbox/idea.md", "Projects/idea.md"),
                ("Inbox/idea", "Projects/idea"),
            ]
        );
        assert!(updates.iter().all(|u| u.reason == UpdateReason::FileMoved));
    }

    #[test]
    fn test_updates_for_rename() {
        let updates = link_updates_for_move(Path::new("old-note.md"), Path::new("new-note.md"));
        assert_eq!(
            targets(&updates),
            vec![
                ("old-note.md", "new-note.md"),
                ("old-note", "new-note"),
            ]
        );
        assert!(updates.iter().all(|u| u.reason == UpdateReason::FileRenamed));
    }

    #[test]
    fn test_updates_for_move_and_rename() {
        let updates = link_updates_for_move(Path::new("a/x.md"), Path::new("b/y.md"));
        assert_eq!(
            targets(&updates),
            vec![("a/x.md", "b/y.md"), ("a/x", "b/y"), ("x", "y")]
        );
    }

    #[test]
    fn test_compiled_update_includes_encoded_step() {
        let update = LinkUpdate::retarget("My Note.md", "Archive/My Note.md", UpdateReason::FileMoved);
        let compiled = CompiledUpdate::new(update).unwrap();
        assert_eq!(compiled.steps.len(), 6);
        assert!(compiled.may_match("see [x](My%20Note.md)"));
        assert!(!compiled.may_match("nothing here"));
    }
}
