//! Tag extraction: frontmatter, inline hashtags and wikilink tags.

use crate::config::TagExtractionConfig;
use crate::error::{Result, TagsortError};
use crate::parser::tag::{TagIssueKind, locate_first, root_tag};
use crate::parser::{
    normalize_tag, parse_frontmatter_tags, parse_hashtags, parse_wikilink_tags,
    split_frontmatter, validate_tag,
};
use crate::store::{FileStore, is_markdown};
use crate::types::{TagLocation, TagSource};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// A raw tag that was dropped because it breaks the tag rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagIssue {
    /// The text as found in the note.
    pub raw: String,
    /// The text after normalization.
    pub tag: String,
    pub source: TagSource,
    pub reason: TagIssueKind,
}

/// Tags found in one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Unique normalized tags in first-seen order.
    pub tags: Vec<String>,
    /// One entry per source that detected a tag.
    pub locations: Vec<TagLocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<TagIssue>,
}

impl ExtractionResult {
    /// Locations reported by one source.
    pub fn locations_from(&self, source: TagSource) -> impl Iterator<Item = &TagLocation> {
        self.locations.iter().filter(move |l| l.source == source)
    }
}

struct Collector<'a> {
    config: &'a TagExtractionConfig,
    seen: HashSet<String>,
    result: ExtractionResult,
}

impl<'a> Collector<'a> {
    fn new(config: &'a TagExtractionConfig) -> Self {
        Self {
            config,
            seen: HashSet::new(),
            result: ExtractionResult::default(),
        }
    }

    /// Normalize and validate a raw tag; invalid tags become issues.
    fn prepare(&mut self, raw: &str, source: TagSource) -> Option<String> {
        let mut tag = normalize_tag(raw);
        if !self.config.support_tag_hierarchies {
            tag = root_tag(&tag);
        }

        match validate_tag(&tag) {
            Ok(()) => Some(tag),
            Err(reason) => {
                log::debug!("rejecting {} tag {:?}: {}", kebab(source), raw, reason);
                self.result.issues.push(TagIssue {
                    raw: raw.to_string(),
                    tag,
                    source,
                    reason,
                });
                None
            }
        }
    }

    fn record(&mut self, tag: String, line: usize, column: usize, source: TagSource, context: String) {
        self.result.locations.push(TagLocation {
            tag: tag.clone(),
            line,
            column,
            source,
            confidence: source.confidence(),
            context,
        });
        if self.seen.insert(tag.clone()) {
            self.result.tags.push(tag);
        }
    }
}

fn kebab(source: TagSource) -> &'static str {
    match source {
        TagSource::Frontmatter => "frontmatter",
        TagSource::Hashtag => "hashtag",
        TagSource::WikiLink => "wiki-link",
    }
}

/// Extract tags from a note.
///
/// Frontmatter tags come first, then inline hashtags, then wikilink tags.
/// Malformed input never fails; it just yields fewer tags.
pub fn extract(content: &str, config: &TagExtractionConfig) -> ExtractionResult {
    let split = split_frontmatter(content);
    let line_offset = split.body_start_line - 1;
    let mut collector = Collector::new(config);

    if config.extract_from_frontmatter {
        if let Some(yaml) = split.yaml {
            let mut phase_seen = HashSet::new();
            for fm_tag in parse_frontmatter_tags(yaml) {
                let Some(tag) = collector.prepare(&fm_tag.raw, TagSource::Frontmatter) else {
                    continue;
                };
                if phase_seen.insert(tag.clone()) {
                    collector.record(tag, 1, 1, TagSource::Frontmatter, fm_tag.context);
                }
            }
        }
    }

    if config.extract_from_hashtags {
        let mut phase_seen = HashSet::new();
        for raw in parse_hashtags(split.body) {
            let Some(tag) = collector.prepare(&raw, TagSource::Hashtag) else {
                continue;
            };
            if !phase_seen.insert(tag.clone()) {
                continue;
            }
            // Attributed to the first occurrence of the text anywhere in the
            // body, so repeated tags all point at the same line.
            let (line, column, context) = locate_first(split.body, &tag)
                .unwrap_or((1, 1, String::new()));
            collector.record(tag, line + line_offset, column, TagSource::Hashtag, context);
        }
    }

    if config.extract_from_wiki_links {
        let mut phase_seen = HashSet::new();
        for link_tag in parse_wikilink_tags(split.body) {
            let Some(tag) = collector.prepare(&link_tag.tag, TagSource::WikiLink) else {
                continue;
            };
            if phase_seen.insert(tag.clone()) {
                collector.record(
                    tag,
                    link_tag.line + line_offset,
                    link_tag.column,
                    TagSource::WikiLink,
                    link_tag.context,
                );
            }
        }
    }

    collector.result
}

/// Read a note through the store and extract its tags.
pub fn scan_file(
    store: &dyn FileStore,
    path: &Path,
    config: &TagExtractionConfig,
) -> Result<ExtractionResult> {
    let content = store
        .read(path)
        .map_err(|e| TagsortError::scan(path, e))?;
    let result = extract(&content, config);
    log::debug!("{}: {} tag(s)", path.display(), result.tags.len());
    Ok(result)
}

/// Tags of every note in a vault.
#[derive(Debug, Default)]
pub struct VaultScan {
    pub notes: BTreeMap<PathBuf, ExtractionResult>,
    /// Notes that could not be read; the scan carries on without them.
    pub errors: Vec<TagsortError>,
}

impl VaultScan {
    /// Number of notes carrying each tag.
    pub fn tag_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for result in self.notes.values() {
            for tag in &result.tags {
                *counts.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Notes carrying a given tag.
    pub fn notes_with_tag(&self, tag: &str) -> Vec<&Path> {
        self.notes
            .iter()
            .filter(|(_, r)| r.tags.iter().any(|t| t == tag))
            .map(|(p, _)| p.as_path())
            .collect()
    }
}

/// Extract tags from every Markdown note in the store.
pub fn scan_vault(store: &dyn FileStore, config: &TagExtractionConfig) -> Result<VaultScan> {
    let mut scan = VaultScan::default();

    for path in store.list_files()? {
        if !is_markdown(&path) {
            continue;
        }
        match scan_file(store, &path, config) {
            Ok(result) => {
                scan.notes.insert(path, result);
            }
            Err(e) => {
                log::warn!("{}", e);
                scan.errors.push(e);
            }
        }
    }

    log::info!(
        "scanned {} note(s), {} failed",
        scan.notes.len(),
        scan.errors.len()
    );
    Ok(scan)
}
