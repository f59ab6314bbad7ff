//! Rewriting links across a whole vault.

use crate::error::{Result, TagsortError};
use crate::parser::parse_all_links;
use crate::progress::{CancellationToken, ProgressEvent};
use crate::rewrite::patterns::{CompiledUpdate, link_updates_for_move};
use crate::rewrite::rewriter::{LinkRewriter, compile};
use crate::store::{FileStore, is_markdown};
use crate::types::{LinkType, LinkUpdate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// A file that could not be read or written during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnprocessableFile {
    pub path: PathBuf,
    pub error: String,
}

/// Links changed in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpdateSummary {
    pub path: PathBuf,
    /// Links of any kind in the file before rewriting.
    pub links_found: usize,
    pub links_updated: usize,
    pub by_type: BTreeMap<LinkType, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatistics {
    pub by_type: BTreeMap<LinkType, usize>,
    pub processing_time_ms: u64,
    /// Links updated per modified file.
    pub average_links_per_file: f64,
    /// The biggest modified file, by size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub largest_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_common_link_type: Option<LinkType>,
}

/// Outcome of a link update pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateResult {
    /// Links of any kind in the candidate files.
    pub total_links_found: usize,
    pub links_updated: usize,
    pub files_modified: usize,
    pub failed_updates: usize,
    pub unprocessable_files: Vec<UnprocessableFile>,
    pub per_file: Vec<FileUpdateSummary>,
    pub statistics: UpdateStatistics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn for_update_count(updates: usize) -> Self {
        match updates {
            0..=9 => RiskLevel::Low,
            10..=100 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub recommendations: Vec<String>,
}

impl RiskAssessment {
    pub fn for_update_count(updates: usize) -> Self {
        let level = RiskLevel::for_update_count(updates);
        let mut recommendations = Vec::new();
        if level != RiskLevel::Low {
            recommendations.push("Create a backup of the vault before applying.".to_string());
        }
        if level == RiskLevel::High {
            recommendations.push("Split the operation into smaller batches.".to_string());
        }
        Self {
            level,
            recommendations,
        }
    }
}

/// What an update pass would change, computed without writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePreview {
    pub total_updates: usize,
    pub files_to_modify: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unprocessable_files: Vec<UnprocessableFile>,
    pub risk: RiskAssessment,
}

/// Candidate files for a set of updates, with the content read while scanning.
struct CorpusScan {
    candidates: Vec<(PathBuf, String)>,
    unprocessable: Vec<UnprocessableFile>,
}

fn updates_for_mappings(file_mappings: &BTreeMap<PathBuf, PathBuf>) -> Vec<LinkUpdate> {
    file_mappings
        .iter()
        .flat_map(|(old, new)| link_updates_for_move(old, new))
        .collect()
}

fn unprocessable(path: &Path, error: &TagsortError) -> UnprocessableFile {
    log::warn!("skipping {}: {}", path.display(), error);
    UnprocessableFile {
        path: path.to_path_buf(),
        error: error.to_string(),
    }
}

impl LinkRewriter {
    /// Markdown files in the store that mention any of the old targets.
    pub fn find_files_containing_links(
        &self,
        store: &dyn FileStore,
        updates: &[LinkUpdate],
    ) -> Result<Vec<PathBuf>> {
        let (compiled, _) = compile(updates);
        let scan = self.scan_corpus(store, &compiled)?;
        Ok(scan.candidates.into_iter().map(|(path, _)| path).collect())
    }

    fn scan_corpus(&self, store: &dyn FileStore, compiled: &[CompiledUpdate]) -> Result<CorpusScan> {
        let mut scan = CorpusScan {
            candidates: Vec::new(),
            unprocessable: Vec::new(),
        };
        if compiled.is_empty() {
            return Ok(scan);
        }

        for path in store.list_files()? {
            if !is_markdown(&path) {
                continue;
            }
            match store.read(&path) {
                Ok(content) => {
                    if compiled.iter().any(|c| c.may_match(&content)) {
                        scan.candidates.push((path, content));
                    }
                }
                Err(e) => scan.unprocessable.push(unprocessable(&path, &e)),
            }
        }

        log::debug!("{} candidate file(s) for link updates", scan.candidates.len());
        Ok(scan)
    }

    /// Rewrite links to every moved file (old path -> new path) in the store.
    pub fn update_links(
        &self,
        file_mappings: &BTreeMap<PathBuf, PathBuf>,
        store: &dyn FileStore,
    ) -> Result<UpdateResult> {
        self.update_links_with(file_mappings, store, &CancellationToken::new(), |_| {})
    }

    /// Like [`update_links`](Self::update_links), with cancellation and progress.
    ///
    /// Files are processed one at a time and the token is checked before each
    /// one. On cancellation the pass returns `Cancelled`; files already
    /// written stay written.
    pub fn update_links_with(
        &self,
        file_mappings: &BTreeMap<PathBuf, PathBuf>,
        store: &dyn FileStore,
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(&ProgressEvent),
    ) -> Result<UpdateResult> {
        let started = Instant::now();
        let (compiled, failed) = compile(&updates_for_mappings(file_mappings));
        let scan = self.scan_corpus(store, &compiled)?;

        let mut result = UpdateResult {
            failed_updates: failed.len(),
            unprocessable_files: scan.unprocessable,
            ..UpdateResult::default()
        };
        let mut largest: Option<(usize, PathBuf)> = None;
        let total = scan.candidates.len();
        on_progress(&ProgressEvent::LinkScanStarted { total });

        for (index, (path, content)) in scan.candidates.into_iter().enumerate() {
            if cancel.is_cancelled() {
                log::info!("link update cancelled after {} file(s)", result.files_modified);
                on_progress(&ProgressEvent::Cancelled {
                    completed: result.files_modified,
                });
                return Err(TagsortError::Cancelled {
                    completed: result.files_modified,
                });
            }

            let links_found = parse_all_links(&content).len();
            result.total_links_found += links_found;

            let (new_content, applied) = self.apply(&content, &compiled);
            let mut links_updated = 0;

            if new_content != content {
                match store.write(&path, &new_content) {
                    Ok(()) => {
                        let mut by_type = BTreeMap::new();
                        for update in &applied {
                            *by_type.entry(update.link_type).or_insert(0) += 1;
                            *result.statistics.by_type.entry(update.link_type).or_insert(0) += 1;
                        }
                        links_updated = applied.len();
                        result.links_updated += links_updated;
                        result.files_modified += 1;

                        if largest.as_ref().is_none_or(|(size, _)| new_content.len() > *size) {
                            largest = Some((new_content.len(), path.clone()));
                        }

                        log::debug!("{}: {} link(s) updated", path.display(), links_updated);
                        result.per_file.push(FileUpdateSummary {
                            path: path.clone(),
                            links_found,
                            links_updated,
                            by_type,
                        });
                    }
                    Err(e) => {
                        result.failed_updates += applied.len();
                        result.unprocessable_files.push(unprocessable(&path, &e));
                    }
                }
            }

            on_progress(&ProgressEvent::LinksUpdated {
                path,
                index: index + 1,
                total,
                links_updated,
            });
        }

        let stats = &mut result.statistics;
        stats.processing_time_ms = started.elapsed().as_millis() as u64;
        stats.average_links_per_file = if result.files_modified == 0 {
            0.0
        } else {
            result.links_updated as f64 / result.files_modified as f64
        };
        stats.largest_file = largest.map(|(_, path)| path);
        // Ties go to the type applied first
        stats.most_common_link_type = LinkType::all()
            .iter()
            .copied()
            .filter_map(|t| stats.by_type.get(&t).map(|&n| (t, n)))
            .fold(None, |best: Option<(LinkType, usize)>, (t, n)| match best {
                Some((_, m)) if m >= n => best,
                _ => Some((t, n)),
            })
            .map(|(t, _)| t);

        log::info!(
            "updated {} link(s) in {} file(s)",
            result.links_updated,
            result.files_modified
        );
        Ok(result)
    }

    /// Count the changes [`update_links`](Self::update_links) would make,
    /// without writing anything.
    pub fn preview_updates(
        &self,
        file_mappings: &BTreeMap<PathBuf, PathBuf>,
        store: &dyn FileStore,
    ) -> Result<UpdatePreview> {
        let (compiled, _) = compile(&updates_for_mappings(file_mappings));
        let scan = self.scan_corpus(store, &compiled)?;

        let mut total_updates = 0;
        let mut files_to_modify = Vec::new();
        let unprocessable_files = scan.unprocessable;

        for (path, content) in scan.candidates {
            let (new_content, applied) = self.apply(&content, &compiled);
            if new_content != content {
                total_updates += applied.len();
                files_to_modify.push(path);
            }
        }

        Ok(UpdatePreview {
            total_updates,
            files_to_modify,
            unprocessable_files,
            risk: RiskAssessment::for_update_count(total_updates),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkUpdateConfig;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    /// Counts reads so tests can check each file is read once per pass.
    struct CountingStore {
        inner: MemoryStore,
        reads: Cell<usize>,
    }

    impl FileStore for CountingStore {
        fn read(&self, path: &Path) -> Result<String> {
            self.reads.set(self.reads.get() + 1);
            self.inner.read(path)
        }

        fn write(&self, path: &Path, content: &str) -> Result<()> {
            self.inner.write(path, content)
        }

        fn rename(&self, from: &Path, to: &Path) -> Result<()> {
            self.inner.rename(from, to)
        }

        fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path)
        }

        fn list_files(&self) -> Result<Vec<PathBuf>> {
            self.inner.list_files()
        }

        fn remove(&self, path: &Path) -> Result<()> {
            self.inner.remove(path)
        }
    }

    fn moved(old: &str, new: &str) -> BTreeMap<PathBuf, PathBuf> {
        BTreeMap::from([(PathBuf::from(old), PathBuf::from(new))])
    }

    fn vault() -> MemoryStore {
        MemoryStore::with_files([
            ("Projects/idea.md", "# Idea\n"),
            ("a.md", "See [[idea]] and [[Inbox/idea|the idea]].\n[[other]]"),
            ("b.md", "![[Inbox/idea.md]] and [x](Inbox/idea.md#Top)"),
            ("c.md", "Nothing relevant [[other]]"),
            ("d.txt", "[[Inbox/idea]]"),
        ])
    }

    #[test]
    fn test_update_links_across_vault() {
        let store = vault();
        let rewriter = LinkRewriter::default();
        let result = rewriter
            .update_links(&moved("Inbox/idea.md", "Projects/idea.md"), &store)
            .unwrap();

        assert_eq!(
            store.get("a.md").unwrap(),
            "See [[idea]] and [[Projects/idea|the idea]].\n[[other]]"
        );
        assert_eq!(
            store.get("b.md").unwrap(),
            "![[Projects/idea.md]] and [x](Projects/idea.md#Top)"
        );
        assert_eq!(store.get("d.txt").unwrap(), "[[Inbox/idea]]");

        assert_eq!(result.files_modified, 2);
        assert_eq!(result.links_updated, 3);
        assert_eq!(
            result.links_updated,
            result.per_file.iter().map(|f| f.links_updated).sum::<usize>()
        );
        assert_eq!(result.total_links_found, 5);
        assert_eq!(result.failed_updates, 0);
        assert_eq!(result.statistics.by_type.get(&LinkType::Embed), Some(&1));
        assert_eq!(result.statistics.average_links_per_file, 1.5);
        assert_eq!(result.statistics.largest_file, Some(PathBuf::from("a.md")));
        assert_eq!(
            result.statistics.most_common_link_type,
            Some(LinkType::AliasedWikiLink)
        );
    }

    #[test]
    fn test_chained_moves_rewrite_each_link_once() {
        let store = MemoryStore::with_files([
            ("a.md", "# A"),
            ("b.md", "# B"),
            ("hub.md", "[[a]] [[b]]"),
        ]);
        let rewriter = LinkRewriter::default();
        let mappings = BTreeMap::from([
            (PathBuf::from("a.md"), PathBuf::from("b.md")),
            (PathBuf::from("b.md"), PathBuf::from("c.md")),
        ]);

        let result = rewriter.update_links(&mappings, &store).unwrap();

        assert_eq!(store.get("hub.md").unwrap(), "[[b]] [[c]]");
        assert_eq!(result.links_updated, 2);
        assert_eq!(result.files_modified, 1);
        assert!(result.links_updated <= result.total_links_found);
    }

    #[test]
    fn test_swapped_files_swap_links() {
        let store = MemoryStore::with_files([("hub.md", "[[a]] [x](b.md) ![[a#Part]]")]);
        let rewriter = LinkRewriter::default();
        let mappings = BTreeMap::from([
            (PathBuf::from("a.md"), PathBuf::from("b.md")),
            (PathBuf::from("b.md"), PathBuf::from("a.md")),
        ]);

        let result = rewriter.update_links(&mappings, &store).unwrap();

        assert_eq!(store.get("hub.md").unwrap(), "[[b]] [x](a.md) ![[b#Part]]");
        assert_eq!(result.links_updated, 3);
    }

    #[test]
    fn test_each_file_read_once() {
        let store = CountingStore {
            inner: vault(),
            reads: Cell::new(0),
        };
        let rewriter = LinkRewriter::default();
        let mappings = moved("Inbox/idea.md", "Projects/idea.md");

        let result = rewriter.update_links(&mappings, &store).unwrap();
        assert_eq!(result.files_modified, 2);
        assert_eq!(store.reads.get(), 4);

        store.reads.set(0);
        rewriter.preview_updates(&mappings, &store).unwrap();
        assert_eq!(store.reads.get(), 4);
    }

    #[test]
    fn test_candidate_that_does_not_change_is_not_modified() {
        let store = MemoryStore::with_files([("a.md", "mentions Inbox/idea but no link")]);
        let rewriter = LinkRewriter::default();
        let mappings = moved("Inbox/idea.md", "Projects/idea.md");

        let candidates = rewriter
            .find_files_containing_links(&store, &updates_for_mappings(&mappings))
            .unwrap();
        assert_eq!(candidates, vec![PathBuf::from("a.md")]);

        let result = rewriter.update_links(&mappings, &store).unwrap();
        assert_eq!(result.files_modified, 0);
        assert!(result.per_file.is_empty());
    }

    #[test]
    fn test_cancellation_stops_between_files() {
        let store = MemoryStore::with_files([
            ("1.md", "[[old]]"),
            ("2.md", "[[old]]"),
            ("3.md", "[[old]]"),
        ]);
        let rewriter = LinkRewriter::default();
        let cancel = CancellationToken::new();
        let mut events = Vec::new();

        let result = rewriter.update_links_with(&moved("old.md", "new.md"), &store, &cancel, |event| {
            if let ProgressEvent::LinksUpdated { index: 1, .. } = event {
                cancel.cancel();
            }
            events.push(event.clone());
        });

        assert!(matches!(result, Err(TagsortError::Cancelled { completed: 1 })));
        assert_eq!(store.get("1.md").unwrap(), "[[new]]");
        assert_eq!(store.get("2.md").unwrap(), "[[old]]");
        assert_eq!(events.last(), Some(&ProgressEvent::Cancelled { completed: 1 }));
    }

    #[test]
    fn test_embed_toggle_in_batch() {
        let store = MemoryStore::with_files([("a.md", "![[pic.png]] [[pic.png]]")]);
        let rewriter = LinkRewriter::new(LinkUpdateConfig {
            update_embedded_files: false,
            ..LinkUpdateConfig::default()
        });
        rewriter
            .update_links(&moved("pic.png", "assets/pic.png"), &store)
            .unwrap();
        assert_eq!(store.get("a.md").unwrap(), "![[pic.png]] [[assets/pic.png]]");
    }

    #[test]
    fn test_preview_does_not_write() {
        let store = vault();
        let rewriter = LinkRewriter::default();
        let preview = rewriter
            .preview_updates(&moved("Inbox/idea.md", "Projects/idea.md"), &store)
            .unwrap();

        assert_eq!(preview.total_updates, 3);
        assert_eq!(
            preview.files_to_modify,
            vec![PathBuf::from("a.md"), PathBuf::from("b.md")]
        );
        assert_eq!(preview.risk.level, RiskLevel::Low);
        assert!(preview.risk.recommendations.is_empty());
        assert!(store.get("b.md").unwrap().contains("Inbox/idea.md"));
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(RiskLevel::for_update_count(9), RiskLevel::Low);
        assert_eq!(RiskLevel::for_update_count(10), RiskLevel::Medium);
        assert_eq!(RiskLevel::for_update_count(100), RiskLevel::Medium);
        assert_eq!(RiskLevel::for_update_count(101), RiskLevel::High);
        assert_eq!(RiskAssessment::for_update_count(500).recommendations.len(), 2);
    }
}
