//! Organizing notes: extract tags, pick a folder, move, fix links.

use crate::config::Config;
use crate::error::{ConflictType, Result, TagsortError};
use crate::extractor::{TagIssue, scan_file};
use crate::mapping::{PathMapper, PathMappingResult};
use crate::progress::{CancellationToken, ProgressEvent};
use crate::rewrite::{LinkRewriter, UpdateResult};
use crate::store::FileStore;
use crate::types::{FileOperation, OperationKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound on numbered names tried by [`ConflictStrategy::Rename`].
const MAX_RENAME_ATTEMPTS: usize = 1000;

/// What to do when a file already exists at the target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictStrategy {
    /// Return the conflict to the caller.
    #[default]
    Abort,
    /// Leave the note where it is.
    Skip,
    /// Move as "name 1.md", "name 2.md", ...
    Rename,
    /// Delete the existing file first.
    Replace,
    /// Move into a subfolder of the target folder.
    Subfolder(String),
}

/// Why a note was not moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// None of the note's tags resolves to a usable folder.
    NoMapping,
    AlreadyInPlace,
    /// A file exists at the target and the strategy was `Skip`.
    TargetExists,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoMapping => write!(f, "no tag maps to a folder"),
            SkipReason::AlreadyInPlace => write!(f, "already in its folder"),
            SkipReason::TargetExists => write!(f, "a file already exists at the target"),
        }
    }
}

/// Where a note would go, without touching anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationPlan {
    pub source: PathBuf,
    pub tags: Vec<String>,
    /// Usable folders, best first.
    pub candidates: Vec<PathMappingResult>,
    /// Full path of the note in the best folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<TagIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum OrganizeOutcome {
    Moved { target: PathBuf },
    Skipped { reason: SkipReason },
}

/// Result of organizing one note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizeReport {
    pub source: PathBuf,
    pub outcome: OrganizeOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<FileOperation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<UpdateResult>,
}

/// A note in a batch that could not be organized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub code: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub reports: Vec<OrganizeReport>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn moved(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, OrganizeOutcome::Moved { .. }))
            .count()
    }
}

/// Runs the organize pipeline over a file store.
pub struct OrganizationCoordinator<S: FileStore> {
    store: S,
    mapper: Arc<PathMapper>,
    config: Config,
    rewriter: LinkRewriter,
}

impl<S: FileStore> OrganizationCoordinator<S> {
    pub fn new(store: S, mapper: Arc<PathMapper>, config: Config) -> Self {
        let rewriter = LinkRewriter::new(config.links);
        Self {
            store,
            mapper,
            config,
            rewriter,
        }
    }

    /// A coordinator with a mapper built from the configured mappings.
    pub fn from_config(store: S, config: Config) -> Self {
        let mapper = Arc::new(PathMapper::from_config(&config));
        Self::new(store, mapper, config)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Work out where a note belongs.
    pub fn plan(&self, path: &Path) -> Result<OrganizationPlan> {
        let extraction = scan_file(&self.store, path, &self.config.extraction)?;
        let candidates = self
            .mapper
            .resolve_all(&extraction.tags, &self.config.prioritization);

        let file_name = path.file_name().ok_or_else(|| TagsortError::Validation {
            subject: "note path".to_string(),
            message: format!("{} has no file name", path.display()),
        })?;
        let target = candidates.first().map(|c| c.path.join(file_name));

        Ok(OrganizationPlan {
            source: path.to_path_buf(),
            tags: extraction.tags,
            candidates,
            target,
            issues: extraction.issues,
        })
    }

    /// Move a note to the folder for its tags and fix links to it.
    pub fn organize(&self, path: &Path, strategy: &ConflictStrategy) -> Result<OrganizeReport> {
        self.organize_note(path, strategy, &CancellationToken::new(), &mut |_| {})
    }

    /// Organize notes one at a time.
    ///
    /// A note that fails is recorded and the batch carries on. Cancellation is
    /// checked before each note and returns `Cancelled`; notes already moved
    /// stay moved.
    pub fn organize_batch(
        &self,
        paths: &[PathBuf],
        strategy: &ConflictStrategy,
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(&ProgressEvent),
    ) -> Result<BatchReport> {
        let mut batch = BatchReport::default();
        let total = paths.len();

        for (index, path) in paths.iter().enumerate() {
            if cancel.is_cancelled() {
                let completed = batch.moved();
                log::info!("organizing cancelled after {} note(s)", completed);
                on_progress(&ProgressEvent::Cancelled { completed });
                return Err(TagsortError::Cancelled { completed });
            }

            on_progress(&ProgressEvent::NoteStarted {
                path: path.clone(),
                index: index + 1,
                total,
            });

            match self.organize_note(path, strategy, cancel, &mut on_progress) {
                Ok(report) => batch.reports.push(report),
                Err(TagsortError::Cancelled { .. }) => {
                    // Only link updates cancel, and they run after the move
                    let completed = batch.moved() + 1;
                    on_progress(&ProgressEvent::Cancelled { completed });
                    return Err(TagsortError::Cancelled { completed });
                }
                Err(e) => {
                    log::warn!("could not organize {}: {}", path.display(), e);
                    on_progress(&ProgressEvent::NoteFailed {
                        path: path.clone(),
                        error: e.user_message(),
                    });
                    batch.failures.push(BatchFailure {
                        path: path.clone(),
                        code: e.code().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        on_progress(&ProgressEvent::Finished {
            completed: batch.moved(),
            total,
        });
        Ok(batch)
    }

    fn organize_note(
        &self,
        path: &Path,
        strategy: &ConflictStrategy,
        cancel: &CancellationToken,
        on_progress: &mut dyn FnMut(&ProgressEvent),
    ) -> Result<OrganizeReport> {
        let started = Instant::now();
        let plan = self.plan(path)?;

        let mut skipped = |reason: SkipReason, operation: Option<FileOperation>| {
            log::debug!("skipping {}: {}", path.display(), reason);
            on_progress(&ProgressEvent::NoteSkipped {
                path: path.to_path_buf(),
                reason: reason.to_string(),
            });
            OrganizeReport {
                source: path.to_path_buf(),
                outcome: OrganizeOutcome::Skipped { reason },
                operation,
                links: None,
            }
        };

        let Some(target) = plan.target else {
            return Ok(skipped(SkipReason::NoMapping, None));
        };
        if target == path {
            return Ok(skipped(SkipReason::AlreadyInPlace, None));
        }

        let mut operation = FileOperation::new(OperationKind::Move, path, &target, plan.tags);
        operation.start()?;

        let target = match self.resolve_conflict(path, &target, strategy) {
            Ok(Some(target)) => target,
            Ok(None) => {
                operation.cancel()?;
                return Ok(skipped(SkipReason::TargetExists, Some(operation)));
            }
            Err(e) => {
                operation.fail(&e)?;
                return Err(e);
            }
        };
        operation.target = target.clone();

        if let Err(e) = self.store.rename(path, &target) {
            operation.fail(&e)?;
            return Err(e);
        }
        operation.complete()?;
        log::info!("moved {} -> {}", path.display(), target.display());
        on_progress(&ProgressEvent::NoteMoved {
            from: path.to_path_buf(),
            to: target.clone(),
        });

        let mappings = BTreeMap::from([(path.to_path_buf(), target.clone())]);
        let links = self
            .rewriter
            .update_links_with(&mappings, &self.store, cancel, &mut *on_progress)?;

        let timeout = Duration::from_secs(self.config.operation_timeout_secs);
        if started.elapsed() > timeout {
            log::warn!(
                "organizing {} took {:?}, over the {:?} budget",
                path.display(),
                started.elapsed(),
                timeout
            );
        }

        Ok(OrganizeReport {
            source: path.to_path_buf(),
            outcome: OrganizeOutcome::Moved { target },
            operation: Some(operation),
            links: Some(links),
        })
    }

    /// Final target for a move, or `None` to skip the note.
    fn resolve_conflict(
        &self,
        source: &Path,
        target: &Path,
        strategy: &ConflictStrategy,
    ) -> Result<Option<PathBuf>> {
        if !self.store.exists(target) {
            return Ok(Some(target.to_path_buf()));
        }

        let conflict = || TagsortError::FileConflict {
            kind: OperationKind::Move,
            conflict: ConflictType::AlreadyExists,
            source_path: source.to_path_buf(),
            target: target.to_path_buf(),
        };

        match strategy {
            ConflictStrategy::Abort => Err(conflict()),
            ConflictStrategy::Skip => Ok(None),
            ConflictStrategy::Rename => (1..=MAX_RENAME_ATTEMPTS)
                .map(|n| numbered(target, n))
                .find(|candidate| !self.store.exists(candidate))
                .map(Some)
                .ok_or_else(conflict),
            ConflictStrategy::Replace => {
                log::info!("replacing {}", target.display());
                self.store.remove(target)?;
                Ok(Some(target.to_path_buf()))
            }
            ConflictStrategy::Subfolder(name) => {
                let folder = target.parent().unwrap_or(Path::new("")).join(name);
                let Some(file_name) = target.file_name() else {
                    return Err(conflict());
                };
                let candidate = folder.join(file_name);
                if self.store.exists(&candidate) {
                    return Err(TagsortError::FileConflict {
                        kind: OperationKind::Move,
                        conflict: ConflictType::AlreadyExists,
                        source_path: source.to_path_buf(),
                        target: candidate,
                    });
                }
                Ok(Some(candidate))
            }
        }
    }
}

/// "dir/name.md" -> "dir/name 2.md"
fn numbered(path: &Path, n: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{} {}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{} {}", stem, n),
    };
    path.with_file_name(name)
}
