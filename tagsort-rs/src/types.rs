//! Shared types for tagsort.

use crate::error::{Result, TagsortError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Where an extracted tag was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagSource {
    Frontmatter,
    Hashtag,
    WikiLink,
}

impl TagSource {
    /// Confidence assigned to detections from this source.
    pub fn confidence(self) -> f32 {
        match self {
            TagSource::Frontmatter => 0.95,
            TagSource::Hashtag => 0.90,
            TagSource::WikiLink => 0.85,
        }
    }
}

/// A single tag detection inside a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagLocation {
    /// The normalized tag (e.g., "#project/active").
    pub tag: String,

    /// Line number (1-indexed).
    pub line: usize,

    /// Column in characters (1-indexed).
    pub column: usize,

    pub source: TagSource,

    pub confidence: f32,

    /// The trimmed text of the line the tag was attributed to.
    pub context: String,
}

/// Returns the tag without the leading #.
pub fn tag_body(tag: &str) -> &str {
    tag.strip_prefix('#').unwrap_or(tag)
}

/// Number of hierarchy levels in a tag.
/// e.g., "#a" -> 1, "#a/b/c" -> 3, "#" -> 0
pub fn tag_depth(tag: &str) -> usize {
    let body = tag_body(tag);
    if body.is_empty() {
        0
    } else {
        body.split('/').count()
    }
}

/// Returns all ancestor tags, nearest first.
/// e.g., "#a/b/c" -> ["#a/b", "#a"]
pub fn tag_ancestors(tag: &str) -> Vec<String> {
    let body = tag_body(tag);
    let mut ancestors = Vec::new();
    let mut end = body.len();

    while let Some(idx) = body[..end].rfind('/') {
        ancestors.push(format!("#{}", &body[..idx]));
        end = idx;
    }

    ancestors
}

/// Link syntax recognized by the rewriter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkType {
    /// `[[target]]`
    WikiLink,
    /// `[[target|alias]]`
    AliasedWikiLink,
    /// `[[target#heading]]`
    HeadingWikiLink,
    /// `![[target]]`
    Embed,
    /// `[text](target)`
    MarkdownLink,
}

impl LinkType {
    /// All link types, in rewrite order.
    pub fn all() -> &'static [LinkType] {
        &[
            LinkType::WikiLink,
            LinkType::AliasedWikiLink,
            LinkType::HeadingWikiLink,
            LinkType::Embed,
            LinkType::MarkdownLink,
        ]
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkType::WikiLink => write!(f, "wiki-link"),
            LinkType::AliasedWikiLink => write!(f, "aliased-wiki-link"),
            LinkType::HeadingWikiLink => write!(f, "heading-wiki-link"),
            LinkType::Embed => write!(f, "embed"),
            LinkType::MarkdownLink => write!(f, "markdown-link"),
        }
    }
}

/// Why a link is being rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateReason {
    FileMoved,
    FileRenamed,
    PathNormalization,
    AliasUpdate,
}

/// Position of a substitution in the text it was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextLocation {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column in characters (1-indexed).
    pub column: usize,
}

/// One planned or applied link substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkUpdate {
    pub id: Uuid,

    /// The full link text before the change (e.g., "[[old|alias]]").
    pub original_text: String,

    /// The full link text after the change.
    pub new_text: String,

    pub link_type: LinkType,

    pub original_target: String,

    pub new_target: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<TextLocation>,

    pub reason: UpdateReason,
}

impl LinkUpdate {
    /// A planned retarget of every link pointing at `original_target`.
    pub fn retarget(
        original_target: impl Into<String>,
        new_target: impl Into<String>,
        reason: UpdateReason,
    ) -> Self {
        let original_target = original_target.into();
        let new_target = new_target.into();
        Self {
            id: Uuid::new_v4(),
            original_text: format!("[[{}]]", original_target),
            new_text: format!("[[{}]]", new_target),
            link_type: LinkType::WikiLink,
            original_target,
            new_target,
            location: None,
            reason,
        }
    }

    /// Whether applying this update could change any text.
    pub fn is_noop(&self) -> bool {
        self.original_target.is_empty() || self.original_target == self.new_target
    }
}

/// Kind of file operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Move,
    Copy,
    Rename,
    CreateFolder,
}

impl OperationKind {
    /// Lowercase verb for messages.
    pub fn verb(self) -> &'static str {
        match self {
            OperationKind::Move => "move",
            OperationKind::Copy => "copy",
            OperationKind::Rename => "rename",
            OperationKind::CreateFolder => "create folder",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.verb())
    }
}

/// Lifecycle state of a file operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl OperationStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationStatus::Completed | OperationStatus::Failed | OperationStatus::Cancelled
        )
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: OperationStatus) -> bool {
        use OperationStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (InProgress, Cancelled)
        )
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Pending => write!(f, "pending"),
            OperationStatus::InProgress => write!(f, "in-progress"),
            OperationStatus::Completed => write!(f, "completed"),
            OperationStatus::Failed => write!(f, "failed"),
            OperationStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A tracked file operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOperation {
    pub id: Uuid,

    pub kind: OperationKind,

    pub source: PathBuf,

    pub target: PathBuf,

    pub status: OperationStatus,

    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Tags that caused this operation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub associated_tags: Vec<String>,
}

impl FileOperation {
    /// Create a pending operation.
    pub fn new(
        kind: OperationKind,
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        associated_tags: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            source: source.into(),
            target: target.into(),
            status: OperationStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            error: None,
            associated_tags,
        }
    }

    /// Move to the next state, rejecting illegal transitions.
    pub fn transition(&mut self, next: OperationStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(TagsortError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.transition(OperationStatus::InProgress)
    }

    pub fn complete(&mut self) -> Result<()> {
        self.transition(OperationStatus::Completed)
    }

    /// Mark failed and keep the error text.
    pub fn fail(&mut self, error: &TagsortError) -> Result<()> {
        self.transition(OperationStatus::Failed)?;
        self.error = Some(error.to_string());
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.transition(OperationStatus::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_depth() {
        assert_eq!(tag_depth("#"), 0);
        assert_eq!(tag_depth("#rust"), 1);
        assert_eq!(tag_depth("#a/b/c"), 3);
    }

    #[test]
    fn test_tag_ancestors() {
        assert_eq!(tag_ancestors("#a/b/c"), vec!["#a/b", "#a"]);
        assert!(tag_ancestors("#rust").is_empty());
    }

    #[test]
    fn test_operation_lifecycle() {
        let mut op = FileOperation::new(OperationKind::Move, "a.md", "x/a.md", vec!["#x".into()]);
        assert_eq!(op.status, OperationStatus::Pending);

        op.start().unwrap();
        op.complete().unwrap();
        assert_eq!(op.status, OperationStatus::Completed);
        assert!(op.completed_at.is_some());
    }

    #[test]
    fn test_operation_never_returns_to_pending() {
        let mut op = FileOperation::new(OperationKind::Move, "a.md", "x/a.md", vec![]);
        op.start().unwrap();

        let result = op.transition(OperationStatus::Pending);
        assert!(matches!(result, Err(TagsortError::InvalidTransition { .. })));
        assert_eq!(op.status, OperationStatus::InProgress);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut op = FileOperation::new(OperationKind::Rename, "a.md", "b.md", vec![]);
        op.start().unwrap();
        op.fail(&TagsortError::NotFound(PathBuf::from("a.md"))).unwrap();

        assert!(op.error.as_deref().unwrap().contains("a.md"));
        assert!(op.complete().is_err());
        assert!(op.cancel().is_err());
    }

    #[test]
    fn test_cancel_before_start() {
        let mut op = FileOperation::new(OperationKind::CreateFolder, "", "x", vec![]);
        op.cancel().unwrap();
        assert_eq!(op.status, OperationStatus::Cancelled);
    }

    #[test]
    fn test_retarget_update() {
        let update = LinkUpdate::retarget("old", "new", UpdateReason::FileMoved);
        assert_eq!(update.original_text, "[[old]]");
        assert_eq!(update.new_text, "[[new]]");
        assert!(!update.is_noop());
        assert!(LinkUpdate::retarget("same", "same", UpdateReason::FileMoved).is_noop());
    }
}
