//! Link rewriting after notes move.
//!
//! Rewriting is textual: each link syntax has its own pattern and the old
//! target is matched literally. Markdown is never parsed into a tree.

mod batch;
pub mod patterns;
mod rewriter;

pub use batch::{
    FileUpdateSummary, RiskAssessment, RiskLevel, UnprocessableFile, UpdatePreview,
    UpdateResult, UpdateStatistics,
};
pub use patterns::{encode_target, link_target, link_updates_for_move};
pub use rewriter::{FailedUpdate, LinkRewriter, RewriteOutcome};
