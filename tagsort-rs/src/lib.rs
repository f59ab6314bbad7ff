//! Tagsort - files Obsidian-style notes into folders by tag and keeps links intact.
//!
//! # Overview
//!
//! Tagsort reads a note's tags, picks a folder for them, moves the note and
//! rewrites every link in the vault that pointed at its old location:
//! - Tag extraction from frontmatter, inline `#hashtags` and `[[note#tag]]` links
//! - A prioritized tag to folder mapping table with path validation
//! - Link rewriting across wiki-links, aliases, headings, embeds and Markdown links
//! - Conflict handling, cancellation and progress events for batches
//!
//! The file system is reached only through the [`FileStore`] trait.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use tagsort::{Config, ConflictStrategy, FsStore, OrganizationCoordinator};
//!
//! let store = FsStore::new("/path/to/vault").unwrap();
//! let config = Config::load_default().unwrap();
//! let coordinator = OrganizationCoordinator::from_config(store, config);
//!
//! let plan = coordinator.plan(Path::new("Inbox/idea.md")).unwrap();
//! println!("Tags: {:?} -> {:?}", plan.tags, plan.target);
//!
//! coordinator
//!     .organize(Path::new("Inbox/idea.md"), &ConflictStrategy::Rename)
//!     .unwrap();
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod extractor;
pub mod mapping;
pub mod parser;
pub mod progress;
pub mod rewrite;
pub mod store;
pub mod types;

// Re-export main types at crate root
pub use config::{Config, LinkUpdateConfig, PrioritizationOptions, TagExtractionConfig};
pub use coordinator::{ConflictStrategy, OrganizationCoordinator, OrganizationPlan, OrganizeReport};
pub use error::{Result, TagsortError};
pub use extractor::{ExtractionResult, TagIssue, extract, scan_file, scan_vault};
pub use mapping::{MappingType, PathMapper, PathMappingResult, TagPathMapping};
pub use progress::{CancellationToken, ProgressEvent};
pub use rewrite::{LinkRewriter, RewriteOutcome, UpdatePreview, UpdateResult};
pub use store::{FileStore, FsStore, MemoryStore};
pub use types::*;
