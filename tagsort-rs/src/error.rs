//! Error types and stable error codes for tagsort.

use crate::types::{OperationKind, OperationStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Stable machine-readable error codes.
pub mod code {
    pub const SCAN_FAILED: &str = "scan-failed";
    pub const FILE_OPERATION_FAILED: &str = "file-operation-failed";
    pub const FILE_CONFLICT: &str = "file-conflict";
    pub const CANCELLED: &str = "cancelled";
    pub const VALIDATION_FAILED: &str = "validation-failed";
    pub const NOT_FOUND: &str = "not-found";
    pub const INVALID_TRANSITION: &str = "invalid-transition";
    pub const CONFIG_ERROR: &str = "config-error";
    pub const IO_ERROR: &str = "io-error";
    pub const SERIALIZATION_ERROR: &str = "serialization-error";
    pub const PATTERN_ERROR: &str = "pattern-error";
}

/// How bad a scan failure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Why a move or rename could not land on its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictType {
    /// A file already exists at the target path.
    AlreadyExists,
    /// The target path is a directory.
    IsDirectory,
    /// The target cannot be written.
    ReadOnly,
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictType::AlreadyExists => write!(f, "target already exists"),
            ConflictType::IsDirectory => write!(f, "target is a directory"),
            ConflictType::ReadOnly => write!(f, "target is read-only"),
        }
    }
}

/// Main error type for tagsort operations.
#[derive(Error, Debug)]
pub enum TagsortError {
    #[error("Failed to scan {path}: {message}")]
    Scan {
        path: PathBuf,
        message: String,
        severity: Severity,
        recoverable: bool,
    },

    #[error("{kind} failed for {path}: {message}")]
    FileOperation {
        kind: OperationKind,
        path: PathBuf,
        message: String,
    },

    #[error("Cannot {kind} {source_path} to {target}: {conflict}")]
    FileConflict {
        kind: OperationKind,
        conflict: ConflictType,
        source_path: PathBuf,
        target: PathBuf,
    },

    #[error("Operation cancelled after {completed} file(s)")]
    Cancelled { completed: usize },

    #[error("Invalid {subject}: {message}")]
    Validation { subject: String, message: String },

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid operation state change: {from} -> {to}")]
    InvalidTransition {
        from: OperationStatus,
        to: OperationStatus,
    },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),
}

impl TagsortError {
    /// Returns the stable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            TagsortError::Scan { .. } => code::SCAN_FAILED,
            TagsortError::FileOperation { .. } => code::FILE_OPERATION_FAILED,
            TagsortError::FileConflict { .. } => code::FILE_CONFLICT,
            TagsortError::Cancelled { .. } => code::CANCELLED,
            TagsortError::Validation { .. } => code::VALIDATION_FAILED,
            TagsortError::NotFound(_) => code::NOT_FOUND,
            TagsortError::InvalidTransition { .. } => code::INVALID_TRANSITION,
            TagsortError::ConfigError(_) => code::CONFIG_ERROR,
            TagsortError::Io(_) => code::IO_ERROR,
            TagsortError::JsonError(_)
            | TagsortError::TomlParse(_)
            | TagsortError::TomlSerialize(_) => code::SERIALIZATION_ERROR,
            TagsortError::RegexError(_) | TagsortError::GlobPattern(_) => code::PATTERN_ERROR,
        }
    }

    /// Whether the caller may offer a retry.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TagsortError::Scan { recoverable, .. } => *recoverable,
            TagsortError::FileOperation { .. } => true,
            TagsortError::FileConflict { conflict, .. } => *conflict != ConflictType::ReadOnly,
            TagsortError::Cancelled { .. } => true,
            TagsortError::Validation { .. } => true,
            TagsortError::NotFound(_) => false,
            TagsortError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Whether this error belongs to the file-operation family (conflicts included).
    pub fn is_file_operation_error(&self) -> bool {
        matches!(
            self,
            TagsortError::FileOperation { .. } | TagsortError::FileConflict { .. }
        )
    }

    /// Human-readable message suitable for showing to a user.
    pub fn user_message(&self) -> String {
        match self {
            TagsortError::Scan { path, .. } => {
                format!("Could not read tags from \"{}\".", path.display())
            }
            TagsortError::FileOperation { kind, path, .. } => {
                format!("Could not {} \"{}\".", kind.verb(), path.display())
            }
            TagsortError::FileConflict {
                conflict, target, ..
            } => match conflict {
                ConflictType::AlreadyExists => format!(
                    "A file named \"{}\" already exists. Choose to skip, rename, replace or use a subfolder.",
                    target.display()
                ),
                ConflictType::IsDirectory => {
                    format!("\"{}\" is a folder, not a file.", target.display())
                }
                ConflictType::ReadOnly => {
                    format!("\"{}\" cannot be written to.", target.display())
                }
            },
            TagsortError::Cancelled { completed } => {
                format!("Cancelled. {} file(s) were already updated.", completed)
            }
            TagsortError::Validation { subject, message } => {
                format!("The {} is not valid: {}.", subject, message)
            }
            TagsortError::NotFound(path) => {
                format!("\"{}\" no longer exists.", path.display())
            }
            TagsortError::ConfigError(_)
            | TagsortError::TomlParse(_)
            | TagsortError::TomlSerialize(_) => {
                "The settings file could not be loaded.".to_string()
            }
            _ => "Something went wrong while organizing notes.".to_string(),
        }
    }

    /// Wrap an error raised while reading a file for tag extraction.
    pub fn scan(path: impl Into<PathBuf>, source: TagsortError) -> Self {
        let recoverable = source.is_recoverable();
        let severity = match source {
            TagsortError::NotFound(_) => Severity::Medium,
            TagsortError::Io(_) => Severity::High,
            _ => Severity::Low,
        };
        TagsortError::Scan {
            path: path.into(),
            message: source.to_string(),
            severity,
            recoverable,
        }
    }
}

/// Result type alias for tagsort operations.
pub type Result<T> = std::result::Result<T, TagsortError>;
