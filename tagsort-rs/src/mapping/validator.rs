//! Folder path derivation and validation.

use crate::types::tag_body;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Characters that are unsafe in a file or folder name on common platforms.
const DANGEROUS_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Windows device names; still valid elsewhere, so only warned about.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

const MAX_COMPONENT_LENGTH: usize = 255;

/// Fallback name for a component that sanitizes to nothing.
pub const UNNAMED: &str = "unnamed";

/// Findings for one path. Errors make it unusable; warnings do not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl PathValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Make one tag segment safe to use as a folder name.
pub fn sanitize_component(segment: &str) -> String {
    let replaced: String = segment
        .chars()
        .map(|c| match c {
            c if DANGEROUS_CHARS.contains(&c) => '_',
            '\\' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    // Trailing dots and spaces are stripped by Windows, and "." / ".." are
    // never folder names.
    let trimmed = replaced.trim().trim_end_matches(['.', ' ']);
    if trimmed.is_empty() {
        UNNAMED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Folder path for a tag with no mapping: each hierarchy level becomes a
/// folder, optionally under `base_dir`.
///
/// e.g., "#project/active" -> "project/active"
pub fn derive_default_path(tag: &str, base_dir: Option<&Path>) -> PathBuf {
    let mut path = base_dir.map(Path::to_path_buf).unwrap_or_default();
    for segment in tag_body(tag).split('/') {
        path.push(sanitize_component(segment));
    }
    path
}

fn has_drive_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Check a vault-relative folder path.
pub fn validate_path(path: &Path, max_length: usize) -> PathValidation {
    let mut result = PathValidation::default();
    let text = path.to_string_lossy();

    if text.trim().is_empty() {
        result.errors.push("path is empty".to_string());
        return result;
    }

    if path.is_absolute() || text.starts_with(['/', '\\']) || has_drive_prefix(&text) {
        result.errors.push(format!("path must be relative to the vault: {}", text));
    }

    if path.components().any(|c| c == Component::ParentDir)
        || text.split(['/', '\\']).any(|part| part == "..")
    {
        result.errors.push(format!("path may not contain '..': {}", text));
    }

    let length = text.chars().count();
    if length > max_length {
        result.errors.push(format!(
            "path is {} characters long, the limit is {}",
            length, max_length
        ));
    }

    for part in text.split(['/', '\\']).filter(|p| !p.is_empty() && *p != "..") {
        if let Some(c) = part
            .chars()
            .find(|c| DANGEROUS_CHARS.contains(c) || c.is_control())
        {
            result
                .errors
                .push(format!("'{}' contains forbidden character {:?}", part, c));
        }

        if part.chars().count() > MAX_COMPONENT_LENGTH {
            result
                .errors
                .push(format!("folder name '{}' is too long", part));
        }

        let stem = part.split('.').next().unwrap_or(part);
        if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
            result
                .warnings
                .push(format!("'{}' is a reserved name on Windows", part));
        }

        if part.ends_with(['.', ' ']) {
            result
                .warnings
                .push(format!("'{}' ends with a dot or space", part));
        }
    }

    result
}
