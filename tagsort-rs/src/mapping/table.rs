//! The user's tag to folder table.

use crate::parser::normalize_tag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

fn default_enabled() -> bool {
    true
}

/// A user-defined mapping from a tag to a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPathMapping {
    pub tag: String,

    /// Vault-relative folder, `/`-separated.
    pub target_path: String,

    #[serde(default)]
    pub priority: u32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Explicit custom flag. Older tables may not have it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<bool>,
}

impl TagPathMapping {
    /// A new enabled custom mapping.
    pub fn new(tag: &str, target_path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            tag: normalize_tag(tag),
            target_path: target_path.into(),
            priority: 1,
            enabled: true,
            created_at: now,
            modified_at: now,
            description: None,
            custom: Some(true),
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether this mapping was set up by the user rather than generated.
    ///
    /// Uses the stored flag when present. Otherwise a mapping counts as custom
    /// if its priority is above 1, it has a description, or its path differs
    /// from the path that would be derived from the tag.
    pub fn is_custom(&self, derived_default: &Path) -> bool {
        self.custom.unwrap_or_else(|| {
            self.priority > 1
                || self.description.as_deref().is_some_and(|d| !d.trim().is_empty())
                || Path::new(&self.target_path) != derived_default
        })
    }
}

/// Mappings keyed by normalized tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: BTreeMap<String, TagPathMapping>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, keeping the higher-priority mapping when a tag repeats.
    pub fn from_mappings(mappings: impl IntoIterator<Item = TagPathMapping>) -> Self {
        let mut table = Self::new();
        for mapping in mappings {
            table.insert_keep_higher(mapping);
        }
        table
    }

    fn insert_keep_higher(&mut self, mut mapping: TagPathMapping) {
        mapping.tag = normalize_tag(&mapping.tag);
        match self.entries.get(&mapping.tag) {
            Some(existing) if existing.priority >= mapping.priority => {
                log::warn!(
                    "ignoring mapping {} -> {}: {} -> {} has priority {}",
                    mapping.tag,
                    mapping.target_path,
                    existing.tag,
                    existing.target_path,
                    existing.priority
                );
            }
            _ => {
                self.entries.insert(mapping.tag.clone(), mapping);
            }
        }
    }

    /// Insert or replace the mapping for a tag.
    pub fn insert(&mut self, mut mapping: TagPathMapping) -> Option<TagPathMapping> {
        mapping.tag = normalize_tag(&mapping.tag);
        self.entries.insert(mapping.tag.clone(), mapping)
    }

    pub fn remove(&mut self, tag: &str) -> Option<TagPathMapping> {
        self.entries.remove(&normalize_tag(tag))
    }

    pub fn get(&self, tag: &str) -> Option<&TagPathMapping> {
        self.entries.get(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagPathMapping> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
