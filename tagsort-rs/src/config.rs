//! Configuration: extraction sources, link-update toggles, mapping table.

use crate::error::{Result, TagsortError};
use crate::mapping::TagPathMapping;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default advisory timeout for a long-running operation.
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;

/// Default maximum length of a resolved folder path.
pub const DEFAULT_MAX_PATH_LENGTH: usize = 260;

/// Which sources the tag extractor reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagExtractionConfig {
    pub extract_from_frontmatter: bool,
    pub extract_from_hashtags: bool,
    pub extract_from_wiki_links: bool,
    /// When false, `#a/b` is collapsed to `#a`.
    pub support_tag_hierarchies: bool,
}

impl Default for TagExtractionConfig {
    fn default() -> Self {
        Self {
            extract_from_frontmatter: true,
            extract_from_hashtags: true,
            extract_from_wiki_links: true,
            support_tag_hierarchies: true,
        }
    }
}

/// Which link syntaxes the rewriter touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkUpdateConfig {
    pub update_wiki_links: bool,
    pub update_aliased_links: bool,
    pub update_heading_links: bool,
    pub update_embedded_files: bool,
    pub update_markdown_links: bool,
}

impl Default for LinkUpdateConfig {
    fn default() -> Self {
        Self {
            update_wiki_links: true,
            update_aliased_links: true,
            update_heading_links: true,
            update_embedded_files: true,
            update_markdown_links: true,
        }
    }
}

/// How default folder paths are derived from tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Folder that derived paths are placed under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,

    pub max_path_length: usize,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
        }
    }
}

/// Ordering rules for choosing between several candidate folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrioritizationOptions {
    /// Deeper tags (`#a/b`) sort before shallower ones (`#a`).
    pub prefer_specific: bool,
    /// User mappings sort before derived ones.
    pub prefer_custom: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_paths: Option<usize>,
}

impl Default for PrioritizationOptions {
    fn default() -> Self {
        Self {
            prefer_specific: true,
            prefer_custom: true,
            max_paths: None,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Advisory only; callers wrapping I/O decide whether to enforce it.
    pub operation_timeout_secs: u64,
    pub extraction: TagExtractionConfig,
    pub mapping: MappingConfig,
    pub links: LinkUpdateConfig,
    pub prioritization: PrioritizationOptions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mappings: Vec<TagPathMapping>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
            extraction: TagExtractionConfig::default(),
            mapping: MappingConfig::default(),
            links: LinkUpdateConfig::default(),
            prioritization: PrioritizationOptions::default(),
            mappings: Vec::new(),
        }
    }
}

impl Config {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TagsortError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Load from the user config directory, falling back to defaults.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => {
                log::debug!("loading config from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// `~/.config/tagsort/config.toml` (platform equivalent).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tagsort").join("config.toml"))
    }

    /// Write configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.mapping.max_path_length == 0 {
            return Err(TagsortError::ConfigError(
                "mapping.max_path_length must be greater than zero".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for mapping in &self.mappings {
            if !seen.insert(crate::parser::normalize_tag(&mapping.tag)) {
                return Err(TagsortError::ConfigError(format!(
                    "duplicate mapping for tag {}",
                    mapping.tag
                )));
            }
        }
        Ok(())
    }
}
