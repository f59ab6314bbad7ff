//! Resolving tags to folders.

use crate::config::{Config, MappingConfig, PrioritizationOptions};
use crate::mapping::table::{MappingTable, TagPathMapping};
use crate::mapping::validator::{derive_default_path, validate_path};
use crate::parser::{normalize_tag, validate_tag};
use crate::types::{tag_ancestors, tag_depth};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

/// How a folder was chosen for a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappingType {
    /// Derived from the tag, or a generated table entry.
    Default,
    /// A user mapping.
    Custom,
    /// An ancestor of the requested tag.
    Hierarchical,
}

/// The folder chosen for one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMappingResult {
    pub tag: String,
    pub path: PathBuf,
    pub mapping_type: MappingType,
    pub priority: u32,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Maps tags to folders using a shared, swappable mapping table.
///
/// Readers take a snapshot of the table, so a concurrent update is either
/// fully visible or not at all.
#[derive(Debug, Default)]
pub struct PathMapper {
    table: RwLock<Arc<MappingTable>>,
    config: MappingConfig,
}

impl PathMapper {
    pub fn new(config: MappingConfig) -> Self {
        Self {
            table: RwLock::new(Arc::new(MappingTable::new())),
            config,
        }
    }

    /// A mapper holding the configured mapping table.
    pub fn from_config(config: &Config) -> Self {
        let mapper = Self::new(config.mapping.clone());
        mapper.update_mapping_table(config.mappings.clone());
        mapper
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Current table. Later updates do not affect the returned snapshot.
    pub fn snapshot(&self) -> Arc<MappingTable> {
        Arc::clone(&*self.table.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the whole table.
    pub fn update_mapping_table(&self, mappings: Vec<TagPathMapping>) {
        let table = Arc::new(MappingTable::from_mappings(mappings));
        log::info!("mapping table updated: {} mapping(s)", table.len());
        *self.table.write().unwrap_or_else(PoisonError::into_inner) = table;
    }

    /// Insert or replace one mapping.
    pub fn add_mapping(&self, mapping: TagPathMapping) {
        let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
        log::debug!("adding mapping {} -> {}", mapping.tag, mapping.target_path);
        Arc::make_mut(&mut *guard).insert(mapping);
    }

    pub fn remove_mapping(&self, tag: &str) -> Option<TagPathMapping> {
        let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut *guard).remove(tag)
    }

    /// Copy of every mapping, ordered by tag.
    pub fn mappings(&self) -> Vec<TagPathMapping> {
        self.snapshot().iter().cloned().collect()
    }

    /// Resolve one tag to a folder.
    ///
    /// An enabled custom mapping wins, then any other enabled mapping, then a
    /// path derived from the tag. A result is always produced; `valid` says
    /// whether the path can be used.
    pub fn resolve(&self, tag: &str) -> PathMappingResult {
        let table = self.snapshot();
        self.resolve_in(&table, tag)
    }

    fn resolve_in(&self, table: &MappingTable, tag: &str) -> PathMappingResult {
        let tag = normalize_tag(tag);
        let derived = derive_default_path(&tag, self.config.base_dir.as_deref());

        let mapped = table.get(&tag).filter(|m| m.enabled);
        let (path, mapping_type, priority) = match mapped {
            Some(m) if m.is_custom(&derived) => {
                (PathBuf::from(&m.target_path), MappingType::Custom, m.priority)
            }
            Some(m) => (PathBuf::from(&m.target_path), MappingType::Default, m.priority),
            None => (derived, MappingType::Default, 0),
        };

        let mut validation = validate_path(&path, self.config.max_path_length);
        if let Err(issue) = validate_tag(&tag) {
            validation.errors.insert(0, format!("{}: {}", tag, issue));
        }

        log::debug!(
            "{} -> {} ({:?}, priority {})",
            tag,
            path.display(),
            mapping_type,
            priority
        );

        PathMappingResult {
            valid: validation.is_valid(),
            tag,
            path,
            mapping_type,
            priority,
            errors: validation.errors,
            warnings: validation.warnings,
        }
    }

    /// Resolve several tags and order the usable results, best first.
    ///
    /// Duplicates and invalid results are dropped.
    pub fn resolve_all(
        &self,
        tags: &[String],
        options: &PrioritizationOptions,
    ) -> Vec<PathMappingResult> {
        let table = self.snapshot();
        let mut seen = HashSet::new();

        let mut results: Vec<PathMappingResult> = tags
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| seen.insert(t.clone()))
            .map(|t| self.resolve_in(&table, &t))
            .filter(|r| {
                if !r.valid {
                    log::debug!("dropping {}: {}", r.tag, r.errors.join("; "));
                }
                r.valid
            })
            .collect();

        results.sort_by(|a, b| compare_results(a, b, options));

        if let Some(max) = options.max_paths {
            results.truncate(max);
        }
        results
    }

    /// Results for every ancestor of a tag, nearest first.
    ///
    /// e.g., "#a/b/c" -> "#a/b" (priority 20), "#a" (priority 10)
    pub fn get_hierarchical_paths(&self, tag: &str) -> Vec<PathMappingResult> {
        let table = self.snapshot();
        tag_ancestors(&normalize_tag(tag))
            .into_iter()
            .map(|ancestor| {
                let mut result = self.resolve_in(&table, &ancestor);
                result.mapping_type = MappingType::Hierarchical;
                result.priority = (tag_depth(&ancestor) as u32) * 10;
                result
            })
            .collect()
    }
}

fn compare_results(
    a: &PathMappingResult,
    b: &PathMappingResult,
    options: &PrioritizationOptions,
) -> Ordering {
    let mut ordering = Ordering::Equal;

    if options.prefer_custom {
        let a_custom = a.mapping_type == MappingType::Custom;
        let b_custom = b.mapping_type == MappingType::Custom;
        ordering = b_custom.cmp(&a_custom);
    }

    if options.prefer_specific {
        ordering = ordering.then_with(|| tag_depth(&b.tag).cmp(&tag_depth(&a.tag)));
    }

    ordering
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.tag.cmp(&b.tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn order(results: &[PathMappingResult]) -> Vec<&str> {
        results.iter().map(|r| r.tag.as_str()).collect()
    }

    #[test]
    fn test_resolve_default_derivation() {
        let mapper = PathMapper::default();
        let result = mapper.resolve("project/active");
        assert_eq!(result.tag, "#project/active");
        assert_eq!(result.path, PathBuf::from("project").join("active"));
        assert_eq!(result.mapping_type, MappingType::Default);
        assert_eq!(result.priority, 0);
        assert!(result.valid);
    }

    #[test]
    fn test_resolve_under_base_dir() {
        let mapper = PathMapper::new(MappingConfig {
            base_dir: Some(PathBuf::from("Areas")),
            ..MappingConfig::default()
        });
        assert_eq!(mapper.resolve("#x").path, Path::new("Areas").join("x"));
    }

    #[test]
    fn test_resolve_custom_mapping() {
        let mapper = PathMapper::default();
        mapper.add_mapping(TagPathMapping::new("#work", "Areas/Work").with_priority(3));

        let result = mapper.resolve("#work");
        assert_eq!(result.path, PathBuf::from("Areas/Work"));
        assert_eq!(result.mapping_type, MappingType::Custom);
        assert_eq!(result.priority, 3);
    }

    #[test]
    fn test_disabled_mapping_falls_back() {
        let mapper = PathMapper::default();
        let mut mapping = TagPathMapping::new("#work", "Areas/Work");
        mapping.enabled = false;
        mapper.add_mapping(mapping);

        assert_eq!(mapper.resolve("#work").path, PathBuf::from("work"));
    }

    #[test]
    fn test_invalid_mapping_path_flagged() {
        let mapper = PathMapper::default();
        mapper.add_mapping(TagPathMapping::new("#bad", "../outside"));
        let result = mapper.resolve("#bad");
        assert!(!result.valid);
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn test_resolve_all_prefers_specific() {
        let mapper = PathMapper::default();
        let results = mapper.resolve_all(&tags(&["#x/y", "#x"]), &PrioritizationOptions::default());
        assert_eq!(order(&results), vec!["#x/y", "#x"]);

        let results = mapper.resolve_all(&tags(&["#x", "#x/y"]), &PrioritizationOptions::default());
        assert_eq!(order(&results), vec!["#x/y", "#x"]);
    }

    #[test]
    fn test_resolve_all_prefers_custom_then_priority() {
        let mapper = PathMapper::default();
        mapper.add_mapping(TagPathMapping::new("#flat", "Flat").with_priority(2));
        let results = mapper.resolve_all(
            &tags(&["#deep/er", "#flat", "#b", "#a"]),
            &PrioritizationOptions::default(),
        );
        assert_eq!(order(&results), vec!["#flat", "#deep/er", "#a", "#b"]);

        let options = PrioritizationOptions {
            prefer_custom: false,
            prefer_specific: false,
            max_paths: Some(2),
        };
        let results = mapper.resolve_all(&tags(&["#deep/er", "#flat", "#b"]), &options);
        assert_eq!(order(&results), vec!["#flat", "#b"]);
    }

    #[test]
    fn test_resolve_all_dedupes_and_drops_invalid() {
        let mapper = PathMapper::default();
        mapper.add_mapping(TagPathMapping::new("#bad", "/abs"));
        let results = mapper.resolve_all(
            &tags(&["#a", "a", "#bad", "#a/"]),
            &PrioritizationOptions::default(),
        );
        assert_eq!(order(&results), vec!["#a"]);
    }

    #[test]
    fn test_hierarchical_paths() {
        let mapper = PathMapper::default();
        let results = mapper.get_hierarchical_paths("#a/b/c");
        let summary: Vec<_> = results
            .iter()
            .map(|r| (r.tag.as_str(), r.mapping_type, r.priority))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("#a/b", MappingType::Hierarchical, 20),
                ("#a", MappingType::Hierarchical, 10),
            ]
        );
        assert!(mapper.get_hierarchical_paths("#solo").is_empty());
    }

    #[test]
    fn test_snapshot_unaffected_by_update() {
        let mapper = PathMapper::default();
        mapper.add_mapping(TagPathMapping::new("#a", "A"));
        let before = mapper.snapshot();

        mapper.update_mapping_table(vec![TagPathMapping::new("#b", "B")]);
        mapper.remove_mapping("#b");

        assert_eq!(before.len(), 1);
        assert!(before.get("#a").is_some());
        assert!(mapper.mappings().is_empty());
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.mappings.push(TagPathMapping::new("#inbox", "0 Inbox"));
        let mapper = PathMapper::from_config(&config);
        assert_eq!(mapper.resolve("#inbox").path, PathBuf::from("0 Inbox"));
    }
}
