//! Integration tests for tagsort against vaults on disk.

use std::fs;
use std::path::{Path, PathBuf};
use tagsort::{
    CancellationToken, Config, ConflictStrategy, FileStore, FsStore, LinkRewriter,
    OrganizationCoordinator, ProgressEvent, TagPathMapping, TagsortError, scan_vault,
};
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Create a vault on disk from (path, content) pairs.
fn setup_vault(files: &[(&str, &str)]) -> (TempDir, FsStore) {
    init_logging();
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    let store = FsStore::new(dir.path()).unwrap();
    (dir, store)
}

fn read(dir: &TempDir, path: &str) -> String {
    fs::read_to_string(dir.path().join(path)).unwrap()
}

mod scanning {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scan_vault_collects_tags() {
        let (_dir, store) = setup_vault(&[
            ("Inbox/a.md", "---\ntags:\n  - project/active\n---\n# A\n#urgent"),
            ("Inbox/b.md", "Nothing but [[a#project/active]]"),
            (".obsidian/snippets.md", "#hidden"),
            ("attachments/pic.png", "#not-markdown"),
        ]);

        let scan = scan_vault(&store, &Config::default().extraction).unwrap();
        assert_eq!(
            scan.notes.keys().cloned().collect::<Vec<_>>(),
            vec![PathBuf::from("Inbox/a.md"), PathBuf::from("Inbox/b.md")]
        );
        assert_eq!(scan.tag_counts().get("#project/active"), Some(&2));
        assert_eq!(scan.tag_counts().get("#urgent"), Some(&1));
        assert!(scan.tag_counts().get("#hidden").is_none());
    }

    #[test]
    fn hashtags_in_code_are_ignored() {
        let (_dir, store) = setup_vault(&[(
            "code.md",
            "#real\n\n```bash\necho #not-a-tag\n```\n\nInline `#nope` too",
        )]);
        let scan = scan_vault(&store, &Config::default().extraction).unwrap();
        assert_eq!(scan.notes[Path::new("code.md")].tags, vec!["#real"]);
    }
}

mod organizing {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn organize_moves_note_and_rewrites_links() {
        let (dir, store) = setup_vault(&[
            ("Inbox/Meeting notes.md", "---\ntags: [work/meetings]\n---\nAgenda"),
            (
                "Daily/2024-01-01.md",
                "Met today: [[Inbox/Meeting notes|notes]], ![[Inbox/Meeting notes.md#Agenda]]\n[md](Inbox/Meeting%20notes.md)",
            ),
        ]);
        let coordinator = OrganizationCoordinator::from_config(store, Config::default());

        let report = coordinator
            .organize(Path::new("Inbox/Meeting notes.md"), &ConflictStrategy::Abort)
            .unwrap();

        assert!(dir.path().join("work/meetings/Meeting notes.md").is_file());
        assert!(!dir.path().join("Inbox/Meeting notes.md").exists());
        assert_eq!(
            read(&dir, "Daily/2024-01-01.md"),
            "Met today: [[work/meetings/Meeting notes|notes]], ![[work/meetings/Meeting notes.md#Agenda]]\n[md](work/meetings/Meeting%20notes.md)"
        );
        assert_eq!(report.links.unwrap().links_updated, 3);
    }

    #[test]
    fn custom_mapping_from_config_file() {
        let (dir, store) = setup_vault(&[("idea.md", "An idea #project")]);
        let config_path = dir.path().join(".tagsort/config.toml");
        let mut config = Config::default();
        config
            .mappings
            .push(TagPathMapping::new("#project", "1 Projects"));
        config.save(&config_path).unwrap();

        let coordinator = OrganizationCoordinator::from_config(store, Config::load(&config_path).unwrap());
        coordinator
            .organize(Path::new("idea.md"), &ConflictStrategy::Abort)
            .unwrap();

        assert_eq!(read(&dir, "1 Projects/idea.md"), "An idea #project");
    }

    #[test]
    fn conflict_is_reported_then_resolved() {
        let (dir, store) = setup_vault(&[("n.md", "#a"), ("a/n.md", "already here")]);
        let coordinator = OrganizationCoordinator::from_config(store, Config::default());

        let err = coordinator
            .organize(Path::new("n.md"), &ConflictStrategy::Abort)
            .unwrap_err();
        assert!(matches!(err, TagsortError::FileConflict { .. }));
        assert!(err.is_recoverable());

        coordinator
            .organize(Path::new("n.md"), &ConflictStrategy::Rename)
            .unwrap();
        assert_eq!(read(&dir, "a/n 1.md"), "#a");
        assert_eq!(read(&dir, "a/n.md"), "already here");
    }

    #[test]
    fn batch_reports_progress_in_order() {
        let (dir, store) = setup_vault(&[("one.md", "#x"), ("two.md", "#y"), ("hub.md", "[[one]] [[two]]")]);
        let coordinator = OrganizationCoordinator::from_config(store, Config::default());
        let mut events = Vec::new();

        let batch = coordinator
            .organize_batch(
                &[PathBuf::from("one.md"), PathBuf::from("two.md")],
                &ConflictStrategy::Abort,
                &CancellationToken::new(),
                |e| events.push(e.clone()),
            )
            .unwrap();

        assert_eq!(batch.moved(), 2);
        assert!(batch.failures.is_empty());
        assert_eq!(read(&dir, "hub.md"), "[[x/one]] [[y/two]]");

        let moves: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::NoteMoved { to, .. } => Some(to.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(moves, vec![PathBuf::from("x/one.md"), PathBuf::from("y/two.md")]);
    }
}

mod link_updates {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn preview_then_apply() {
        let (dir, store) = setup_vault(&[
            ("target.md", "# Target"),
            ("a.md", "[[target]] [[target|t]] [[target#Intro]]"),
            ("b.md", "[link](target.md)"),
            ("c.md", "unrelated"),
        ]);
        let mappings = BTreeMap::from([(PathBuf::from("target.md"), PathBuf::from("Archive/target.md"))]);
        let rewriter = LinkRewriter::default();

        let preview = rewriter.preview_updates(&mappings, &store).unwrap();
        assert_eq!(preview.total_updates, 4);
        assert_eq!(preview.files_to_modify, vec![PathBuf::from("a.md"), PathBuf::from("b.md")]);
        assert_eq!(read(&dir, "b.md"), "[link](target.md)");

        store.rename(Path::new("target.md"), Path::new("Archive/target.md")).unwrap();
        let result = rewriter.update_links(&mappings, &store).unwrap();

        assert_eq!(result.links_updated, preview.total_updates);
        assert_eq!(result.files_modified, 2);
        assert_eq!(
            read(&dir, "a.md"),
            "[[Archive/target]] [[Archive/target|t]] [[Archive/target#Intro]]"
        );
        assert_eq!(read(&dir, "b.md"), "[link](Archive/target.md)");
        assert_eq!(read(&dir, "c.md"), "unrelated");
    }

    #[test]
    fn cancelled_pass_keeps_finished_files() {
        let (dir, store) = setup_vault(&[
            ("1.md", "[[old]]"),
            ("2.md", "[[old]]"),
        ]);
        let mappings = BTreeMap::from([(PathBuf::from("old.md"), PathBuf::from("new.md"))]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = LinkRewriter::default().update_links_with(&mappings, &store, &cancel, |_| {});
        assert!(matches!(result, Err(TagsortError::Cancelled { completed: 0 })));
        assert_eq!(read(&dir, "1.md"), "[[old]]");
        assert_eq!(read(&dir, "2.md"), "[[old]]");
    }
}
