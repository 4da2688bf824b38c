//! End-to-end backup workflows through the library facade

mod common;

use anybakup::{Action, Error, RepoPath};
use common::TestEnv;
use std::fs;

#[test]
fn test_file_lifecycle_counts_revisions() {
    let env = TestEnv::new();
    let mut backup = env.backup();
    let file = env.write("notes.txt", "xxx");
    let source = env.source_path("notes.txt");

    let first = backup.add_file(&source).unwrap();
    assert_eq!(first.action, Action::Add);
    assert_eq!(backup.entry(&source).unwrap().unwrap().revision_count, 1);

    let again = backup.add_file(&source).unwrap();
    assert_eq!(again.action, Action::NoChange);
    assert!(again.revision.is_none());
    assert_eq!(backup.entry(&source).unwrap().unwrap().revision_count, 1);

    fs::write(&file, "yyy").unwrap();
    let second = backup.add_file(&source).unwrap();
    assert_eq!(second.action, Action::Add);
    assert_eq!(backup.entry(&source).unwrap().unwrap().revision_count, 2);

    let history = backup.list_history(&first.repo_path).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(Some(&history[0].revision), second.revision.as_ref());
    assert_eq!(Some(&history[1].revision), first.revision.as_ref());
    assert!(history[0].timestamp >= history[1].timestamp);
    assert!(history[0].message.starts_with("UPDATE "));
    assert!(history[1].message.starts_with("ADD "));
}

#[test]
fn test_old_revision_restores_old_bytes() {
    let env = TestEnv::new();
    let mut backup = env.backup();
    let file = env.write("doc.txt", "first draft");
    let source = env.source_path("doc.txt");

    let v1 = backup.add_file(&source).unwrap();
    fs::write(&file, "second draft").unwrap();
    backup.add_file(&source).unwrap();

    let restored = env.source.join("restored/doc.txt");
    backup
        .get_file_at_revision(&v1.repo_path, v1.revision.as_deref().unwrap(), &restored)
        .unwrap();
    assert_eq!(fs::read_to_string(&restored).unwrap(), "first draft");

    // restoring over the source itself
    backup
        .get_file_at_revision(&v1.repo_path, v1.revision.as_deref().unwrap(), &file)
        .unwrap();
    assert_eq!(fs::read_to_string(&file).unwrap(), "first draft");
}

#[test]
fn test_every_revision_restores_its_content() {
    let env = TestEnv::new();
    let mut backup = env.backup();
    let contents = ["1\n", "22\n", "333\n", "4444\n"];
    let source = env.source_path("log.txt");

    let mut revisions = Vec::new();
    for content in contents {
        env.write("log.txt", content);
        let report = backup.add_file(&source).unwrap();
        assert_eq!(report.action, Action::Add);
        revisions.push(report.revision.unwrap());
    }

    let repo_path = source.to_repo_path().unwrap();
    let history = backup.list_history(&repo_path).unwrap();
    assert_eq!(history.len(), contents.len());

    let newest_first: Vec<_> = revisions.iter().rev().cloned().collect();
    let logged: Vec<_> = history.iter().map(|r| r.revision.clone()).collect();
    assert_eq!(logged, newest_first);

    let dest = env.source.join("checkout.txt");
    for (revision, content) in revisions.iter().zip(contents) {
        backup.get_file_at_revision(&repo_path, revision, &dest).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), content);
    }
}

#[test]
fn test_directory_add_records_root_and_files() {
    let env = TestEnv::new();
    let mut backup = env.backup();
    env.write("project/a.txt", "a");
    env.write("project/sub/b.txt", "b");
    env.write("project/sub/deeper/c.txt", "c");
    let dir = env.source_path("project");

    let report = backup.add_file(&dir).unwrap();
    assert_eq!(report.action, Action::Add);
    assert_eq!(report.affected.len(), 3);

    let entries = backup.entries().unwrap();
    assert_eq!(entries.len(), 4);

    let root = backup.entry(&dir).unwrap().unwrap();
    assert!(!root.is_file);
    assert!(!root.is_sub);
    for entry in entries.iter().filter(|e| e.is_file) {
        assert!(entry.is_sub, "{} should be a sub-entry", entry.repo_path);
        assert_eq!(entry.revision_count, 1);
        assert!(dir.is_ancestor_of(&anybakup::SourcePath::new(&entry.source_path).unwrap()));
    }
}

#[test]
fn test_directory_readd_touches_only_changed_files() {
    let env = TestEnv::new();
    let mut backup = env.backup();
    env.write("project/a.txt", "a");
    let b = env.write("project/b.txt", "b");
    let dir = env.source_path("project");
    backup.add_file(&dir).unwrap();

    assert_eq!(backup.add_file(&dir).unwrap().action, Action::NoChange);

    fs::write(&b, "b2").unwrap();
    env.write("project/c.txt", "c");
    let report = backup.add_file(&dir).unwrap();
    assert_eq!(report.action, Action::Add);
    assert_eq!(report.affected.len(), 2);

    let a = backup.entry(&env.source_path("project/a.txt")).unwrap().unwrap();
    let b = backup.entry(&env.source_path("project/b.txt")).unwrap().unwrap();
    let c = backup.entry(&env.source_path("project/c.txt")).unwrap().unwrap();
    assert_eq!(a.revision_count, 1);
    assert_eq!(b.revision_count, 2);
    assert_eq!(c.revision_count, 1);
    assert_eq!(backup.entries().unwrap().len(), 4);
}

#[test]
fn test_deleted_source_files_stay_in_store() {
    let env = TestEnv::new();
    let mut backup = env.backup();
    env.write("project/keep.txt", "keep");
    let gone = env.write("project/gone.txt", "gone");
    let dir = env.source_path("project");
    backup.add_file(&dir).unwrap();

    fs::remove_file(&gone).unwrap();
    assert_eq!(backup.add_file(&dir).unwrap().action, Action::NoChange);
    assert!(env.store_file(&gone).exists());
}

#[test]
fn test_remove_directory_drops_everything() {
    let env = TestEnv::new();
    let mut backup = env.backup();
    env.write("project/a.txt", "a");
    env.write("project/sub/b.txt", "b");
    env.write("other.txt", "o");
    let dir = env.source_path("project");
    let other = env.source_path("other.txt");
    backup.add_file(&dir).unwrap();
    backup.add_file(&other).unwrap();

    let report = backup.remove_file(&dir).unwrap();
    assert_eq!(report.action, Action::Remove);
    assert_eq!(report.removed.len(), 2);
    assert!(report.ledger_error.is_none());

    assert!(!env.store_file(&env.source.join("project")).exists());
    assert!(env.source.join("project/a.txt").exists(), "source is untouched");

    let remaining = backup.entries().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].source_path, other.as_str());

    let head = backup.list_history(&report.removed[0]).unwrap();
    assert!(head[0].message.starts_with("RM "));
}

#[test]
fn test_remove_untracked_is_no_change() {
    let env = TestEnv::new();
    let mut backup = env.backup();
    env.write("never.txt", "n");

    let report = backup.remove_file(&env.source_path("never.txt")).unwrap();
    assert_eq!(report.action, Action::NoChange);
    assert!(report.removed.is_empty());
    assert!(report.revision.is_none());
}

#[test]
fn test_readd_after_remove_starts_fresh_row() {
    let env = TestEnv::new();
    let mut backup = env.backup();
    env.write("a.txt", "a");
    let source = env.source_path("a.txt");

    backup.add_file(&source).unwrap();
    backup.remove_file(&source).unwrap();
    assert!(backup.entry(&source).unwrap().is_none());

    let report = backup.add_file(&source).unwrap();
    assert_eq!(report.action, Action::Add);
    // ADD, RM, ADD
    assert_eq!(backup.entry(&source).unwrap().unwrap().revision_count, 3);
}

#[test]
fn test_tags_inherit_into_new_files() {
    let env = TestEnv::new();
    let mut backup = env.backup();
    env.write("photos/one.jpg", "1");
    let dir = env.source_path("photos");
    backup.add_file(&dir).unwrap();
    backup.set_tag(&dir, "pictures").unwrap();

    env.write("photos/two.jpg", "2");
    backup.add_file(&dir).unwrap();
    let two = env.source_path("photos/two.jpg");
    assert_eq!(backup.get_tag(&two).unwrap().as_deref(), Some("pictures"));

    // a file added on its own below the directory joins it
    env.write("photos/raw/three.cr2", "3");
    let three = env.source_path("photos/raw/three.cr2");
    backup.add_file(&three).unwrap();
    let entry = backup.entry(&three).unwrap().unwrap();
    assert!(entry.is_sub);
    assert_eq!(entry.tag.as_deref(), Some("pictures"));

    // rows added before the tag was set keep their own value
    let one = env.source_path("photos/one.jpg");
    assert_eq!(backup.get_tag(&one).unwrap(), None);

    let tagged = backup.entries_by_tag("pictures").unwrap();
    assert_eq!(tagged.len(), 3);
    assert_eq!(backup.tags().unwrap(), vec!["pictures".to_string()]);
}

#[test]
fn test_explicit_tag_not_overwritten() {
    let env = TestEnv::new();
    let mut backup = env.backup();
    env.write("docs/a.txt", "a");
    let dir = env.source_path("docs");
    let a = env.source_path("docs/a.txt");
    backup.add_file(&dir).unwrap();
    backup.set_tag(&dir, "docs").unwrap();
    backup.set_tag(&a, "special").unwrap();

    fs::write(env.source.join("docs/a.txt"), "a2").unwrap();
    backup.add_file(&dir).unwrap();
    assert_eq!(backup.get_tag(&a).unwrap().as_deref(), Some("special"));
}

#[test]
fn test_tag_untracked_path_fails() {
    let env = TestEnv::new();
    let backup = env.backup();
    let err = backup.set_tag(&env.source_path("nope.txt"), "x").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_reopen_keeps_ledger_and_history() {
    let env = TestEnv::new();
    env.write("a.txt", "a");
    let source = env.source_path("a.txt");
    let repo_path = {
        let mut backup = env.backup();
        backup.add_file(&source).unwrap().repo_path
    };

    let mut backup = env.backup();
    assert_eq!(backup.entry(&source).unwrap().unwrap().revision_count, 1);
    assert_eq!(backup.list_history(&repo_path).unwrap().len(), 1);
    assert!(backup.verify(false).unwrap().is_clean());
}

#[test]
fn test_unknown_revision_and_path() {
    let env = TestEnv::new();
    let mut backup = env.backup();
    env.write("a.txt", "a");
    let report = backup.add_file(&env.source_path("a.txt")).unwrap();
    let dest = env.source.join("out.txt");

    let err = backup
        .get_file_at_revision(&report.repo_path, "deadbeefdeadbeef", &dest)
        .unwrap_err();
    assert!(matches!(err, Error::RevisionNotFound(_)));

    let missing = RepoPath::parse("not/stored.txt").unwrap();
    let err = backup
        .get_file_at_revision(&missing, report.revision.as_deref().unwrap(), &dest)
        .unwrap_err();
    assert!(matches!(err, Error::PathNotInRevision { .. }));
    assert!(!dest.exists());
}
