mod common;

use assert_fs::TempDir;
use common::command::{init_repository_dir, mingit_commit, run_mingit};
use common::file::{FileSpec, write_file};
use predicates::prelude::predicate;
use rstest::rstest;

/// Fast-forward: master never advanced after feature branched off, so the
/// merge moves the reference without creating a commit
#[rstest]
fn merge_fast_forwards_when_current_is_an_ancestor(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    write_file(FileSpec::new(dir.path().join("a.txt"), "x\n".to_string()));
    run_mingit(dir.path(), &["add", "."]).assert().success();
    mingit_commit(dir.path(), "base").assert().success();

    run_mingit(dir.path(), &["branch", "create", "feature"])
        .assert()
        .success();
    run_mingit(dir.path(), &["checkout", "feature"])
        .assert()
        .success();

    write_file(FileSpec::new(dir.path().join("b.txt"), "y\n".to_string()));
    run_mingit(dir.path(), &["add", "."]).assert().success();
    mingit_commit(dir.path(), "feature work").assert().success();

    run_mingit(dir.path(), &["checkout", "master"])
        .assert()
        .success();
    run_mingit(dir.path(), &["merge", "feature"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fast-forwarded"));

    // the branch tip equals the feature tip and the workspace followed
    assert_eq!(
        std::fs::read_to_string(dir.path().join("b.txt")).unwrap(),
        "y\n"
    );

    let log = run_mingit(dir.path(), &["log"]).assert().success();
    let stdout = String::from_utf8(log.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.matches("commit ").count(), 2, "no merge commit");
}

/// The spec scenario: feature adds b.txt while master independently changes
/// a.txt; the merge succeeds three-way with both files present
#[rstest]
fn merge_combines_independent_changes_three_way(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    write_file(FileSpec::new(dir.path().join("a.txt"), "x\n".to_string()));
    run_mingit(dir.path(), &["add", "."]).assert().success();
    mingit_commit(dir.path(), "commit1").assert().success();

    run_mingit(dir.path(), &["branch", "create", "feature"])
        .assert()
        .success();
    run_mingit(dir.path(), &["checkout", "feature"])
        .assert()
        .success();
    write_file(FileSpec::new(dir.path().join("b.txt"), "b\n".to_string()));
    run_mingit(dir.path(), &["add", "."]).assert().success();
    mingit_commit(dir.path(), "feature touches b.txt")
        .assert()
        .success();

    run_mingit(dir.path(), &["checkout", "master"])
        .assert()
        .success();
    write_file(FileSpec::new(dir.path().join("a.txt"), "x2\n".to_string()));
    run_mingit(dir.path(), &["add", "."]).assert().success();
    mingit_commit(dir.path(), "master touches a.txt")
        .assert()
        .success();

    run_mingit(dir.path(), &["merge", "feature"])
        .assert()
        .success()
        .stdout(predicate::str::contains("three-way"));

    assert_eq!(
        std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "x2\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("b.txt")).unwrap(),
        "b\n"
    );

    let log = run_mingit(dir.path(), &["log"]).assert().success();
    let stdout = String::from_utf8(log.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.matches("commit ").count(), 4, "merge commit exists");
}

/// Merging an ancestor (or the branch itself) is a distinct no-op outcome,
/// and the reference must not move
#[rstest]
fn merging_an_already_merged_branch_reports_nothing_to_merge(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    write_file(FileSpec::new(dir.path().join("a.txt"), "x\n".to_string()));
    run_mingit(dir.path(), &["add", "."]).assert().success();
    mingit_commit(dir.path(), "base").assert().success();

    run_mingit(dir.path(), &["branch", "create", "feature"])
        .assert()
        .success();

    write_file(FileSpec::new(dir.path().join("a.txt"), "y\n".to_string()));
    run_mingit(dir.path(), &["add", "."]).assert().success();
    mingit_commit(dir.path(), "ahead").assert().success();

    // feature is an ancestor of master
    run_mingit(dir.path(), &["merge", "feature"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to merge"));

    // and merging the branch into itself says the same
    run_mingit(dir.path(), &["merge", "master"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to merge"));

    let log = run_mingit(dir.path(), &["log"]).assert().success();
    let stdout = String::from_utf8(log.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.matches("commit ").count(), 2, "reference unchanged");
}

/// Both branches rewrite the same path with different content: every
/// conflicting path is reported and nothing is written
#[rstest]
fn conflicting_merge_reports_paths_and_leaves_state_unchanged(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    write_file(FileSpec::new(dir.path().join("a.txt"), "base\n".to_string()));
    run_mingit(dir.path(), &["add", "."]).assert().success();
    mingit_commit(dir.path(), "base").assert().success();

    run_mingit(dir.path(), &["branch", "create", "feature"])
        .assert()
        .success();
    run_mingit(dir.path(), &["checkout", "feature"])
        .assert()
        .success();
    write_file(FileSpec::new(dir.path().join("a.txt"), "feature\n".to_string()));
    run_mingit(dir.path(), &["add", "."]).assert().success();
    mingit_commit(dir.path(), "feature side").assert().success();

    run_mingit(dir.path(), &["checkout", "master"])
        .assert()
        .success();
    write_file(FileSpec::new(dir.path().join("a.txt"), "master\n".to_string()));
    run_mingit(dir.path(), &["add", "."]).assert().success();
    mingit_commit(dir.path(), "master side").assert().success();

    run_mingit(dir.path(), &["merge", "feature"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("conflict"));

    // all-or-nothing: workspace and history are untouched
    assert_eq!(
        std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "master\n"
    );
    let log = run_mingit(dir.path(), &["log"]).assert().success();
    let stdout = String::from_utf8(log.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.matches("commit ").count(), 2);
}

/// Identical edits on both sides merge cleanly
#[rstest]
fn identical_changes_on_both_sides_do_not_conflict(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    write_file(FileSpec::new(dir.path().join("a.txt"), "base\n".to_string()));
    run_mingit(dir.path(), &["add", "."]).assert().success();
    mingit_commit(dir.path(), "base").assert().success();

    run_mingit(dir.path(), &["branch", "create", "feature"])
        .assert()
        .success();
    run_mingit(dir.path(), &["checkout", "feature"])
        .assert()
        .success();
    write_file(FileSpec::new(dir.path().join("a.txt"), "agreed\n".to_string()));
    write_file(FileSpec::new(dir.path().join("f.txt"), "f\n".to_string()));
    run_mingit(dir.path(), &["add", "."]).assert().success();
    mingit_commit(dir.path(), "feature agrees").assert().success();

    run_mingit(dir.path(), &["checkout", "master"])
        .assert()
        .success();
    write_file(FileSpec::new(dir.path().join("a.txt"), "agreed\n".to_string()));
    run_mingit(dir.path(), &["add", "."]).assert().success();
    mingit_commit(dir.path(), "master agrees").assert().success();

    run_mingit(dir.path(), &["merge", "feature"])
        .assert()
        .success()
        .stdout(predicate::str::contains("three-way"));

    assert_eq!(
        std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "agreed\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("f.txt")).unwrap(),
        "f\n"
    );
}
