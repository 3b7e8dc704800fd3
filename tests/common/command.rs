use assert_cmd::Command;
use assert_fs::TempDir;
use rstest::fixture;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

/// Monotonic fake clock so commit timestamps are strictly increasing even
/// when tests run faster than the wall clock ticks
static COMMIT_CLOCK: AtomicI64 = AtomicI64::new(0);

fn next_commit_date() -> String {
    let tick = COMMIT_CLOCK.fetch_add(1, Ordering::SeqCst);
    let day = 1 + tick / 24;
    let hour = tick % 24;
    format!("2024-01-{day:02} {hour:02}:00:00 +0000")
}

#[fixture]
pub fn repository_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

pub fn run_mingit(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("mingit").expect("Failed to find mingit binary");
    cmd.current_dir(dir)
        .env("MINGIT_AUTHOR_NAME", "Test Author")
        .env("MINGIT_AUTHOR_EMAIL", "test@example.com")
        .args(args);
    cmd
}

pub fn mingit_commit(dir: &Path, message: &str) -> Command {
    let mut cmd = run_mingit(dir, &["commit", "-m", message]);
    cmd.env("MINGIT_AUTHOR_DATE", next_commit_date());
    cmd
}

#[fixture]
pub fn init_repository_dir(repository_dir: TempDir) -> TempDir {
    run_mingit(repository_dir.path(), &["init"])
        .assert()
        .success();

    repository_dir
}
