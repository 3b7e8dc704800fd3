use crate::areas::repository::Repository;
use crate::artifacts::diff::text_diff::MyersDiff;
use crate::artifacts::diff::tree_diff::{ChangeSet, DiffFilter};
use crate::artifacts::objects::commit::Parentage;
use crate::artifacts::patch::unified_diff_text;
use crate::artifacts::status::{Inspector, WorkingFileStatus};
use crate::errors::CoreError;
use std::fmt::Write;
use std::path::Path;

impl Repository {
    /// Render a unified diff
    ///
    /// With no revisions: local changes to tracked files against the
    /// staging set. With one revision: that commit against its parent,
    /// where a root commit diffs against the empty tree and a merge commit
    /// renders empty. With two revisions: one tree against the other, no
    /// shared history required.
    ///
    /// `filter` keeps only the given change kinds (`A`, `D`, `M`).
    pub async fn diff(
        &mut self,
        old: Option<&str>,
        new: Option<&str>,
        filter: Option<&str>,
    ) -> anyhow::Result<String> {
        let filter = match filter {
            Some(letters) => DiffFilter::try_parse(letters).ok_or_else(|| {
                CoreError::Validation(format!(
                    "invalid diff filter '{letters}', allowed letters are A, D, M"
                ))
            })?,
            None => DiffFilter::all(),
        };

        match (old, new) {
            (None, None) => self.diff_worktree().await,
            (Some(revision), None) | (None, Some(revision)) => {
                self.diff_commit(revision, filter)
            }
            (Some(old), Some(new)) => self.diff_commits(old, new, filter),
        }
    }

    fn apply_filter(changes: ChangeSet, filter: DiffFilter) -> ChangeSet {
        changes
            .into_iter()
            .filter(|(_, change)| change.matches_filter(filter))
            .collect()
    }

    async fn diff_worktree(&mut self) -> anyhow::Result<String> {
        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;

        let report = Inspector::new(&index, self.workspace()).report()?;
        let mut out = String::new();

        for (path, status) in &report {
            let Some(entry) = index.entry_by_path(path) else {
                continue; // untracked files have no staged side to diff
            };

            let old_text = self.store().load_blob(&entry.oid)?.content_utf8();
            let new_text = match status {
                WorkingFileStatus::Modified => {
                    Some(String::from_utf8_lossy(&self.workspace().read_file(path)?).into_owned())
                }
                WorkingFileStatus::Deleted => None,
                _ => continue,
            };

            Self::render_worktree_change(&mut out, path, entry.oid.to_short_oid(), &old_text, new_text.as_deref());
        }

        Ok(out)
    }

    fn render_worktree_change(
        out: &mut String,
        path: &Path,
        old_short: String,
        old_text: &str,
        new_text: Option<&str>,
    ) {
        let _ = writeln!(out, "diff --git a/{} b/{}", path.display(), path.display());
        match new_text {
            Some(_) => {
                let _ = writeln!(out, "index {old_short}..worktree");
                let _ = writeln!(out, "--- a/{}", path.display());
                let _ = writeln!(out, "+++ b/{}", path.display());
            }
            None => {
                let _ = writeln!(out, "index {old_short}..0000000");
                let _ = writeln!(out, "--- a/{}", path.display());
                let _ = writeln!(out, "+++ /dev/null");
            }
        }

        for hunk in MyersDiff::new(old_text, new_text.unwrap_or_default()).flatten_diff() {
            let _ = writeln!(out, "{}", hunk.header());
            for edit in hunk.edits() {
                let _ = writeln!(out, "{edit}");
            }
        }
    }

    fn diff_commit(&self, revision: &str, filter: DiffFilter) -> anyhow::Result<String> {
        let oid = self.resolve_revision(revision)?;
        let commit = self.store().load_commit(&oid)?;

        let changes = match commit.parentage() {
            Parentage::Root => self.store().tree_diff(None, Some(&oid))?,
            Parentage::Linear(parent) => self.store().tree_diff(Some(&parent), Some(&oid))?,
            // a merge commit's changes already exist on its parents
            Parentage::Merge(_) => return Ok(String::new()),
        };

        Ok(unified_diff_text(
            self.store(),
            &Self::apply_filter(changes, filter),
        )?)
    }

    fn diff_commits(&self, old: &str, new: &str, filter: DiffFilter) -> anyhow::Result<String> {
        let old_oid = self.resolve_revision(old)?;
        let new_oid = self.resolve_revision(new)?;

        let changes = self.store().tree_diff(Some(&old_oid), Some(&new_oid))?;

        Ok(unified_diff_text(
            self.store(),
            &Self::apply_filter(changes, filter),
        )?)
    }
}
