//! Patch and unified-diff rendering
//!
//! Boundary-only text formatting: turns change sets into unified diff text
//! and commits into mbox-style patch blocks. None of the core algorithms
//! consume this output.

use crate::areas::store::ObjectStore;
use crate::artifacts::diff::text_diff::MyersDiff;
use crate::artifacts::diff::tree_diff::{ChangeSet, TreeChange};
use crate::artifacts::objects::commit::{Commit, Parentage};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::TreeEntry;
use crate::errors::CoreResult;
use std::fmt::Write;
use std::path::Path;

/// Fixed sentinel date on the `From <id>` line of every patch block
const PATCH_SENTINEL_DATE: &str = "Mon Sep 17 00:00:00 2001";

/// Short id shown for the missing side of an addition or deletion
const NULL_SHORT_OID: &str = "0000000";

/// Render a change set as unified diff text
pub fn unified_diff_text(store: &ObjectStore, changes: &ChangeSet) -> CoreResult<String> {
    let mut out = String::new();

    for (path, change) in changes {
        render_change(store, &mut out, path, change)?;
    }

    Ok(out)
}

fn render_change(
    store: &ObjectStore,
    out: &mut String,
    path: &Path,
    change: &TreeChange,
) -> CoreResult<()> {
    let old = change.old_entry();
    let new = change.new_entry();

    let _ = writeln!(
        out,
        "diff --git a/{} b/{}",
        path.display(),
        path.display()
    );

    match (old, new) {
        (None, Some(new)) => {
            let _ = writeln!(out, "new file mode {}", new.mode.as_str());
        }
        (Some(old), None) => {
            let _ = writeln!(out, "deleted file mode {}", old.mode.as_str());
        }
        (Some(old), Some(new)) if old.mode != new.mode => {
            let _ = writeln!(out, "old mode {}", old.mode.as_str());
            let _ = writeln!(out, "new mode {}", new.mode.as_str());
        }
        _ => {}
    }

    let old_short = old.map_or(NULL_SHORT_OID.to_string(), |e| e.oid.to_short_oid());
    let new_short = new.map_or(NULL_SHORT_OID.to_string(), |e| e.oid.to_short_oid());
    match (old, new) {
        (Some(old), Some(new)) if old.mode == new.mode => {
            let _ = writeln!(out, "index {old_short}..{new_short} {}", old.mode.as_str());
        }
        _ => {
            let _ = writeln!(out, "index {old_short}..{new_short}");
        }
    }

    let _ = match old {
        Some(_) => writeln!(out, "--- a/{}", path.display()),
        None => writeln!(out, "--- /dev/null"),
    };
    let _ = match new {
        Some(_) => writeln!(out, "+++ b/{}", path.display()),
        None => writeln!(out, "+++ /dev/null"),
    };

    let old_text = load_text(store, old)?;
    let new_text = load_text(store, new)?;

    for hunk in MyersDiff::new(&old_text, &new_text).flatten_diff() {
        let _ = writeln!(out, "{}", hunk.header());
        for edit in hunk.edits() {
            let _ = writeln!(out, "{edit}");
        }
    }

    Ok(())
}

fn load_text(store: &ObjectStore, entry: Option<&TreeEntry>) -> CoreResult<String> {
    match entry {
        Some(entry) => Ok(store.load_blob(&entry.oid)?.content_utf8()),
        None => Ok(String::new()),
    }
}

/// Render commits as concatenated mbox-style patch blocks
///
/// The `[PATCH i/N]` numbering appears only when more than one commit is
/// rendered. A merge commit renders with an empty diff body, its combined
/// changes already exist on its parents.
pub fn format_patch(store: &ObjectStore, oids: &[ObjectId]) -> CoreResult<String> {
    let total = oids.len();
    let mut blocks = Vec::new();

    for (position, oid) in oids.iter().enumerate() {
        let commit = store.load_commit(oid)?;
        blocks.push(render_commit_patch(store, oid, &commit, position + 1, total)?);
    }

    Ok(blocks.join("\n"))
}

fn render_commit_patch(
    store: &ObjectStore,
    oid: &ObjectId,
    commit: &Commit,
    position: usize,
    total: usize,
) -> CoreResult<String> {
    let author = commit.author();
    let subject = if total > 1 {
        format!("[PATCH {position}/{total}] {}", commit.short_message())
    } else {
        format!("[PATCH] {}", commit.short_message())
    };

    let diff_text = match commit.parentage() {
        Parentage::Root => {
            let changes = store.tree_diff(None, Some(oid))?;
            unified_diff_text(store, &changes)?
        }
        Parentage::Linear(parent) => {
            let changes = store.tree_diff(Some(&parent), Some(oid))?;
            unified_diff_text(store, &changes)?
        }
        Parentage::Merge(_) => String::new(),
    };

    let mut block = String::new();
    let _ = writeln!(block, "From {oid} {PATCH_SENTINEL_DATE}");
    let _ = writeln!(block, "From: {} <{}>", author.name(), author.email());
    let _ = writeln!(block, "Date: {}", author.rfc2822_timestamp());
    let _ = writeln!(block, "Subject: {subject}");
    let _ = writeln!(block);

    let body: Vec<&str> = commit.message().lines().skip(1).collect();
    let body = body.join("\n");
    let body = body.trim();
    if !body.is_empty() {
        let _ = writeln!(block, "{body}");
    }

    let _ = writeln!(block, "---");
    let _ = writeln!(block);
    block.push_str(&diff_text);

    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::blob::Blob;
    use crate::artifacts::objects::commit::Identity;
    use crate::artifacts::objects::entry_mode::EntryMode;
    use crate::artifacts::objects::tree::TreeBuilder;
    use pretty_assertions::assert_eq;

    struct Harness {
        _dir: assert_fs::TempDir,
        store: ObjectStore,
    }

    impl Harness {
        fn new() -> Self {
            let dir = assert_fs::TempDir::new().unwrap();
            let store = ObjectStore::new(dir.path().join("objects").into_boxed_path());
            Harness { _dir: dir, store }
        }

        fn author(&self) -> Identity {
            let timestamp =
                chrono::DateTime::parse_from_rfc3339("2024-05-01T09:30:00+00:00").unwrap();
            Identity::at("Alice".to_string(), "alice@example.com".to_string(), timestamp)
        }

        fn commit(
            &self,
            parents: Vec<ObjectId>,
            files: &[(&str, &str)],
            message: &str,
        ) -> ObjectId {
            let mut builder = TreeBuilder::default();
            for (path, content) in files {
                let oid = self.store.put(&Blob::from_str(content)).unwrap();
                builder
                    .insert(Path::new(path), TreeEntry::new(oid, EntryMode::Regular))
                    .unwrap();
            }
            let tree = builder.write(&mut |tree| self.store.put(tree)).unwrap();
            let commit = Commit::new(parents, tree, self.author(), message.to_string());
            self.store.put(&commit).unwrap()
        }
    }

    #[test]
    fn single_patch_has_no_numbering() {
        let h = Harness::new();
        let root = h.commit(vec![], &[("a.txt", "x\n")], "Add a.txt\n\nWith details.");

        let patch = format_patch(&h.store, &[root.clone()]).unwrap();

        assert!(patch.starts_with(&format!("From {root} Mon Sep 17 00:00:00 2001\n")));
        assert!(patch.contains("From: Alice <alice@example.com>\n"));
        assert!(patch.contains("Subject: [PATCH] Add a.txt\n"));
        assert!(patch.contains("With details.\n---\n"));
        assert!(patch.contains("diff --git a/a.txt b/a.txt"));
        assert!(patch.contains("new file mode 100644"));
        assert!(patch.contains("+x"));
    }

    #[test]
    fn multiple_patches_are_numbered_and_separated() {
        let h = Harness::new();
        let first = h.commit(vec![], &[("a.txt", "x\n")], "first");
        let second = h.commit(vec![first.clone()], &[("a.txt", "y\n")], "second");

        let patch = format_patch(&h.store, &[first, second]).unwrap();

        assert!(patch.contains("Subject: [PATCH 1/2] first"));
        assert!(patch.contains("Subject: [PATCH 2/2] second"));
        assert!(patch.contains("-x"));
        assert!(patch.contains("+y"));
    }

    #[test]
    fn merge_commits_render_with_an_empty_diff() {
        let h = Harness::new();
        let base = h.commit(vec![], &[("a.txt", "x\n")], "base");
        let left = h.commit(vec![base.clone()], &[("a.txt", "y\n")], "left");
        let right = h.commit(vec![base.clone()], &[("a.txt", "x\n"), ("b.txt", "z\n")], "right");
        let merge = h.commit(
            vec![left, right],
            &[("a.txt", "y\n"), ("b.txt", "z\n")],
            "merge",
        );

        let patch = format_patch(&h.store, &[merge]).unwrap();

        assert!(patch.contains("Subject: [PATCH] merge"));
        assert!(!patch.contains("diff --git"));
    }

    #[test]
    fn deletion_renders_dev_null_side() {
        let h = Harness::new();
        let first = h.commit(vec![], &[("a.txt", "x\n"), ("b.txt", "keep\n")], "first");
        let second = h.commit(vec![first.clone()], &[("b.txt", "keep\n")], "second");

        let patch = format_patch(&h.store, &[second]).unwrap();

        assert!(patch.contains("deleted file mode 100644"));
        assert!(patch.contains("+++ /dev/null"));
        assert!(patch.contains("-x"));
    }

    #[test]
    fn unified_diff_orders_paths_lexicographically() {
        let h = Harness::new();
        let old = h.commit(vec![], &[("b.txt", "1\n")], "old");
        let new = h.commit(vec![old.clone()], &[("a.txt", "2\n"), ("b.txt", "1\n"), ("c.txt", "3\n")], "new");

        let changes = h.store.tree_diff(Some(&old), Some(&new)).unwrap();
        let text = unified_diff_text(&h.store, &changes).unwrap();

        let a = text.find("a/a.txt").unwrap();
        let c = text.find("a/c.txt").unwrap();
        assert!(a < c);
        assert_eq!(text.matches("diff --git").count(), 2);
    }
}
