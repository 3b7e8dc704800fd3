//! Structural diff between two tree snapshots
//!
//! A recursive merge-join over the two trees' name-sorted entry lists:
//! entries present only in the old tree are deletions, only in the new tree
//! additions, present in both with differing ids modifications (recursing
//! when both sides are subtrees). Entries with identical ids are skipped
//! outright, content-addressing makes that an O(1) equality check.
//!
//! Either side may be `None`, the empty tree, which is how a repository's
//! first commit diffs. The two trees do not need to share any history.
//! Output is keyed by path in a `BTreeMap`, so iteration order is
//! path-lexicographic.

use crate::areas::store::ObjectStore;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::TreeEntry;
use crate::errors::CoreResult;
use bitflags::bitflags;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct DiffFilter: u32 {
        const ADDED = 0b0001;
        const DELETED = 0b0010;
        const MODIFIED = 0b0100;
    }
}

impl DiffFilter {
    pub fn try_parse(s: &str) -> Option<Self> {
        let mut filter = Self::empty();

        for c in s.chars() {
            match c {
                'A' => filter |= Self::ADDED,
                'D' => filter |= Self::DELETED,
                'M' => filter |= Self::MODIFIED,
                _ => return None,
            }
        }

        Some(filter)
    }
}

/// One path-level change record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    Added(TreeEntry),
    Deleted(TreeEntry),
    Modified { old: TreeEntry, new: TreeEntry },
}

impl TreeChange {
    pub fn from_entries(old: Option<TreeEntry>, new: Option<TreeEntry>) -> Option<Self> {
        match (old, new) {
            (None, Some(new)) => Some(TreeChange::Added(new)),
            (Some(old), None) => Some(TreeChange::Deleted(old)),
            (Some(old), Some(new)) if old != new => Some(TreeChange::Modified { old, new }),
            _ => None, // No change or both are None
        }
    }

    pub fn matches_filter(&self, filter: DiffFilter) -> bool {
        match self {
            TreeChange::Added(_) => filter.contains(DiffFilter::ADDED),
            TreeChange::Deleted(_) => filter.contains(DiffFilter::DELETED),
            TreeChange::Modified { .. } => filter.contains(DiffFilter::MODIFIED),
        }
    }

    pub fn old_entry(&self) -> Option<&TreeEntry> {
        match self {
            TreeChange::Deleted(entry) => Some(entry),
            TreeChange::Modified { old, .. } => Some(old),
            TreeChange::Added(_) => None,
        }
    }

    pub fn new_entry(&self) -> Option<&TreeEntry> {
        match self {
            TreeChange::Added(entry) => Some(entry),
            TreeChange::Modified { new, .. } => Some(new),
            TreeChange::Deleted(_) => None,
        }
    }

    pub fn status_char(&self) -> char {
        match self {
            TreeChange::Added(_) => 'A',
            TreeChange::Deleted(_) => 'D',
            TreeChange::Modified { .. } => 'M',
        }
    }
}

pub type ChangeSet = BTreeMap<PathBuf, TreeChange>;
pub type TreeEntryMap = BTreeMap<String, TreeEntry>;

/// Replay a change set onto a flattened tree
///
/// Applying `diff(A, B)` to the flattening of `A` reproduces the
/// flattening of `B` exactly; tests lean on this property.
pub fn apply_change_set(flat: &mut BTreeMap<PathBuf, TreeEntry>, changes: &ChangeSet) {
    for (path, change) in changes {
        match change.new_entry() {
            Some(entry) => {
                flat.insert(path.clone(), entry.clone());
            }
            None => {
                flat.remove(path);
            }
        }
    }
}

#[derive(Debug)]
pub struct TreeDiff<'r> {
    store: &'r ObjectStore,
    change_set: ChangeSet,
}

impl<'r> TreeDiff<'r> {
    pub fn new(store: &'r ObjectStore) -> Self {
        TreeDiff {
            store,
            change_set: BTreeMap::new(),
        }
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.change_set
    }

    pub fn into_changes(self) -> ChangeSet {
        self.change_set
    }

    /// Compare two trees (or commits, peeled to trees); `None` = empty tree
    pub fn compare_oids(
        &mut self,
        old: Option<&ObjectId>,
        new: Option<&ObjectId>,
        prefix: &Path,
    ) -> CoreResult<()> {
        if old == new {
            return Ok(());
        }

        let old_tree_entries = self.inflate_oid_to_tree_entries(old)?;
        let new_tree_entries = self.inflate_oid_to_tree_entries(new)?;

        self.detect_deletions(&old_tree_entries, &new_tree_entries, prefix)?;
        self.detect_additions(&old_tree_entries, &new_tree_entries, prefix)?;

        Ok(())
    }

    fn inflate_oid_to_tree_entries(&self, oid: Option<&ObjectId>) -> CoreResult<TreeEntryMap> {
        match oid {
            None => Ok(BTreeMap::new()),
            Some(oid) => Ok(self.store.peel_to_tree(oid)?.into_entries()),
        }
    }

    fn detect_deletions(
        &mut self,
        old: &TreeEntryMap,
        new: &TreeEntryMap,
        prefix: &Path,
    ) -> CoreResult<()> {
        for (name, entry) in old {
            let path = prefix.join(name);
            let other = new.get(name);

            if let Some(other) = other
                && other == entry
            {
                continue;
            }

            let tree_a_oid = if entry.is_tree() {
                Some(&entry.oid)
            } else {
                None
            };
            let tree_b_oid = if let Some(other) = other
                && other.is_tree()
            {
                Some(&other.oid)
            } else {
                None
            };

            self.compare_oids(tree_a_oid, tree_b_oid, &path)?;

            let blob_a = if entry.is_tree() {
                None
            } else {
                Some(entry.clone())
            };
            let blob_b = match other {
                Some(other) if !other.is_tree() => Some(other.clone()),
                _ => None,
            };

            if let Some(change) = TreeChange::from_entries(blob_a, blob_b) {
                self.change_set.insert(path, change);
            }
        }

        Ok(())
    }

    fn detect_additions(
        &mut self,
        old: &TreeEntryMap,
        new: &TreeEntryMap,
        prefix: &Path,
    ) -> CoreResult<()> {
        for (name, entry) in new {
            let path = prefix.join(name);

            if old.contains_key(name) {
                continue;
            }

            if entry.is_tree() {
                self.compare_oids(None, Some(&entry.oid), &path)?;
            } else {
                // This is a newly added blob file
                self.change_set
                    .insert(path, TreeChange::Added(entry.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::blob::Blob;
    use crate::artifacts::objects::entry_mode::EntryMode;
    use crate::artifacts::objects::tree::TreeBuilder;
    use pretty_assertions::assert_eq;

    fn store() -> (assert_fs::TempDir, ObjectStore) {
        let dir = assert_fs::TempDir::new().unwrap();
        let store = ObjectStore::new(dir.path().join("objects").into_boxed_path());
        (dir, store)
    }

    fn write_tree(store: &ObjectStore, files: &[(&str, &str)]) -> ObjectId {
        let mut builder = TreeBuilder::default();
        for (path, content) in files {
            let oid = store.put(&Blob::from_str(content)).unwrap();
            builder
                .insert(Path::new(path), TreeEntry::new(oid, EntryMode::Regular))
                .unwrap();
        }
        builder.write(&mut |tree| store.put(tree)).unwrap()
    }

    #[test]
    fn diff_of_identical_trees_is_empty() {
        let (_dir, store) = store();
        let tree = write_tree(&store, &[("a.txt", "x"), ("b/c.txt", "y")]);

        let changes = store.tree_diff(Some(&tree), Some(&tree)).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn diff_against_empty_tree_reports_every_entry_added() {
        let (_dir, store) = store();
        let tree = write_tree(&store, &[("a.txt", "x"), ("b/c.txt", "y")]);

        let changes = store.tree_diff(None, Some(&tree)).unwrap();

        assert_eq!(
            changes.keys().collect::<Vec<_>>(),
            vec![Path::new("a.txt"), Path::new("b/c.txt")]
        );
        assert!(changes
            .values()
            .all(|change| matches!(change, TreeChange::Added(_))));
    }

    #[test]
    fn diff_detects_modification_and_deletion() {
        let (_dir, store) = store();
        let old = write_tree(&store, &[("a.txt", "x"), ("gone.txt", "bye")]);
        let new = write_tree(&store, &[("a.txt", "y")]);

        let changes = store.tree_diff(Some(&old), Some(&new)).unwrap();

        assert!(matches!(
            changes.get(Path::new("a.txt")),
            Some(TreeChange::Modified { .. })
        ));
        assert!(matches!(
            changes.get(Path::new("gone.txt")),
            Some(TreeChange::Deleted(_))
        ));
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn diff_recurses_into_shared_subtrees() {
        let (_dir, store) = store();
        let old = write_tree(&store, &[("dir/inner.txt", "1"), ("dir/same.txt", "s")]);
        let new = write_tree(&store, &[("dir/inner.txt", "2"), ("dir/same.txt", "s")]);

        let changes = store.tree_diff(Some(&old), Some(&new)).unwrap();

        assert_eq!(changes.len(), 1);
        assert!(matches!(
            changes.get(Path::new("dir/inner.txt")),
            Some(TreeChange::Modified { .. })
        ));
    }

    #[test]
    fn applying_a_diff_reconstructs_the_new_tree() {
        let (_dir, store) = store();
        let old = write_tree(
            &store,
            &[("a.txt", "x"), ("b/c.txt", "y"), ("b/gone.txt", "z")],
        );
        let new = write_tree(&store, &[("a.txt", "x2"), ("b/c.txt", "y"), ("d.txt", "new")]);

        let changes = store.tree_diff(Some(&old), Some(&new)).unwrap();

        let mut flat = store.flatten_tree(Some(&old)).unwrap();
        apply_change_set(&mut flat, &changes);

        assert_eq!(flat, store.flatten_tree(Some(&new)).unwrap());
    }

    #[test]
    fn unrelated_trees_diff_without_complaint() {
        let (_dir, store) = store();
        let left = write_tree(&store, &[("only-left.txt", "l")]);
        let right = write_tree(&store, &[("only-right.txt", "r")]);

        let changes = store.tree_diff(Some(&left), Some(&right)).unwrap();

        assert!(matches!(
            changes.get(Path::new("only-left.txt")),
            Some(TreeChange::Deleted(_))
        ));
        assert!(matches!(
            changes.get(Path::new("only-right.txt")),
            Some(TreeChange::Added(_))
        ));
    }

    #[test]
    fn filter_parsing_accepts_known_letters_only() {
        assert_eq!(
            DiffFilter::try_parse("AM"),
            Some(DiffFilter::ADDED | DiffFilter::MODIFIED)
        );
        assert_eq!(DiffFilter::try_parse("X"), None);
    }
}
