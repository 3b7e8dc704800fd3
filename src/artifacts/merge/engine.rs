//! Merge engine
//!
//! One merge invocation walks `Classify -> {FastForward | ThreeWay |
//! UpToDate} -> Done`:
//!
//! - the incoming tip already reachable: nothing to merge, reported as a
//!   distinct outcome so callers never create an empty commit;
//! - the current tip is the merge base: fast-forward, the branch reference
//!   moves to the incoming tip and no commit object is created;
//! - otherwise three-way: diff base->current and base->incoming, combine
//!   per path, and either report every conflicting path at once or store
//!   the merged tree plus a two-parent commit.
//!
//! Failure leaves the repository untouched: conflicts are collected before
//! anything is written, and the final reference update is a compare-and-swap
//! whose lost race surfaces separately from content conflicts. A commit
//! object written before a lost race stays unreferenced, which is harmless
//! in a content-addressed store.

use crate::areas::refs::RefStore;
use crate::areas::store::{CommitCache, ObjectStore};
use crate::artifacts::branch::branch_name::RefName;
use crate::artifacts::diff::tree_diff::ChangeSet;
use crate::artifacts::graph::walker::HistoryWalker;
use crate::artifacts::objects::commit::{Commit, Identity};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::TreeBuilder;
use crate::errors::{CoreError, CoreResult};
use derive_new::new;
use std::path::PathBuf;

/// How a successful merge concluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The branch reference moved forward along existing history
    FastForwarded(ObjectId),
    /// A new two-parent commit was created
    Merged(ObjectId),
}

impl MergeOutcome {
    pub fn commit_oid(&self) -> &ObjectId {
        match self {
            MergeOutcome::FastForwarded(oid) | MergeOutcome::Merged(oid) => oid,
        }
    }
}

#[derive(new)]
pub struct MergeEngine<'r> {
    store: &'r ObjectStore,
    refs: &'r RefStore,
}

impl MergeEngine<'_> {
    /// Merge `incoming` into the branch currently at `current`
    ///
    /// `branch_ref` is the reference that will be updated; `current` must
    /// be its resolved tip at the time the caller decided to merge, so a
    /// concurrent move of the branch is caught by the compare-and-swap.
    pub fn merge(
        &self,
        branch_ref: &RefName,
        current: &ObjectId,
        incoming: &ObjectId,
        message: &str,
        author: Identity,
    ) -> CoreResult<MergeOutcome> {
        if current == incoming {
            return Err(CoreError::NothingToMerge);
        }

        let cache = CommitCache::new();
        let walker = HistoryWalker::new(|oid: &ObjectId| cache.get_or_load(self.store, oid));

        let base = walker
            .merge_base(current, incoming)?
            .ok_or(CoreError::UnrelatedHistories)?;
        tracing::debug!(%base, %current, %incoming, "merge classified");

        if &base == incoming {
            // the incoming tip is already part of this history
            return Err(CoreError::NothingToMerge);
        }

        if &base == current {
            tracing::debug!(branch = %branch_ref, target = %incoming, "fast-forward");
            self.refs
                .compare_and_swap(branch_ref.as_ref_path(), Some(current), incoming)?;
            return Ok(MergeOutcome::FastForwarded(incoming.clone()));
        }

        self.three_way(branch_ref, &base, current, incoming, message, author)
    }

    fn three_way(
        &self,
        branch_ref: &RefName,
        base: &ObjectId,
        current: &ObjectId,
        incoming: &ObjectId,
        message: &str,
        author: Identity,
    ) -> CoreResult<MergeOutcome> {
        let ours = self.store.tree_diff(Some(base), Some(current))?;
        let theirs = self.store.tree_diff(Some(base), Some(incoming))?;

        let conflicts = Self::conflicting_paths(&ours, &theirs);
        if !conflicts.is_empty() {
            tracing::debug!(paths = conflicts.len(), "three-way merge conflicts");
            return Err(CoreError::MergeConflicts(conflicts));
        }

        // Start from our side's snapshot and replay the changes only their
        // side made; a path both sides changed identically is already in
        // place, so the replay is a no-op there.
        let mut merged = self.store.flatten_tree(Some(current))?;
        for (path, change) in &theirs {
            match change.new_entry() {
                Some(entry) => {
                    merged.insert(path.clone(), entry.clone());
                }
                None => {
                    merged.remove(path);
                }
            }
        }

        let builder =
            TreeBuilder::from_entries(merged.iter().map(|(path, entry)| (path.as_path(), entry)))?;
        let tree_oid = builder.write(&mut |tree| self.store.put(tree))?;

        let commit = Commit::new(
            vec![current.clone(), incoming.clone()],
            tree_oid,
            author,
            message.to_string(),
        );
        let commit_oid = self.store.put(&commit)?;

        self.refs
            .compare_and_swap(branch_ref.as_ref_path(), Some(current), &commit_oid)?;

        tracing::debug!(commit = %commit_oid, "three-way merge committed");
        Ok(MergeOutcome::Merged(commit_oid))
    }

    /// Paths both sides touched with different resulting content
    fn conflicting_paths(ours: &ChangeSet, theirs: &ChangeSet) -> Vec<PathBuf> {
        theirs
            .iter()
            .filter(|(path, their_change)| {
                ours.get(*path)
                    .is_some_and(|our_change| our_change.new_entry() != their_change.new_entry())
            })
            .map(|(path, _)| path.clone())
            .collect()
    }
}
