//! Checkout migration
//!
//! Turns a tree diff between the current and target commits into a plan of
//! file system actions (create, modify, delete plus the directories they
//! need), refuses the whole plan when any local change would be lost, and
//! only then touches the workspace and the staging index.
//!
//! All conflicts are detected before anything is written, so a failed
//! checkout leaves the repository exactly as it was.

use crate::areas::index::Index;
use crate::areas::store::ObjectStore;
use crate::areas::workspace::Workspace;
use crate::artifacts::checkout::conflict::{ConflictMessage, ConflictType};
use crate::artifacts::diff::tree_diff::{ChangeSet, TreeChange};
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::TreeEntry;
use crate::errors::{CoreError, CoreResult};
use bytes::Bytes;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Type of file system action required for checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Add,
    Delete,
    Modify,
}

pub type ActionsSet = HashMap<ActionType, Vec<(PathBuf, Option<TreeEntry>)>>;
pub type ConflictsSet = HashMap<ConflictType, Vec<PathBuf>>;

pub struct Migration<'r> {
    store: &'r ObjectStore,
    workspace: &'r Workspace,
    index: &'r mut Index,
    changes: ChangeSet,
    actions: ActionsSet,
    conflicts: ConflictsSet,
    /// Directories to create, parent-first
    mkdirs: BTreeSet<PathBuf>,
    /// Directories to remove once empty, child-first when reversed
    rmdirs: BTreeSet<PathBuf>,
}

impl<'r> Migration<'r> {
    pub fn new(
        store: &'r ObjectStore,
        workspace: &'r Workspace,
        index: &'r mut Index,
        changes: ChangeSet,
    ) -> Self {
        let actions = HashMap::from([
            (ActionType::Add, Vec::new()),
            (ActionType::Delete, Vec::new()),
            (ActionType::Modify, Vec::new()),
        ]);

        let conflicts = HashMap::from([
            (ConflictType::StaleFile, Vec::new()),
            (ConflictType::UntrackedOverwritten, Vec::new()),
        ]);

        Self {
            store,
            workspace,
            index,
            changes,
            actions,
            conflicts,
            mkdirs: BTreeSet::new(),
            rmdirs: BTreeSet::new(),
        }
    }

    pub fn actions_of(&self, action: ActionType) -> &[(PathBuf, Option<TreeEntry>)] {
        self.actions
            .get(&action)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn mkdirs(&self) -> &BTreeSet<PathBuf> {
        &self.mkdirs
    }

    pub fn rmdirs(&self) -> &BTreeSet<PathBuf> {
        &self.rmdirs
    }

    pub fn apply_changes(&mut self) -> CoreResult<()> {
        self.plan_changes()?;
        self.update_workspace()?;
        self.update_index()?;

        Ok(())
    }

    fn plan_changes(&mut self) -> CoreResult<()> {
        let changes: Vec<(PathBuf, TreeChange)> = self
            .changes
            .iter()
            .map(|(path, change)| (path.clone(), change.clone()))
            .collect();

        for (path, change) in &changes {
            self.check_for_conflict(path, change)?;
            self.record_change(path, change);
        }

        let errors = self.collect_errors();
        if !errors.is_empty() {
            tracing::debug!(conflicts = errors.len(), "checkout aborted");
            return Err(CoreError::Validation(format!(
                "\n{}\n\nAborting",
                errors.join("\n\n")
            )));
        }

        Ok(())
    }

    fn collect_errors(&self) -> Vec<String> {
        self.conflicts
            .iter()
            .filter_map(|(conflict_type, paths)| {
                if paths.is_empty() {
                    None
                } else {
                    let paths = paths
                        .iter()
                        .map(|p| format!("\t{}", p.display()))
                        .collect::<Vec<String>>();

                    let ConflictMessage { header, footer } = (*conflict_type).into();
                    Some(format!("{}\n{}\n{}", header, paths.join("\n"), footer))
                }
            })
            .collect::<Vec<_>>()
    }

    /// A changed path conflicts when the workspace disagrees with the index
    /// (local edits) or holds an untracked file the checkout would clobber.
    fn check_for_conflict(&mut self, path: &Path, change: &TreeChange) -> CoreResult<()> {
        let entry = self.index.entry_by_path(path);

        match entry {
            Some(entry) => {
                if self.workspace.file_exists(path) {
                    let workspace_oid =
                        Blob::new(self.workspace.read_file(path)?).object_id()?;
                    if workspace_oid != entry.oid {
                        self.conflicts
                            .entry(ConflictType::StaleFile)
                            .or_default()
                            .push(path.into());
                    }
                }
            }
            None => {
                let overwrites = matches!(
                    change,
                    TreeChange::Added(_) | TreeChange::Modified { .. }
                );
                if overwrites && self.workspace.file_exists(path) {
                    self.conflicts
                        .entry(ConflictType::UntrackedOverwritten)
                        .or_default()
                        .push(path.into());
                }
            }
        }

        Ok(())
    }

    fn record_change(&mut self, path: &Path, change: &TreeChange) {
        match change {
            TreeChange::Added(new_entry) => {
                self.record_parent_dirs(path, true);
                self.actions
                    .entry(ActionType::Add)
                    .or_default()
                    .push((path.into(), Some(new_entry.clone())));
            }
            TreeChange::Deleted(_) => {
                self.record_parent_dirs(path, false);
                self.actions
                    .entry(ActionType::Delete)
                    .or_default()
                    .push((path.into(), None));
            }
            TreeChange::Modified { new, .. } => {
                self.record_parent_dirs(path, true);
                self.actions
                    .entry(ActionType::Modify)
                    .or_default()
                    .push((path.into(), Some(new.clone())));
            }
        }
    }

    fn record_parent_dirs(&mut self, path: &Path, create: bool) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            if create {
                self.mkdirs.insert(ancestor.to_path_buf());
            } else {
                // pruning only succeeds once the directory is empty; the
                // workspace skips directories that still hold files
                self.rmdirs.insert(ancestor.to_path_buf());
            }
        }
    }

    fn update_workspace(&self) -> CoreResult<()> {
        self.workspace.apply_migration(self)
    }

    fn update_index(&mut self) -> CoreResult<()> {
        for (file_path, _) in self.actions_of(ActionType::Delete).to_vec() {
            self.index.remove(&file_path);
        }

        for action_type in [ActionType::Add, ActionType::Modify] {
            for (file_path, entry) in self.actions_of(action_type).to_vec() {
                let entry = entry.ok_or_else(|| {
                    CoreError::Validation(
                        "entry must be provided for add and modify actions".to_string(),
                    )
                })?;
                let stat = self.workspace.stat_file(&file_path)?;
                self.index
                    .add(IndexEntry::new(file_path, entry.oid.clone(), stat));
            }
        }

        Ok(())
    }

    pub fn load_blob_data(&self, oid: &ObjectId) -> CoreResult<Bytes> {
        Ok(self.store.load_blob(oid)?.content().clone())
    }
}
