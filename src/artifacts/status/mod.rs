//! Working tree status
//!
//! Per-path classification of the workspace against the staging set. The
//! report is derived on demand and never persisted.

use crate::areas::index::Index;
use crate::areas::workspace::Workspace;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::Object;
use crate::errors::CoreResult;
use colored::Colorize;
use derive_new::new;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// How a path compares to its staged entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkingFileStatus {
    Unmodified,
    Modified,
    Deleted,
    Untracked,
}

impl WorkingFileStatus {
    pub fn short_label(&self) -> &str {
        match self {
            WorkingFileStatus::Unmodified => " ",
            WorkingFileStatus::Modified => "M",
            WorkingFileStatus::Deleted => "D",
            WorkingFileStatus::Untracked => "??",
        }
    }

    pub fn colored_label(&self) -> colored::ColoredString {
        match self {
            WorkingFileStatus::Unmodified => " ".normal(),
            WorkingFileStatus::Modified => "M".red(),
            WorkingFileStatus::Deleted => "D".red(),
            WorkingFileStatus::Untracked => "??".red(),
        }
    }
}

/// Path-sorted status of every tracked or untracked file
pub type StatusReport = BTreeMap<PathBuf, WorkingFileStatus>;

/// Compares the staging set against the filesystem
#[derive(new)]
pub struct Inspector<'r> {
    index: &'r Index,
    workspace: &'r Workspace,
}

impl Inspector<'_> {
    pub fn report(&self) -> CoreResult<StatusReport> {
        let mut report = StatusReport::new();

        for entry in self.index.entries() {
            let status = if !self.workspace.file_exists(&entry.path) {
                WorkingFileStatus::Deleted
            } else {
                let stat = self.workspace.stat_file(&entry.path)?;
                if entry.stat_match(&stat) && entry.times_match(&stat) {
                    WorkingFileStatus::Unmodified
                } else if self.content_changed(entry)? {
                    WorkingFileStatus::Modified
                } else {
                    WorkingFileStatus::Unmodified
                }
            };
            report.insert(entry.path.clone(), status);
        }

        for path in self.workspace.list_files(None)? {
            if !self.index.is_tracked(&path) {
                report.insert(path, WorkingFileStatus::Untracked);
            }
        }

        Ok(report)
    }

    fn content_changed(
        &self,
        entry: &crate::artifacts::index::index_entry::IndexEntry,
    ) -> CoreResult<bool> {
        let blob = Blob::new(self.workspace.read_file(&entry.path)?);
        Ok(blob.object_id()? != entry.oid)
    }
}
