//! The typed failure taxonomy for the core (spec §7).
//!
//! Every fallible core operation returns [`CoreResult`]; the façade layer
//! adapts these typed values into `anyhow` as needed. The variants mirror the
//! spec §5/§7 taxonomy, grounded on the original `pygit2_utils` exception set
//! (`NoSuchRef`, `NoSuchBranch`, `NothingToMerge`, `MergeConflicts`) extended
//! with the spec's storage/reference failures. Only [`CoreError::ConcurrentUpdate`]
//! is designed for caller retry; [`CoreError::NothingToMerge`] and
//! [`CoreError::MergeConflicts`] are expected branches, not faults.

use std::path::PathBuf;

use thiserror::Error;

use crate::artifacts::objects::object_id::ObjectId;

/// Convenience alias for results produced by the core.
pub type CoreResult<T> = Result<T, CoreError>;

/// The core's typed error taxonomy.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An object was requested by id but is not present in the store.
    #[error("object {0} could not be found")]
    NotFound(ObjectId),

    /// A stored object failed its digest check when read back.
    #[error("object {0} is corrupt: digest mismatch")]
    CorruptObject(ObjectId),

    /// A reference was looked up but could not be resolved.
    #[error("reference {0} could not be found")]
    NoSuchRef(String),

    /// A branch was looked up but could not be found.
    #[error("branch {0} could not be found")]
    NoSuchBranch(String),

    /// A destination name or path is already occupied.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Input was malformed (unknown scope flag, undersized prefix, bad format).
    #[error("{0}")]
    Validation(String),

    /// The merge target is already up to date; there is nothing to merge.
    #[error("nothing to merge, the branches are already in sync")]
    NothingToMerge,

    /// A three-way merge produced overlapping incompatible changes.
    #[error("merge conflicts in {} path(s)", .0.len())]
    MergeConflicts(Vec<PathBuf>),

    /// A reference compare-and-swap lost a race against a concurrent writer.
    #[error("concurrent update to {0}")]
    ConcurrentUpdate(String),

    /// Two histories share no merge base.
    #[error("the histories are unrelated and cannot be merged")]
    UnrelatedHistories,

    /// An underlying I/O operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
