//! Pluggable transport collaborator
//!
//! The core performs no network I/O. Clone, fetch and push are delegated to
//! a [`Transport`] implementation whose only observable effect is new
//! objects in the store and new or updated references; the core treats each
//! call as an opaque, already-completed operation.

use crate::artifacts::branch::branch_name::RefName;
use crate::errors::CoreResult;
use std::path::Path;

pub trait Transport {
    /// Materialize the repository at `url` under `destination`
    ///
    /// A bare clone carries only the metadata directory, no working tree.
    fn clone_repo(&self, url: &str, destination: &Path, bare: bool) -> CoreResult<()>;

    /// Update remote-tracking references for `remote`, returning the ones
    /// that changed
    fn fetch(&self, remote: &str) -> CoreResult<Vec<RefName>>;

    /// Publish local references matching `refspec`
    fn push(&self, refspec: &str) -> CoreResult<()>;
}
