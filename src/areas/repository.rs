//! Repository facade
//!
//! Composes the object store, reference store, staging index and workspace
//! into one handle. The facade itself holds no history state: operations
//! take and return explicit object ids, and the only ambient concept is
//! which reference HEAD is attached to, which lives in the reference store,
//! not in this struct.

use crate::areas::config::Config;
use crate::areas::index::Index;
use crate::areas::refs::RefStore;
use crate::areas::store::ObjectStore;
use crate::areas::workspace::Workspace;
use crate::artifacts::objects::commit::Identity;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::CoreError;
use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Name of the repository metadata directory
pub const META_DIR: &str = ".mingit";

pub struct Repository {
    path: Box<Path>,
    writer: RefCell<Box<dyn std::io::Write>>,
    index: Arc<Mutex<Index>>,
    store: ObjectStore,
    workspace: Workspace,
    refs: RefStore,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Repository {
    pub fn new(path: &str, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        let path = Path::new(path);
        if !path.exists() {
            std::fs::create_dir_all(path)?;
        }
        let path = path.canonicalize()?;

        let meta = path.join(META_DIR);
        let index = Index::new(meta.join("index").into_boxed_path());
        let store = ObjectStore::new(meta.join("objects").into_boxed_path());
        let workspace = Workspace::new(path.clone().into_boxed_path());
        let refs = RefStore::new(meta.into_boxed_path());

        Ok(Repository {
            path: path.into_boxed_path(),
            writer: RefCell::new(writer),
            index: Arc::new(Mutex::new(index)),
            store,
            workspace,
            refs,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn meta_path(&self) -> std::path::PathBuf {
        self.path.join(META_DIR)
    }

    pub fn writer(&'_ self) -> std::cell::RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn index(&self) -> Arc<Mutex<Index>> {
        self.index.clone()
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn refs(&self) -> &RefStore {
        &self.refs
    }

    pub fn config(&self) -> anyhow::Result<Config> {
        Ok(Config::load(&self.meta_path())?)
    }

    pub fn author(&self) -> anyhow::Result<Identity> {
        Ok(self.config()?.author())
    }

    /// Resolve a user-supplied revision to a commit id
    ///
    /// References win over object ids; a hex-looking string that names no
    /// reference is resolved as an abbreviated or full object id and peeled
    /// to the commit it denotes.
    pub fn resolve_revision(&self, revision: &str) -> anyhow::Result<ObjectId> {
        match self.refs.resolve(revision) {
            Ok(oid) => Ok(self.store.peel_to_commit(&oid)?),
            Err(CoreError::NoSuchRef(_)) => {
                let looks_like_oid =
                    !revision.is_empty() && revision.chars().all(|c| c.is_ascii_hexdigit());
                if looks_like_oid {
                    // an undersized or ambiguous prefix is reported as such
                    if let Some(oid) = self.store.resolve_prefix(revision)? {
                        return Ok(self.store.peel_to_commit(&oid)?);
                    }
                }

                Err(CoreError::NoSuchRef(revision.to_string()).into())
            }
            Err(error) => Err(error.into()),
        }
    }
}
