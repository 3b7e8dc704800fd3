//! References (branches, tags, HEAD)
//!
//! References are the only mutable state in the repository: human-readable
//! names mapping to commit ids. They are stored as text files containing
//! either a 40-character id (direct) or `ref: <path>` (symbolic; only HEAD
//! is symbolic here, and symbolic chains are at most one level deep).
//!
//! ## Reference layout
//!
//! - `HEAD`: the current branch (`ref: refs/heads/x`) or a raw id (detached)
//! - `refs/heads/*`: local branch tips
//! - `refs/tags/*`: tag objects
//! - `refs/remotes/*`: remote-tracking tips, written by fetch
//!
//! ## Mutation
//!
//! Every update after creation goes through [`RefStore::compare_and_swap`]:
//! an exclusive file lock, a read of the current value, and a write only if
//! it matches the expected one. A mismatch reports
//! [`CoreError::ConcurrentUpdate`], which callers resolve by re-resolving
//! and retrying; nothing retries internally.

use crate::artifacts::branch::REF_ALIASES;
use crate::artifacts::branch::branch_name::{BranchName, RefName};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{CoreError, CoreResult};
use derive_new::new;
use file_guard::Lock;
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::DerefMut;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref: (.+)$";

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

/// Which references a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    Local,
    Remote,
    #[default]
    All,
}

impl Scope {
    const ALLOWED: [&'static str; 3] = ["local", "remote", "all"];

    pub fn try_parse(value: &str) -> CoreResult<Self> {
        match value {
            "local" => Ok(Scope::Local),
            "remote" => Ok(Scope::Remote),
            "all" => Ok(Scope::All),
            other => Err(CoreError::Validation(format!(
                "invalid scope '{other}', allowed values are {}",
                Self::ALLOWED.join(", ")
            ))),
        }
    }
}

/// Parsed content of a reference file
#[derive(Debug, Clone)]
enum SymRefOrOid {
    SymRef(RefName),
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read_from(path: &Path) -> CoreResult<Option<SymRefOrOid>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        let symref_match = regex::Regex::new(SYMREF_REGEX)
            .map_err(|_| CoreError::Validation("invalid symref regex".to_string()))?
            .captures(content);
        if let Some(symref_match) = symref_match {
            Ok(Some(SymRefOrOid::SymRef(RefName::new(
                symref_match[1].to_string(),
            ))))
        } else {
            Ok(Some(SymRefOrOid::Oid(ObjectId::try_parse(
                content.to_string(),
            )?)))
        }
    }
}

/// Reference store rooted at the repository metadata directory
#[derive(Debug, new)]
pub struct RefStore {
    /// Path to the metadata directory (typically `.mingit`)
    path: Box<Path>,
}

impl RefStore {
    /// Resolve a name to the object id it ultimately points at
    ///
    /// Accepts `HEAD` (and its aliases), full `refs/...` paths, and short
    /// branch/tag/remote names. Follows at most one level of symbolic
    /// indirection; a dangling link reports [`CoreError::NoSuchRef`] and a
    /// symbolic ref behind a symbolic ref is a validation error.
    pub fn resolve(&self, name: &str) -> CoreResult<ObjectId> {
        let name = REF_ALIASES.get(name).copied().unwrap_or(name);
        let path = self
            .find_ref_file(name)
            .ok_or_else(|| CoreError::NoSuchRef(name.to_string()))?;

        match SymRefOrOid::read_from(&path)? {
            Some(SymRefOrOid::Oid(oid)) => Ok(oid),
            Some(SymRefOrOid::SymRef(target)) => {
                let target_path = self.path.join(target.as_ref_path());
                match SymRefOrOid::read_from(&target_path)? {
                    Some(SymRefOrOid::Oid(oid)) => Ok(oid),
                    Some(SymRefOrOid::SymRef(_)) => Err(CoreError::Validation(format!(
                        "reference {name} points at another symbolic reference"
                    ))),
                    None => Err(CoreError::NoSuchRef(target.as_ref_path().to_string())),
                }
            }
            None => Err(CoreError::NoSuchRef(name.to_string())),
        }
    }

    /// Atomically update a reference, expecting its current value
    ///
    /// Succeeds only when the reference currently equals `expected`
    /// (`None` = must not exist yet, which is how the first commit lands on
    /// an unborn branch). Anything else is a lost race reported as
    /// [`CoreError::ConcurrentUpdate`], retryable after re-resolving.
    pub fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<&ObjectId>,
        new: &ObjectId,
    ) -> CoreResult<()> {
        let path = self.direct_ref_file(name)?;

        std::fs::create_dir_all(path.parent().ok_or_else(|| {
            CoreError::Validation(format!("invalid reference path {}", path.display()))
        })?)?;

        let mut ref_file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;

        let mut content = String::new();
        lock.deref_mut().read_to_string(&mut content)?;
        let content = content.trim();
        let current = if content.is_empty() {
            None
        } else {
            Some(ObjectId::try_parse(content.to_string())?)
        };

        if current.as_ref() != expected {
            return Err(CoreError::ConcurrentUpdate(name.to_string()));
        }

        let file = lock.deref_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(new.as_ref().as_bytes())?;
        file.sync_all()?;

        Ok(())
    }

    /// Create a new reference, failing if the name is taken
    pub fn create(&self, name: &RefName, oid: &ObjectId) -> CoreResult<()> {
        let path = self.path.join(name.as_ref_path());

        if path.exists() {
            return Err(CoreError::AlreadyExists(name.as_ref_path().to_string()));
        }

        self.write_ref_file(path.into_boxed_path(), oid.as_ref().to_string())
    }

    pub fn create_branch(&self, name: &BranchName, source_oid: &ObjectId) -> CoreResult<()> {
        self.create(&RefName::branch(name), source_oid)
    }

    pub fn delete_branch(&self, name: &BranchName) -> CoreResult<ObjectId> {
        let branch_path = self
            .heads_path()
            .join(name.as_ref())
            .into_boxed_path();

        match SymRefOrOid::read_from(&branch_path)? {
            Some(SymRefOrOid::Oid(oid)) => {
                std::fs::remove_file(branch_path.as_ref())?;
                self.prune_empty_parent_dirs(branch_path.as_ref())?;

                Ok(oid)
            }
            _ => Err(CoreError::NoSuchBranch(name.to_string())),
        }
    }

    /// List reference names in the given scope
    pub fn list(&self, scope: Scope) -> CoreResult<Vec<RefName>> {
        let roots: Vec<PathBuf> = match scope {
            Scope::Local => vec![self.heads_path().into()],
            Scope::Remote => vec![self.remotes_path().into()],
            Scope::All => vec![self.heads_path().into(), self.remotes_path().into()],
        };

        let mut refs = Vec::new();
        for root in &roots {
            refs.extend(self.list_refs(root)?);
        }
        refs.sort();

        Ok(refs)
    }

    pub fn list_tags(&self) -> CoreResult<Vec<RefName>> {
        let mut tags = self.list_refs(&self.tags_path())?;
        tags.sort();
        Ok(tags)
    }

    fn list_refs(&self, root: &Path) -> CoreResult<Vec<RefName>> {
        if !root.exists() {
            return Ok(Vec::new());
        }

        Ok(WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                if entry.path().is_file() {
                    let relative_path = entry.path().strip_prefix(self.path.as_ref()).ok()?;
                    Some(RefName::new(relative_path.to_string_lossy().to_string()))
                } else {
                    None
                }
            })
            .collect::<Vec<_>>())
    }

    /// Attach HEAD to a branch, or detach it onto a raw id
    pub fn set_head(&self, target: &str, raw_ref: String) -> CoreResult<()> {
        let target_path = self.heads_path().join(target).into_boxed_path();

        if target_path.exists() {
            self.write_ref_file(self.head_path(), format!("ref: refs/heads/{target}"))
        } else {
            self.write_ref_file(self.head_path(), raw_ref)
        }
    }

    /// Id HEAD points at, `None` before the first commit
    pub fn read_head(&self) -> CoreResult<Option<ObjectId>> {
        match self.resolve(HEAD_REF_NAME) {
            Ok(oid) => Ok(Some(oid)),
            Err(CoreError::NoSuchRef(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// The reference HEAD is attached to, or HEAD itself when detached
    pub fn current_ref(&self) -> CoreResult<RefName> {
        match SymRefOrOid::read_from(&self.head_path())? {
            Some(SymRefOrOid::SymRef(target)) => Ok(target),
            Some(SymRefOrOid::Oid(_)) | None => Ok(RefName::head()),
        }
    }

    /// Read a branch tip without following HEAD
    pub fn read_branch(&self, name: &BranchName) -> CoreResult<Option<ObjectId>> {
        let branch_path = self.heads_path().join(name.as_ref());
        match SymRefOrOid::read_from(&branch_path)? {
            Some(SymRefOrOid::Oid(oid)) => Ok(Some(oid)),
            _ => Ok(None),
        }
    }

    /// The file a CAS on `name` must touch, following HEAD's one symbolic hop
    fn direct_ref_file(&self, name: &str) -> CoreResult<PathBuf> {
        let name = REF_ALIASES.get(name).copied().unwrap_or(name);

        let path = self.find_ref_file(name).unwrap_or_else(|| {
            // an unborn name: HEAD and refs/... land at their literal path,
            // a short branch name lands under refs/heads
            if name == HEAD_REF_NAME || name.starts_with("refs/") {
                self.path.join(name)
            } else {
                self.heads_path().join(name)
            }
        });

        match SymRefOrOid::read_from(&path)? {
            Some(SymRefOrOid::SymRef(target)) => Ok(self.path.join(target.as_ref_path())),
            _ => Ok(path),
        }
    }

    /// Search `.mingit`, `refs/heads`, `refs/tags` and `refs/remotes` for a name
    fn find_ref_file(&self, name: &str) -> Option<PathBuf> {
        [
            self.path.to_path_buf(),
            self.heads_path().into(),
            self.tags_path().into(),
            self.remotes_path().into(),
        ]
        .iter()
        .map(|base_path| base_path.join(name))
        .find(|path| path.is_file())
    }

    fn write_ref_file(&self, path: Box<Path>, raw_ref: String) -> CoreResult<()> {
        std::fs::create_dir_all(path.parent().ok_or_else(|| {
            CoreError::Validation(format!("invalid reference path {}", path.display()))
        })?)?;

        let mut ref_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(raw_ref.as_bytes())?;

        Ok(())
    }

    fn prune_empty_parent_dirs(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent()
            && parent != self.heads_path().as_ref()
            && parent.read_dir()?.next().is_none()
        {
            std::fs::remove_dir(parent)?;
            self.prune_empty_parent_dirs(parent)?;
        }

        Ok(())
    }

    pub fn head_path(&self) -> Box<Path> {
        self.path.join(HEAD_REF_NAME).into_boxed_path()
    }

    pub fn refs_path(&self) -> Box<Path> {
        self.path.join("refs").into_boxed_path()
    }

    pub fn heads_path(&self) -> Box<Path> {
        self.refs_path().join("heads").into_boxed_path()
    }

    pub fn tags_path(&self) -> Box<Path> {
        self.refs_path().join("tags").into_boxed_path()
    }

    pub fn remotes_path(&self) -> Box<Path> {
        self.refs_path().join("remotes").into_boxed_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn refs() -> (assert_fs::TempDir, RefStore) {
        let dir = assert_fs::TempDir::new().unwrap();
        let root = dir.path().join(".mingit");
        std::fs::create_dir_all(root.join("refs").join("heads")).unwrap();
        (dir, RefStore::new(root.into_boxed_path()))
    }

    fn oid(fill: char) -> ObjectId {
        ObjectId::try_parse(fill.to_string().repeat(40)).unwrap()
    }

    fn branch(name: &str) -> BranchName {
        BranchName::try_parse(name.to_string()).unwrap()
    }

    #[test]
    fn create_then_resolve_round_trips() {
        let (_dir, refs) = refs();
        refs.create_branch(&branch("master"), &oid('a')).unwrap();

        assert_eq!(refs.resolve("master").unwrap(), oid('a'));
        assert_eq!(refs.resolve("refs/heads/master").unwrap(), oid('a'));
    }

    #[test]
    fn create_refuses_an_occupied_name() {
        let (_dir, refs) = refs();
        refs.create_branch(&branch("master"), &oid('a')).unwrap();

        let err = refs.create_branch(&branch("master"), &oid('b')).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists(_)));
    }

    #[test]
    fn resolve_of_missing_name_is_no_such_ref() {
        let (_dir, refs) = refs();

        let err = refs.resolve("phantom").unwrap_err();
        assert!(matches!(err, CoreError::NoSuchRef(_)));
    }

    #[test]
    fn resolve_follows_head_one_level() {
        let (_dir, refs) = refs();
        refs.create_branch(&branch("master"), &oid('a')).unwrap();
        refs.set_head("master", oid('a').as_ref().to_string())
            .unwrap();

        assert_eq!(refs.resolve("HEAD").unwrap(), oid('a'));
        assert_eq!(refs.resolve("@").unwrap(), oid('a'));
        assert_eq!(
            refs.current_ref().unwrap().as_ref_path(),
            "refs/heads/master"
        );
    }

    #[test]
    fn compare_and_swap_succeeds_on_matching_expectation() {
        let (_dir, refs) = refs();
        refs.create_branch(&branch("master"), &oid('a')).unwrap();

        refs.compare_and_swap("refs/heads/master", Some(&oid('a')), &oid('b'))
            .unwrap();

        assert_eq!(refs.resolve("master").unwrap(), oid('b'));
    }

    #[test]
    fn compare_and_swap_detects_a_lost_race() {
        let (_dir, refs) = refs();
        refs.create_branch(&branch("master"), &oid('a')).unwrap();

        // another writer moved the branch: our expectation is stale
        let err = refs
            .compare_and_swap("refs/heads/master", Some(&oid('x')), &oid('b'))
            .unwrap_err();

        assert!(matches!(err, CoreError::ConcurrentUpdate(_)));
        // and the reference is untouched
        assert_eq!(refs.resolve("master").unwrap(), oid('a'));
    }

    #[test]
    fn compare_and_swap_creates_an_unborn_branch_only_when_expected_absent() {
        let (_dir, refs) = refs();

        refs.compare_and_swap("refs/heads/master", None, &oid('a'))
            .unwrap();
        assert_eq!(refs.resolve("master").unwrap(), oid('a'));

        let err = refs
            .compare_and_swap("refs/heads/fresh", Some(&oid('a')), &oid('b'))
            .unwrap_err();
        assert!(matches!(err, CoreError::ConcurrentUpdate(_)));
    }

    #[test]
    fn compare_and_swap_through_attached_head_moves_the_branch() {
        let (_dir, refs) = refs();
        refs.create_branch(&branch("master"), &oid('a')).unwrap();
        refs.set_head("master", oid('a').as_ref().to_string())
            .unwrap();

        refs.compare_and_swap("HEAD", Some(&oid('a')), &oid('b'))
            .unwrap();

        assert_eq!(refs.resolve("master").unwrap(), oid('b'));
        assert_eq!(
            refs.current_ref().unwrap().as_ref_path(),
            "refs/heads/master"
        );
    }

    #[test]
    fn delete_branch_removes_the_mapping() {
        let (_dir, refs) = refs();
        refs.create_branch(&branch("feature/login"), &oid('a'))
            .unwrap();

        let removed = refs.delete_branch(&branch("feature/login")).unwrap();
        assert_eq!(removed, oid('a'));

        let err = refs.delete_branch(&branch("feature/login")).unwrap_err();
        assert!(matches!(err, CoreError::NoSuchBranch(_)));
    }

    #[test]
    fn list_separates_local_and_remote_scopes() {
        let (_dir, refs) = refs();
        refs.create_branch(&branch("master"), &oid('a')).unwrap();
        refs.create(&RefName::new("refs/remotes/origin/main".to_string()), &oid('b'))
            .unwrap();

        let local: Vec<_> = refs
            .list(Scope::Local)
            .unwrap()
            .iter()
            .map(|r| r.short_name().to_string())
            .collect();
        assert_eq!(local, vec!["master"]);

        let remote: Vec<_> = refs
            .list(Scope::Remote)
            .unwrap()
            .iter()
            .map(|r| r.short_name().to_string())
            .collect();
        assert_eq!(remote, vec!["origin/main"]);

        assert_eq!(refs.list(Scope::All).unwrap().len(), 2);
    }

    #[test]
    fn scope_parsing_names_the_allowed_set() {
        assert_eq!(Scope::try_parse("local").unwrap(), Scope::Local);
        assert_eq!(Scope::try_parse("remote").unwrap(), Scope::Remote);
        assert_eq!(Scope::try_parse("all").unwrap(), Scope::All);

        let err = Scope::try_parse("everything").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("local"));
        assert!(message.contains("remote"));
        assert!(message.contains("all"));
    }
}
