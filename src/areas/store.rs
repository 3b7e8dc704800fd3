//! Content-addressed object store
//!
//! Stores immutable objects (blobs, trees, commits, tags) keyed by the
//! SHA-1 digest of their canonical serialization, zlib-compressed at
//! `objects/<aa>/<38 hex>`.
//!
//! Writes go through a temp file plus an atomic rename, so a reader never
//! observes a partial object. Storing identical content twice is a no-op
//! that returns the same id, which also makes concurrent identical writes
//! race benignly; the store takes no locks anywhere. Every read re-hashes
//! the payload against the requested id, a mismatch is fatal corruption.

use crate::artifacts::diff::tree_diff::{ChangeSet, TreeDiff};
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::{Commit, SlimCommit};
use crate::artifacts::objects::object::{Object, ObjectBox, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::artifacts::objects::MIN_PREFIX_LENGTH;
use crate::errors::{CoreError, CoreResult};
use bytes::Bytes;
use fake::rand;
use sha1::{Digest, Sha1};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Cursor, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct ObjectStore {
    path: Box<Path>,
}

impl ObjectStore {
    pub fn new(path: Box<Path>) -> Self {
        ObjectStore { path }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    /// Store an object, returning its id
    ///
    /// Idempotent: identical content maps to the identical id and the
    /// second store is a no-op. The object is durable on disk before this
    /// returns, so callers may chain puts and reference the result.
    pub fn put(&self, object: &impl Object) -> CoreResult<ObjectId> {
        let content = object.serialize()?;
        let oid = Self::hash_bytes(&content)?;
        let object_path = self.path.join(oid.to_path());

        if !object_path.exists() {
            std::fs::create_dir_all(object_path.parent().ok_or_else(|| {
                CoreError::Validation(format!("invalid object path {}", object_path.display()))
            })?)?;

            self.write_object(object_path, content)?;
        }

        Ok(oid)
    }

    pub fn exists(&self, oid: &ObjectId) -> bool {
        self.path.join(oid.to_path()).exists()
    }

    /// Load and parse an object of any type
    pub fn get(&self, oid: &ObjectId) -> CoreResult<ObjectBox> {
        let (object_type, object_reader) = self.parse_object_as_bytes(oid)?;

        match object_type {
            ObjectType::Blob => Ok(ObjectBox::Blob(Box::new(Blob::deserialize(object_reader)?))),
            ObjectType::Tree => Ok(ObjectBox::Tree(Box::new(Tree::deserialize(object_reader)?))),
            ObjectType::Commit => Ok(ObjectBox::Commit(Box::new(Commit::deserialize(
                object_reader,
            )?))),
            ObjectType::Tag => Ok(ObjectBox::Tag(Box::new(Tag::deserialize(object_reader)?))),
        }
    }

    pub fn load_blob(&self, oid: &ObjectId) -> CoreResult<Blob> {
        match self.get(oid)? {
            ObjectBox::Blob(blob) => Ok(*blob),
            other => Err(Self::wrong_type(oid, ObjectType::Blob, other.object_type())),
        }
    }

    pub fn load_tree(&self, oid: &ObjectId) -> CoreResult<Tree> {
        match self.get(oid)? {
            ObjectBox::Tree(tree) => Ok(*tree),
            other => Err(Self::wrong_type(oid, ObjectType::Tree, other.object_type())),
        }
    }

    pub fn load_commit(&self, oid: &ObjectId) -> CoreResult<Commit> {
        match self.get(oid)? {
            ObjectBox::Commit(commit) => Ok(*commit),
            other => Err(Self::wrong_type(oid, ObjectType::Commit, other.object_type())),
        }
    }

    pub fn load_tag(&self, oid: &ObjectId) -> CoreResult<Tag> {
        match self.get(oid)? {
            ObjectBox::Tag(tag) => Ok(*tag),
            other => Err(Self::wrong_type(oid, ObjectType::Tag, other.object_type())),
        }
    }

    /// Graph-walk projection of a commit
    pub fn slim_commit(&self, oid: &ObjectId) -> CoreResult<SlimCommit> {
        let commit = self.load_commit(oid)?;

        Ok(SlimCommit {
            oid: oid.clone(),
            parents: commit.parents().to_vec(),
            timestamp: commit.timestamp(),
        })
    }

    /// Peel a commit or tag id down to its tree
    pub fn peel_to_tree(&self, oid: &ObjectId) -> CoreResult<Tree> {
        match self.get(oid)? {
            ObjectBox::Tree(tree) => Ok(*tree),
            ObjectBox::Commit(commit) => self.load_tree(commit.tree_oid()),
            ObjectBox::Tag(tag) => {
                let commit = self.load_commit(tag.target())?;
                self.load_tree(commit.tree_oid())
            }
            ObjectBox::Blob(_) => Err(Self::wrong_type(oid, ObjectType::Tree, ObjectType::Blob)),
        }
    }

    /// Peel a tag id down to the commit it annotates; commits pass through
    pub fn peel_to_commit(&self, oid: &ObjectId) -> CoreResult<ObjectId> {
        match self.get(oid)? {
            ObjectBox::Commit(_) => Ok(oid.clone()),
            ObjectBox::Tag(tag) => self.peel_to_commit(tag.target()),
            other => Err(Self::wrong_type(oid, ObjectType::Commit, other.object_type())),
        }
    }

    /// Structural diff of two trees (or commits, peeled); `None` = empty tree
    pub fn tree_diff(
        &self,
        old_oid: Option<&ObjectId>,
        new_oid: Option<&ObjectId>,
    ) -> CoreResult<ChangeSet> {
        let mut tree_diff = TreeDiff::new(self);
        tree_diff.compare_oids(old_oid, new_oid, Path::new(""))?;
        Ok(tree_diff.into_changes())
    }

    /// Flatten a tree (or commit, peeled) into `path -> entry` for every blob
    pub fn flatten_tree(
        &self,
        oid: Option<&ObjectId>,
    ) -> CoreResult<BTreeMap<PathBuf, TreeEntry>> {
        let mut flat = BTreeMap::new();
        if let Some(oid) = oid {
            let tree = self.peel_to_tree(oid)?;
            self.flatten_into(&tree, Path::new(""), &mut flat)?;
        }
        Ok(flat)
    }

    fn flatten_into(
        &self,
        tree: &Tree,
        prefix: &Path,
        flat: &mut BTreeMap<PathBuf, TreeEntry>,
    ) -> CoreResult<()> {
        for (name, entry) in tree.entries() {
            let path = prefix.join(name);
            if entry.is_tree() {
                let subtree = self.load_tree(&entry.oid)?;
                self.flatten_into(&subtree, &path, flat)?;
            } else {
                flat.insert(path, entry.clone());
            }
        }
        Ok(())
    }

    /// Find all object ids starting with the given hex prefix
    ///
    /// The prefix must be at least [`MIN_PREFIX_LENGTH`] hex characters, so
    /// the search always narrows to a single fan-out directory.
    pub fn find_by_prefix(&self, prefix: &str) -> CoreResult<Vec<ObjectId>> {
        if prefix.len() < MIN_PREFIX_LENGTH {
            return Err(CoreError::Validation(format!(
                "object id prefix '{prefix}' is too short, need at least {MIN_PREFIX_LENGTH} characters"
            )));
        }
        if !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::Validation(format!(
                "object id prefix '{prefix}' contains non-hex characters"
            )));
        }

        let prefix = prefix.to_lowercase();
        let dir_name = &prefix[..2];
        let file_prefix = &prefix[2..];
        let dir_path = self.path.join(dir_name);

        let mut matches = Vec::new();
        if dir_path.is_dir() {
            for entry in std::fs::read_dir(&dir_path)? {
                let entry = entry?;
                let file_name = entry.file_name();
                let file_name = file_name.to_string_lossy();

                if file_name.starts_with(file_prefix) {
                    matches.push(ObjectId::try_parse(format!("{dir_name}{file_name}"))?);
                }
            }
        }

        Ok(matches)
    }

    /// Resolve an abbreviated id to the unique full id it names
    ///
    /// `Ok(None)` when nothing matches; ambiguity is a validation error.
    pub fn resolve_prefix(&self, prefix: &str) -> CoreResult<Option<ObjectId>> {
        let mut matches = self.find_by_prefix(prefix)?;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(Some(matches.remove(0))),
            n => Err(CoreError::Validation(format!(
                "object id prefix '{prefix}' is ambiguous ({n} candidates)"
            ))),
        }
    }

    fn wrong_type(oid: &ObjectId, wanted: ObjectType, got: ObjectType) -> CoreError {
        CoreError::Validation(format!("object {oid} is a {got}, expected a {wanted}"))
    }

    fn parse_object_as_bytes(&self, oid: &ObjectId) -> CoreResult<(ObjectType, impl BufRead)> {
        let object_content = self.read_object(oid)?;
        let mut object_reader = Cursor::new(object_content);

        let object_type = ObjectType::parse_object_type(&mut object_reader)?;

        Ok((object_type, object_reader))
    }

    fn read_object(&self, oid: &ObjectId) -> CoreResult<Bytes> {
        let object_path = self.path.join(oid.to_path());

        let object_content = std::fs::read(&object_path).map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                CoreError::NotFound(oid.clone())
            } else {
                CoreError::Io(error)
            }
        })?;

        let object_content = Self::decompress(object_content.into())?;

        // Immutability means a mismatch can never heal, so fail hard here
        // instead of letting garbage flow into diffs and merges.
        if &Self::hash_bytes(&object_content)? != oid {
            return Err(CoreError::CorruptObject(oid.clone()));
        }

        Ok(object_content)
    }

    fn write_object(&self, object_path: PathBuf, object_content: Bytes) -> CoreResult<()> {
        let object_dir = object_path.parent().ok_or_else(|| {
            CoreError::Validation(format!("invalid object path {}", object_path.display()))
        })?;
        let temp_object_path = object_dir.join(Self::generate_temp_name());

        let object_content = Self::compress(object_content)?;

        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_object_path)?;

        file.write_all(&object_content)?;
        file.sync_all()?;

        // rename the temp file onto the object file to make the write atomic
        std::fs::rename(&temp_object_path, &object_path)?;

        Ok(())
    }

    fn hash_bytes(content: &Bytes) -> CoreResult<ObjectId> {
        let mut hasher = Sha1::new();
        hasher.update(content);
        ObjectId::try_parse(format!("{:x}", hasher.finalize()))
    }

    fn compress(data: Bytes) -> CoreResult<Bytes> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&data)?;

        Ok(encoder.finish()?.into())
    }

    fn decompress(data: Bytes) -> CoreResult<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed_content = Vec::new();
        decoder.read_to_end(&mut decompressed_content)?;

        Ok(decompressed_content.into())
    }

    fn generate_temp_name() -> String {
        format!("tmp-obj-{}", rand::random::<u32>())
    }
}

/// Per-operation cache of slim commits for graph walks
///
/// Long ancestor walks revisit commits; the cache keeps each disk read to
/// one. Scoped to a single operation, never shared across callers.
#[derive(Debug, Default)]
pub struct CommitCache {
    cache: RefCell<HashMap<ObjectId, SlimCommit>>,
}

impl CommitCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&self, store: &ObjectStore, oid: &ObjectId) -> CoreResult<SlimCommit> {
        if let Some(slim) = self.cache.borrow().get(oid) {
            return Ok(slim.clone());
        }

        let slim = store.slim_commit(oid)?;
        self.cache
            .borrow_mut()
            .insert(oid.clone(), slim.clone());
        Ok(slim)
    }
}
