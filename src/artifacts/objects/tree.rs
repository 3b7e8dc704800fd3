//! Tree object
//!
//! Trees are directory snapshots: an ordered, name-unique sequence of
//! entries pointing at blobs or subtrees. Entries live in a `BTreeMap`, so
//! serialization is always name-sorted and the digest of a tree changes
//! exactly when its entry set changes.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`, each entry `<mode> <name>\0<20-byte-id>`
//!
//! [`TreeBuilder`] materializes a nested tree from a flat `path -> entry`
//! map (staging set or merge result), persisting subtrees bottom-up so each
//! parent knows its children's ids.

use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object::{Object, Packable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{CoreError, CoreResult};
use bytes::Bytes;
use derive_new::new;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::Path;

/// A single tree slot: what it points at and how it should materialize
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TreeEntry {
    pub oid: ObjectId,
    pub mode: EntryMode,
}

impl TreeEntry {
    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }
}

/// Directory snapshot with name-unique, name-sorted entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<String, TreeEntry>,
}

impl Tree {
    pub fn new(entries: BTreeMap<String, TreeEntry>) -> Self {
        Tree { entries }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &TreeEntry)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> BTreeMap<String, TreeEntry> {
        self.entries
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Packable for Tree {
    fn serialize(&self) -> CoreResult<Bytes> {
        let mut content_bytes = Vec::new();
        for (name, entry) in &self.entries {
            let header = format!("{:o} {}", entry.mode.as_u32(), name);
            content_bytes.write_all(header.as_bytes())?;
            content_bytes.push(0);
            entry.oid.write_h40_to(&mut content_bytes)?;
        }

        let mut tree_bytes = Vec::new();
        let header = format!("{} {}\0", self.object_type().as_str(), content_bytes.len());
        tree_bytes.write_all(header.as_bytes())?;
        tree_bytes.write_all(&content_bytes)?;

        Ok(Bytes::from(tree_bytes))
    }
}

impl Unpackable for Tree {
    fn deserialize(reader: impl BufRead) -> CoreResult<Self> {
        let mut entries = BTreeMap::new();
        let mut reader = reader;

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            // Read "mode " (space-delimited)
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            // Must end with ' ' or it's malformed
            if *mode_bytes.last().unwrap() != b' ' {
                return Err(CoreError::Validation("unexpected EOF in mode".to_string()));
            }
            mode_bytes.pop(); // drop the space

            let mode_str = std::str::from_utf8(&mode_bytes)
                .map_err(|_| CoreError::Validation("entry mode is not utf-8".to_string()))?;
            let mode = EntryMode::from_octal_str(mode_str)?;

            // Read "name\0"
            name_bytes.clear();
            let n = reader.read_until(b'\0', &mut name_bytes)?;
            if n == 0 || *name_bytes.last().unwrap() != b'\0' {
                return Err(CoreError::Validation("unexpected EOF in name".to_string()));
            }
            name_bytes.pop(); // drop NUL
            let name = std::str::from_utf8(&name_bytes)
                .map_err(|_| CoreError::Validation("entry name is not utf-8".to_string()))?
                .to_owned();

            let oid = ObjectId::read_h40_from(&mut reader)?;

            entries.insert(name, TreeEntry::new(oid, mode));
        }

        Ok(Tree { entries })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.entries
            .iter()
            .map(|(name, entry)| {
                let object_type = if entry.is_tree() {
                    ObjectType::Tree
                } else {
                    ObjectType::Blob
                };
                format!(
                    "{} {} {}\t{}",
                    entry.mode.as_str(),
                    object_type.as_str(),
                    entry.oid.as_ref(),
                    name
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}

/// Node of a tree under construction
#[derive(Debug, Clone)]
enum TreeNode {
    Leaf(TreeEntry),
    Dir(TreeBuilder),
}

/// Builds a nested tree from flat paths and persists it bottom-up
///
/// Children are written before parents, a parent entry needs its child's id.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    nodes: BTreeMap<String, TreeNode>,
}

impl TreeBuilder {
    /// Build from a flat `path -> entry` iterator (staging set, merge result)
    pub fn from_entries<'e>(
        entries: impl Iterator<Item = (&'e Path, &'e TreeEntry)>,
    ) -> CoreResult<Self> {
        let mut root = Self::default();

        for (path, entry) in entries {
            root.insert(path, entry.clone())?;
        }

        Ok(root)
    }

    pub fn insert(&mut self, path: &Path, entry: TreeEntry) -> CoreResult<()> {
        let mut components = path.components();
        let first = components.next().ok_or_else(|| {
            CoreError::Validation("cannot insert an empty path into a tree".to_string())
        })?;
        let name = first
            .as_os_str()
            .to_str()
            .ok_or_else(|| {
                CoreError::Validation(format!("path {} is not utf-8", path.display()))
            })?
            .to_string();
        let rest = components.as_path();

        if rest.as_os_str().is_empty() {
            self.nodes.insert(name, TreeNode::Leaf(entry));
            return Ok(());
        }

        match self
            .nodes
            .entry(name)
            .or_insert_with(|| TreeNode::Dir(TreeBuilder::default()))
        {
            TreeNode::Dir(builder) => builder.insert(rest, entry),
            TreeNode::Leaf(_) => Err(CoreError::Validation(format!(
                "path {} conflicts with an existing file entry",
                path.display()
            ))),
        }
    }

    /// Persist every subtree depth-first and return the root tree's id
    ///
    /// `persist` is called once per tree, children before parents.
    pub fn write<F>(&self, persist: &mut F) -> CoreResult<ObjectId>
    where
        F: FnMut(&Tree) -> CoreResult<ObjectId>,
    {
        let mut entries = BTreeMap::new();

        for (name, node) in &self.nodes {
            let entry = match node {
                TreeNode::Leaf(entry) => entry.clone(),
                TreeNode::Dir(builder) => {
                    TreeEntry::new(builder.write(persist)?, EntryMode::Directory)
                }
            };
            entries.insert(name.clone(), entry);
        }

        persist(&Tree::new(entries))
    }
}
