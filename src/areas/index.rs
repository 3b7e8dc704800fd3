//! Staging set (index)
//!
//! The mutable `path -> (blob id, mode)` mapping describing the next
//! commit's tree. Mutated by add/remove, materialized into a tree on
//! commit. Persisted with a header, aligned binary entries and a trailing
//! SHA-1 checksum; loads take a shared file lock, stores an exclusive one.

use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::index_entry::{ENTRY_FIXED_SIZE, IndexEntry};
use crate::artifacts::index::{HEADER_SIZE, SIGNATURE, VERSION};
use crate::errors::{CoreError, CoreResult};
use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use std::collections::BTreeMap;
use std::ops::DerefMut;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Index {
    /// Path to the index file (typically `.mingit/index`)
    path: Box<Path>,
    /// Staged files keyed by workspace-relative path
    entries: BTreeMap<PathBuf, IndexEntry>,
    /// Set when the in-memory state has diverged from disk
    changed: bool,
}

impl Index {
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            entries: BTreeMap::new(),
            changed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_by_path(&self, path: &Path) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.changed = false;
    }

    /// Reload the staging set from disk
    ///
    /// Verifies the trailing checksum; a missing or empty file is an empty
    /// staging set.
    pub fn rehydrate(&mut self) -> CoreResult<()> {
        if !self.path.exists() {
            self.clear();
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(self.path())?;
        }

        let mut index_file = std::fs::OpenOptions::new().read(true).open(self.path())?;
        let mut lock = file_guard::lock(&mut index_file, file_guard::Lock::Shared, 0, 1)?;

        self.clear();

        if lock.deref_mut().metadata()?.len() == 0 {
            return Ok(());
        }

        let mut reader = Checksum::new(lock.deref_mut());
        let entries_count = Self::parse_header(&mut reader)?;
        self.parse_entries(entries_count, &mut reader)?;

        reader.verify()
    }

    fn parse_header<R: std::io::Read>(reader: &mut Checksum<R>) -> CoreResult<u32> {
        let header_bytes = reader.read(HEADER_SIZE)?;
        let mut header_reader = header_bytes.as_ref();

        let mut signature = [0u8; 4];
        std::io::Read::read_exact(&mut header_reader, &mut signature)?;
        if signature != SIGNATURE.as_bytes() {
            return Err(CoreError::Validation(
                "invalid index file signature".to_string(),
            ));
        }

        let version = header_reader.read_u32::<NetworkEndian>()?;
        if version != VERSION {
            return Err(CoreError::Validation(format!(
                "unsupported index file version: {version}"
            )));
        }

        Ok(header_reader.read_u32::<NetworkEndian>()?)
    }

    fn parse_entries<R: std::io::Read>(
        &mut self,
        entries_count: u32,
        reader: &mut Checksum<R>,
    ) -> CoreResult<()> {
        for _ in 0..entries_count {
            let fixed = reader.read(ENTRY_FIXED_SIZE)?;
            let (stat, oid, path_len) = IndexEntry::deserialize_fixed(&fixed)?;

            let tail = reader.read(path_len + IndexEntry::padding_for(path_len))?;
            let path = IndexEntry::parse_path(&tail, path_len)?;

            self.entries
                .insert(path.clone(), IndexEntry::new(path, oid, stat));
        }

        Ok(())
    }

    pub fn add(&mut self, entry: IndexEntry) {
        self.entries.insert(entry.path.clone(), entry);
        self.changed = true;
    }

    pub fn remove(&mut self, path: &Path) -> Option<IndexEntry> {
        let removed = self.entries.remove(path);
        if removed.is_some() {
            self.changed = true;
        }
        removed
    }

    /// Persist the staging set under an exclusive lock
    pub fn write_updates(&mut self) -> CoreResult<()> {
        let mut index_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.path())?;
        let mut lock = file_guard::lock(&mut index_file, file_guard::Lock::Exclusive, 0, 1)?;

        let mut writer = Checksum::new(lock.deref_mut());

        let mut header = Vec::with_capacity(HEADER_SIZE);
        header.extend_from_slice(SIGNATURE.as_bytes());
        header.write_u32::<NetworkEndian>(VERSION)?;
        header.write_u32::<NetworkEndian>(self.entries.len() as u32)?;
        writer.write(&header)?;

        for entry in self.entries.values() {
            let entry_bytes = entry.serialize()?;
            writer.write(&entry_bytes)?;
        }

        writer.write_checksum()?;
        self.changed = false;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::index_entry::EntryStat;
    use crate::artifacts::objects::entry_mode::EntryMode;
    use crate::artifacts::objects::object_id::ObjectId;
    use pretty_assertions::assert_eq;

    fn index() -> (assert_fs::TempDir, Index) {
        let dir = assert_fs::TempDir::new().unwrap();
        let index = Index::new(dir.path().join("index").into_boxed_path());
        (dir, index)
    }

    fn entry(path: &str, fill: char) -> IndexEntry {
        IndexEntry::new(
            PathBuf::from(path),
            ObjectId::try_parse(fill.to_string().repeat(40)).unwrap(),
            EntryStat::new(EntryMode::Regular, 10, 1_700_000_000),
        )
    }

    #[test]
    fn write_then_rehydrate_round_trips() {
        let (_dir, mut index) = index();
        index.add(entry("b.txt", 'b'));
        index.add(entry("a/nested.txt", 'a'));
        index.write_updates().unwrap();

        let mut reloaded = Index::new(index.path().to_path_buf().into_boxed_path());
        reloaded.rehydrate().unwrap();

        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.entry_by_path(Path::new("a/nested.txt")),
            index.entry_by_path(Path::new("a/nested.txt"))
        );
        // BTreeMap keeps entries path-sorted
        assert_eq!(
            reloaded.entries().map(|e| e.path.clone()).collect::<Vec<_>>(),
            vec![PathBuf::from("a/nested.txt"), PathBuf::from("b.txt")]
        );
    }

    #[test]
    fn rehydrating_a_missing_file_yields_an_empty_staging_set() {
        let (_dir, mut index) = index();
        index.rehydrate().unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn remove_unstages_a_path() {
        let (_dir, mut index) = index();
        index.add(entry("a.txt", 'a'));

        assert!(index.remove(Path::new("a.txt")).is_some());
        assert!(index.remove(Path::new("a.txt")).is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn a_flipped_byte_fails_checksum_verification() {
        let (_dir, mut index) = index();
        index.add(entry("a.txt", 'a'));
        index.write_updates().unwrap();

        let mut bytes = std::fs::read(index.path()).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xff;
        std::fs::write(index.path(), bytes).unwrap();

        let mut reloaded = Index::new(index.path().to_path_buf().into_boxed_path());
        let err = reloaded.rehydrate().unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
