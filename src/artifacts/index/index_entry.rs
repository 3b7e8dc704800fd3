//! Staged file entries
//!
//! Each entry maps a workspace path to the blob staged for it, plus the
//! stat fields (mode, size, mtime) that let status checks skip re-hashing
//! files whose metadata is unchanged.

use crate::artifacts::index::ENTRY_BLOCK;
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{CoreError, CoreResult};
use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Fixed-width prefix of a serialized entry: mtime + size + mode + oid + path len
pub const ENTRY_FIXED_SIZE: usize = 4 + 4 + 4 + 20 + 2;

/// Workspace stat fields carried by an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, new)]
pub struct EntryStat {
    pub mode: EntryMode,
    pub size: u64,
    pub mtime: i64,
}

/// One staged file
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct IndexEntry {
    /// Path relative to the workspace root
    pub path: PathBuf,
    /// Blob staged for this path
    pub oid: ObjectId,
    pub stat: EntryStat,
}

impl IndexEntry {
    pub fn mode(&self) -> EntryMode {
        self.stat.mode
    }

    /// Do the cheap stat fields still match the workspace?
    pub fn stat_match(&self, stat: &EntryStat) -> bool {
        self.stat.mode == stat.mode && self.stat.size == stat.size
    }

    pub fn times_match(&self, stat: &EntryStat) -> bool {
        self.stat.mtime == stat.mtime
    }

    /// NUL padding that aligns a serialized entry to [`ENTRY_BLOCK`] bytes
    pub fn padding_for(path_len: usize) -> usize {
        let unpadded = ENTRY_FIXED_SIZE + path_len;
        let aligned = unpadded.div_ceil(ENTRY_BLOCK) * ENTRY_BLOCK;
        // always at least one NUL terminator
        if aligned == unpadded {
            ENTRY_BLOCK
        } else {
            aligned - unpadded
        }
    }

    pub fn serialize(&self) -> CoreResult<Bytes> {
        let path = self
            .path
            .to_str()
            .ok_or_else(|| {
                CoreError::Validation(format!("path {} is not utf-8", self.path.display()))
            })?
            .as_bytes();
        if path.len() > u16::MAX as usize {
            return Err(CoreError::Validation(format!(
                "path {} is too long for an index entry",
                self.path.display()
            )));
        }

        let mut entry_bytes = Vec::new();
        entry_bytes.write_u32::<NetworkEndian>(self.stat.mtime as u32)?;
        entry_bytes.write_u32::<NetworkEndian>(self.stat.size as u32)?;
        entry_bytes.write_u32::<NetworkEndian>(self.stat.mode.as_u32())?;
        self.oid.write_h40_to(&mut entry_bytes)?;
        entry_bytes.write_u16::<NetworkEndian>(path.len() as u16)?;
        entry_bytes.extend_from_slice(path);
        entry_bytes.resize(entry_bytes.len() + Self::padding_for(path.len()), 0);

        Ok(Bytes::from(entry_bytes))
    }

    /// Parse the fixed prefix; the caller then reads `path_len` + padding
    pub fn deserialize_fixed(bytes: &Bytes) -> CoreResult<(EntryStat, ObjectId, usize)> {
        let mut reader = bytes.as_ref();

        let mtime = reader.read_u32::<NetworkEndian>()? as i64;
        let size = reader.read_u32::<NetworkEndian>()? as u64;
        let mode = EntryMode::from_u32(reader.read_u32::<NetworkEndian>()?)?;
        let oid = ObjectId::read_h40_from(&mut reader)?;
        let path_len = reader.read_u16::<NetworkEndian>()? as usize;

        Ok((EntryStat::new(mode, size, mtime), oid, path_len))
    }

    pub fn parse_path(bytes: &Bytes, path_len: usize) -> CoreResult<PathBuf> {
        let mut path_bytes = vec![0u8; path_len];
        let mut reader = bytes.as_ref();
        reader.read_exact(&mut path_bytes)?;

        let path = String::from_utf8(path_bytes)
            .map_err(|_| CoreError::Validation("index entry path is not utf-8".to_string()))?;
        Ok(PathBuf::from(path))
    }

    pub fn parent_dirs(&self) -> Vec<&Path> {
        let mut dirs: Vec<&Path> = self
            .path
            .ancestors()
            .skip(1)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        dirs.reverse();
        dirs
    }
}
