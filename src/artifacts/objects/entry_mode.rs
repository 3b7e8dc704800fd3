//! Tree entry modes
//!
//! Every tree entry carries a mode describing what its target is: a regular
//! file, an executable, a symlink, or a subtree. The octal wire encodings
//! follow the classic values so serialized trees stay deterministic.

use crate::errors::{CoreError, CoreResult};
use is_executable::IsExecutable;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum EntryMode {
    #[default]
    Regular,
    Executable,
    Symlink,
    Directory,
}

impl EntryMode {
    pub fn as_u32(&self) -> u32 {
        match self {
            EntryMode::Regular => 0o100644,
            EntryMode::Executable => 0o100755,
            EntryMode::Symlink => 0o120000,
            EntryMode::Directory => 0o40000,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EntryMode::Regular => "100644",
            EntryMode::Executable => "100755",
            EntryMode::Symlink => "120000",
            EntryMode::Directory => "040000",
        }
    }

    pub fn from_octal_str(mode: &str) -> CoreResult<Self> {
        let bits = u32::from_str_radix(mode, 8)
            .map_err(|_| CoreError::Validation(format!("invalid entry mode: {mode}")))?;
        Self::from_u32(bits)
    }

    pub fn from_u32(bits: u32) -> CoreResult<Self> {
        match bits {
            0o100644 => Ok(EntryMode::Regular),
            0o100755 => Ok(EntryMode::Executable),
            0o120000 => Ok(EntryMode::Symlink),
            0o40000 => Ok(EntryMode::Directory),
            other => Err(CoreError::Validation(format!(
                "invalid entry mode bits: {other:o}"
            ))),
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }

    /// Classify a workspace path by its filesystem metadata
    pub fn detect(path: &Path) -> Self {
        if path.is_symlink() {
            EntryMode::Symlink
        } else if path.is_dir() {
            EntryMode::Directory
        } else if path.is_executable() {
            EntryMode::Executable
        } else {
            EntryMode::Regular
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octal_round_trip() {
        for mode in [
            EntryMode::Regular,
            EntryMode::Executable,
            EntryMode::Symlink,
            EntryMode::Directory,
        ] {
            let octal = format!("{:o}", mode.as_u32());
            assert_eq!(EntryMode::from_octal_str(&octal).unwrap(), mode);
        }
    }

    #[test]
    fn rejects_unknown_bits() {
        assert!(EntryMode::from_octal_str("100600").is_err());
        assert!(EntryMode::from_octal_str("banana").is_err());
    }
}
