//! Object identifier (SHA-1 digest)
//!
//! Object ids are 40-character hexadecimal strings naming the SHA-1 digest
//! of an object's canonical serialization. Equality is byte-equality and is
//! the universal key for the store.
//!
//! ## Storage
//!
//! Loose objects live at `objects/<first-2-chars>/<remaining-38-chars>`

use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::errors::{CoreError, CoreResult};
use std::io;
use std::path::PathBuf;

/// Content digest identifying a stored object
///
/// A validated 40-character lowercase hexadecimal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object id from a string
    ///
    /// Fails with a validation error on wrong length or non-hex characters.
    pub fn try_parse(id: String) -> CoreResult<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(CoreError::Validation(format!(
                "invalid object id length: {}",
                id.len()
            )));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::Validation(format!(
                "invalid object id characters: {id}"
            )));
        }
        Ok(Self(id.to_lowercase()))
    }

    /// Write the id in binary form (20 bytes)
    ///
    /// Used when serializing tree, commit and tag objects.
    pub fn write_h40_to<W: io::Write>(&self, writer: &mut W) -> CoreResult<()> {
        for i in (0..OBJECT_ID_LENGTH).step_by(2) {
            let byte = u8::from_str_radix(&self.0[i..i + 2], 16)
                .map_err(|_| CoreError::Validation("invalid hex digit".to_string()))?;
            writer.write_all(&[byte])?;
        }

        Ok(())
    }

    /// Read an id from binary form (20 bytes)
    pub fn read_h40_from<R: io::Read + ?Sized>(reader: &mut R) -> CoreResult<Self> {
        let mut hex40 = String::with_capacity(OBJECT_ID_LENGTH);
        let mut buffer = [0; 1];

        for _ in 0..(OBJECT_ID_LENGTH / 2) {
            reader.read_exact(&mut buffer)?;
            hex40.push_str(&format!("{:02x}", buffer[0]));
        }

        Self::try_parse(hex40)
    }

    /// Path of the loose object file, split as `XX/YYYY...`
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// First 7 characters, the standard abbreviation
    pub fn to_short_oid(&self) -> String {
        self.0.split_at(7).0.to_string()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
