//! Checksummed reads and writes for the index file
//!
//! Wraps a reader or writer and folds every byte into a running SHA-1, so
//! the trailing digest can be verified on load and appended on store. A
//! truncated or bit-flipped index file fails verification instead of
//! silently staging the wrong content.

use crate::artifacts::index::CHECKSUM_SIZE;
use crate::errors::{CoreError, CoreResult};
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::{Read, Write};

pub struct Checksum<T> {
    inner: T,
    hasher: Sha1,
}

impl<T> Checksum<T> {
    pub fn new(inner: T) -> Self {
        Checksum {
            inner,
            hasher: Sha1::new(),
        }
    }
}

impl<T: Read> Checksum<T> {
    /// Read exactly `size` bytes, folding them into the running digest
    pub fn read(&mut self, size: usize) -> CoreResult<Bytes> {
        let mut buffer = vec![0u8; size];
        self.inner
            .read_exact(&mut buffer)
            .map_err(|_| CoreError::Validation("index file is truncated".to_string()))?;

        self.hasher.update(&buffer);
        Ok(Bytes::from(buffer))
    }

    /// Read the trailing digest and compare it to what was hashed so far
    pub fn verify(mut self) -> CoreResult<()> {
        let mut stored = [0u8; CHECKSUM_SIZE];
        self.inner
            .read_exact(&mut stored)
            .map_err(|_| CoreError::Validation("index file is missing its checksum".to_string()))?;

        let computed = self.hasher.finalize();
        if stored != computed.as_slice() {
            return Err(CoreError::Validation(
                "index file checksum mismatch".to_string(),
            ));
        }

        Ok(())
    }
}

impl<T: Write> Checksum<T> {
    pub fn write(&mut self, data: &[u8]) -> CoreResult<()> {
        self.inner.write_all(data)?;
        self.hasher.update(data);
        Ok(())
    }

    pub fn write_checksum(mut self) -> CoreResult<()> {
        let digest = self.hasher.finalize();
        self.inner.write_all(&digest)?;
        Ok(())
    }
}
