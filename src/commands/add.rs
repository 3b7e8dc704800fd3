use crate::areas::repository::Repository;
use crate::artifacts::index::index_entry::IndexEntry;
use anyhow::Context;
use std::path::{Path, PathBuf};

impl Repository {
    /// Stage files for the next commit
    ///
    /// Each path may be a file or a directory; directories are staged
    /// recursively. The blobs are written to the object store immediately,
    /// the index only records their ids.
    pub async fn add(&mut self, paths: &[String]) -> anyhow::Result<()> {
        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;

        for path in paths {
            let root = if path == "." {
                None
            } else {
                Some(self.path().join(path))
            };

            let files = self
                .workspace()
                .list_files(root)
                .with_context(|| format!("cannot stage {path}"))?;

            for file in files {
                let blob = self.workspace().parse_blob(&file)?;
                let oid = self.store().put(&blob)?;
                let stat = self.workspace().stat_file(&file)?;

                index.add(IndexEntry::new(file, oid, stat));
            }
        }

        index.write_updates()?;

        Ok(())
    }

    /// Remove a path from the staging set, leaving the workspace untouched
    pub async fn unstage(&mut self, path: &str) -> anyhow::Result<()> {
        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;

        if index.remove(Path::new(path)).is_none() {
            anyhow::bail!("path {path} is not staged");
        }

        index.write_updates()?;

        Ok(())
    }

    /// Paths currently staged
    pub async fn staged_paths(&self) -> anyhow::Result<Vec<PathBuf>> {
        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;

        Ok(index.entries().map(|entry| entry.path.clone()).collect())
    }
}
