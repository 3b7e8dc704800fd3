//! Working directory access
//!
//! File system operations scoped to the repository's working tree: listing
//! candidate files, reading them as blobs, cheap stat probes for status
//! checks, and applying planned checkout migrations.

use crate::artifacts::checkout::migration::{ActionType, Migration};
use crate::artifacts::index::index_entry::EntryStat;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::errors::{CoreError, CoreResult};
use bytes::Bytes;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IGNORED_PATHS: [&str; 3] = [".mingit", ".", ".."];

#[derive(Debug)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn new(path: Box<Path>) -> Self {
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parse_blob(&self, path: &Path) -> CoreResult<Blob> {
        let data = self.read_file(path)?;
        Ok(Blob::new(data))
    }

    /// All tracked-candidate files under `root` (the whole workspace by default)
    pub fn list_files(&self, root: Option<PathBuf>) -> CoreResult<Vec<PathBuf>> {
        let root = match root {
            Some(p) => std::fs::canonicalize(p)?,
            None => self.path.clone().into(),
        };

        if !root.exists() {
            return Err(CoreError::Validation(format!(
                "the specified path does not exist: {}",
                root.display()
            )));
        }

        if root.is_dir() {
            Ok(WalkDir::new(&root)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| self.relative_if_not_ignored(entry.path()))
                .collect::<Vec<_>>())
        } else {
            Ok(vec![
                root.strip_prefix(self.path.as_ref())
                    .map(PathBuf::from)
                    .unwrap_or_default(),
            ])
        }
    }

    fn is_ignored(path: &Path) -> bool {
        path.components().any(|component| {
            if let std::path::Component::Normal(name) = component {
                let name = name.to_string_lossy();
                IGNORED_PATHS.contains(&name.as_ref())
            } else {
                false
            }
        })
    }

    fn relative_if_not_ignored(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() && !Self::is_ignored(path) {
            Some(path.strip_prefix(self.path.as_ref()).ok()?.to_path_buf())
        } else {
            None
        }
    }

    pub fn read_file(&self, file_path: &Path) -> CoreResult<Bytes> {
        let file_path = self.path.join(file_path);
        Ok(std::fs::read(file_path)?.into())
    }

    pub fn file_exists(&self, file_path: &Path) -> bool {
        self.path.join(file_path).is_file()
    }

    pub fn stat_file(&self, file_path: &Path) -> CoreResult<EntryStat> {
        let absolute = self.path.join(file_path);
        let metadata = std::fs::metadata(&absolute)?;

        let mtime = metadata
            .modified()?
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();

        Ok(EntryStat::new(
            EntryMode::detect(&absolute),
            metadata.len(),
            mtime,
        ))
    }

    // The order of applying a migration is important: deletions first, then
    // directory removals child-before-parent, directory creations
    // parent-before-child, and finally content writes.
    pub fn apply_migration(&self, migration: &Migration) -> CoreResult<()> {
        self.apply_migration_action_set(migration, ActionType::Delete)?;
        for dir_path in migration.rmdirs().iter().rev() {
            self.remove_directory(dir_path)?;
        }

        for dir_path in migration.mkdirs() {
            self.make_directory(dir_path)?;
        }
        self.apply_migration_action_set(migration, ActionType::Modify)?;
        self.apply_migration_action_set(migration, ActionType::Add)?;

        Ok(())
    }

    fn apply_migration_action_set(
        &self,
        migration: &Migration,
        action: ActionType,
    ) -> CoreResult<()> {
        for (file_path, entry) in migration.actions_of(action) {
            let path = self.path.join(file_path);

            if path.exists() {
                let metadata = std::fs::metadata(&path)?;
                if metadata.is_dir() {
                    std::fs::remove_dir_all(&path)?;
                } else {
                    std::fs::remove_file(&path)?;
                }
            }

            match (action, entry) {
                (ActionType::Delete, None) => {}
                (ActionType::Add | ActionType::Modify, Some(entry)) => {
                    let data = migration.load_blob_data(&entry.oid)?;

                    let mut file = std::fs::OpenOptions::new()
                        .write(true)
                        .create(true)
                        .truncate(true)
                        .open(&path)?;
                    file.write_all(&data)?;

                    #[cfg(unix)]
                    {
                        use std::os::unix::fs::PermissionsExt;
                        let permissions = std::fs::Permissions::from_mode(entry.mode.as_u32());
                        std::fs::set_permissions(&path, permissions)?;
                    }
                }
                _ => {
                    return Err(CoreError::Validation(
                        "invalid migration action and entry combination".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    fn remove_directory(&self, dir_path: &Path) -> CoreResult<()> {
        let dir_path = self.path.join(dir_path);

        // a directory that still holds files simply stays
        let _ = std::fs::remove_dir(&dir_path);

        Ok(())
    }

    fn make_directory(&self, dir_path: &Path) -> CoreResult<()> {
        let dir_path = self.path.join(dir_path);

        if !dir_path.exists() {
            std::fs::create_dir_all(&dir_path)?;
            return Ok(());
        }

        if dir_path.is_file() {
            std::fs::remove_file(&dir_path)?;
            std::fs::create_dir_all(&dir_path)?;
        }

        Ok(())
    }
}
