use crate::areas::repository::Repository;
use crate::artifacts::status::{Inspector, StatusReport, WorkingFileStatus};
use std::io::Write;

impl Repository {
    /// Per-path classification of the workspace against the staging set
    pub async fn status(&mut self) -> anyhow::Result<StatusReport> {
        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;

        Ok(Inspector::new(&index, self.workspace()).report()?)
    }

    /// Print the short-form status listing, colorized
    pub async fn print_status(&mut self) -> anyhow::Result<()> {
        let report = self.status().await?;

        for (path, status) in &report {
            if *status == WorkingFileStatus::Unmodified {
                continue;
            }
            writeln!(
                self.writer(),
                "{:>2} {}",
                status.colored_label(),
                path.display()
            )?;
        }

        Ok(())
    }

    /// Tracked files with local modifications or deletions
    pub async fn files_changed(&mut self) -> anyhow::Result<Vec<std::path::PathBuf>> {
        Ok(self
            .status()
            .await?
            .into_iter()
            .filter(|(_, status)| {
                matches!(
                    status,
                    WorkingFileStatus::Modified | WorkingFileStatus::Deleted
                )
            })
            .map(|(path, _)| path)
            .collect())
    }

    /// Files present locally but not staged
    pub async fn files_untracked(&mut self) -> anyhow::Result<Vec<std::path::PathBuf>> {
        Ok(self
            .status()
            .await?
            .into_iter()
            .filter(|(_, status)| *status == WorkingFileStatus::Untracked)
            .map(|(path, _)| path)
            .collect())
    }
}
