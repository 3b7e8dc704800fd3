use crate::areas::repository::Repository;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::merge::engine::{MergeEngine, MergeOutcome};
use std::io::Write;

impl Repository {
    /// Merge the target revision into the current branch
    ///
    /// Fast-forwards when possible, otherwise runs a three-way merge. The
    /// workspace and staging set follow the branch to the merge result.
    /// Already-merged targets and content conflicts surface as typed
    /// failures the caller is expected to branch on.
    pub async fn merge(&mut self, target: &str, message: Option<&str>) -> anyhow::Result<()> {
        let current_ref = self.refs().current_ref()?;
        let head_oid = self
            .refs()
            .read_head()?
            .ok_or_else(|| anyhow::anyhow!("no current HEAD to merge into"))?;

        let incoming_oid = self.resolve_revision(target)?;

        writeln!(
            self.writer(),
            "Merging {} into {}",
            incoming_oid.to_short_oid(),
            head_oid.to_short_oid()
        )?;

        let message = message
            .map(str::to_string)
            .unwrap_or_else(|| format!("Merge '{target}'"));
        let author = self.author()?;

        let engine = MergeEngine::new(self.store(), self.refs());
        let outcome = engine.merge(&current_ref, &head_oid, &incoming_oid, &message, author)?;

        // bring the workspace and staging set along to the merge result
        {
            let index = self.index();
            let mut index = index.lock().await;

            index.rehydrate()?;

            let changes = self
                .store()
                .tree_diff(Some(&head_oid), Some(outcome.commit_oid()))?;
            let mut migration =
                Migration::new(self.store(), self.workspace(), &mut index, changes);
            migration.apply_changes()?;

            index.write_updates()?;
        }

        match outcome {
            MergeOutcome::FastForwarded(oid) => {
                writeln!(self.writer(), "Fast-forwarded to {}", oid.to_short_oid())?;
            }
            MergeOutcome::Merged(oid) => {
                writeln!(
                    self.writer(),
                    "Merge made by the three-way strategy: {}",
                    oid.to_short_oid()
                )?;
            }
        }

        Ok(())
    }
}
