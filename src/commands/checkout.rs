use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::RefName;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::objects::object_id::ObjectId;
use std::io::Write;

const DETACHMENT_NOTICE: &str = r#"
You are in 'detached HEAD' state. You can look around, make experimental
changes and commit them, and you can discard any commits you make in this
state without impacting any branches by checking out a branch again.
"#;

impl Repository {
    /// Update tracked file contents and HEAD to the target revision
    ///
    /// The migration plans every file action from the tree diff first and
    /// refuses the whole checkout when local changes would be lost.
    pub async fn checkout(&mut self, target: &str) -> anyhow::Result<()> {
        let current_ref = self.refs().current_ref()?;
        let current_oid = self
            .refs()
            .read_head()?
            .ok_or_else(|| anyhow::anyhow!("no current HEAD to checkout from"))?;

        let target_oid = self.resolve_revision(target)?;

        {
            let index = self.index();
            let mut index = index.lock().await;

            index.rehydrate()?;

            let changes = self
                .store()
                .tree_diff(Some(&current_oid), Some(&target_oid))?;

            let mut migration =
                Migration::new(self.store(), self.workspace(), &mut index, changes);
            migration.apply_changes()?;

            index.write_updates()?;
        }

        self.refs()
            .set_head(target, target_oid.as_ref().to_string())?;
        let new_ref = self.refs().current_ref()?;

        self.print_detachment_notice(&current_ref, &new_ref, target)?;
        self.print_new_head(&current_ref, &new_ref, &target_oid, target)?;

        Ok(())
    }

    fn print_detachment_notice(
        &self,
        current_ref: &RefName,
        new_ref: &RefName,
        target: &str,
    ) -> anyhow::Result<()> {
        if !current_ref.is_detached_head() && new_ref.is_detached_head() {
            writeln!(
                self.writer(),
                "Note: checking out '{target}'.\n{DETACHMENT_NOTICE}"
            )?;
        }

        Ok(())
    }

    fn print_new_head(
        &self,
        current_ref: &RefName,
        new_ref: &RefName,
        target_oid: &ObjectId,
        target: &str,
    ) -> anyhow::Result<()> {
        if new_ref.is_detached_head() {
            let commit = self.store().load_commit(target_oid)?;
            writeln!(
                self.writer(),
                "HEAD is now at {} {}",
                target_oid.to_short_oid(),
                commit.short_message()
            )?;
        } else if new_ref == current_ref {
            writeln!(self.writer(), "Already on '{target}'")?;
        } else {
            writeln!(self.writer(), "Switched to branch '{target}'")?;
        }

        Ok(())
    }
}
