use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{TreeBuilder, TreeEntry};
use std::io::Write;

impl Repository {
    /// Record the staging set as a new commit on the current branch
    ///
    /// The branch moves through a compare-and-swap against the parent we
    /// resolved, so a concurrent commit on the same branch surfaces as a
    /// retryable conflict instead of silently losing one of the two.
    pub async fn commit(&mut self, message: &str) -> anyhow::Result<Commit> {
        let tree_oid = self.write_tree().await?;

        let parent = self.refs().read_head()?;
        let parents: Vec<ObjectId> = parent.clone().into_iter().collect();
        let is_root = match parent {
            Some(_) => "",
            None => "(root-commit) ",
        };

        let author = self.author()?;
        let message = message.trim().to_string();

        let commit = Commit::new(parents, tree_oid, author, message);
        let commit_oid = self.store().put(&commit)?;

        let current_ref = self.refs().current_ref()?;
        self.refs().compare_and_swap(
            current_ref.as_ref_path(),
            parent.as_ref(),
            &commit_oid,
        )?;

        writeln!(
            self.writer(),
            "[{}{}] {}",
            is_root,
            commit_oid.to_short_oid(),
            commit.short_message()
        )?;

        Ok(commit)
    }

    /// Materialize the staging set into stored tree objects
    async fn write_tree(&mut self) -> anyhow::Result<ObjectId> {
        let index = self.index();
        let mut index = index.lock().await;

        index.rehydrate()?;

        let entries: Vec<_> = index
            .entries()
            .map(|entry| (entry.path.clone(), TreeEntry::new(entry.oid.clone(), entry.mode())))
            .collect();

        let builder =
            TreeBuilder::from_entries(entries.iter().map(|(path, entry)| (path.as_path(), entry)))?;
        let tree_oid = builder.write(&mut |tree| self.store().put(tree))?;

        Ok(tree_oid)
    }
}
