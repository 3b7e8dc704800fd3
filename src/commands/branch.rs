use crate::areas::refs::Scope;
use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;

impl Repository {
    /// Create a branch at the given revision, or at HEAD
    pub fn branch_create(&mut self, name: &str, from: Option<&str>) -> anyhow::Result<()> {
        let branch_name = BranchName::try_parse(name.to_string())?;

        let source_oid = match from {
            Some(revision) => self.resolve_revision(revision)?,
            None => self
                .refs()
                .read_head()?
                .ok_or_else(|| anyhow::anyhow!("no current HEAD to branch from"))?,
        };

        self.refs().create_branch(&branch_name, &source_oid)?;

        Ok(())
    }

    pub fn branch_delete(&mut self, name: &str) -> anyhow::Result<()> {
        let branch_name = BranchName::try_parse(name.to_string())?;
        self.refs().delete_branch(&branch_name)?;

        Ok(())
    }

    /// Branch names in the given scope (`local`, `remote` or `all`)
    pub fn branches(&self, scope: &str) -> anyhow::Result<Vec<String>> {
        let scope = Scope::try_parse(scope)?;

        Ok(self
            .refs()
            .list(scope)?
            .iter()
            .map(|name| name.short_name().to_string())
            .collect())
    }

    /// Short name of the branch HEAD is attached to, `None` when detached
    pub fn current_branch(&self) -> anyhow::Result<Option<String>> {
        let current_ref = self.refs().current_ref()?;

        if current_ref.is_detached_head() {
            Ok(None)
        } else {
            Ok(Some(current_ref.short_name().to_string()))
        }
    }

    /// Tip commit of the named branch
    pub fn head_of_branch(
        &self,
        name: &str,
    ) -> anyhow::Result<crate::artifacts::objects::commit::Commit> {
        let branch_name = BranchName::try_parse(name.to_string())?;
        let oid = self
            .refs()
            .read_branch(&branch_name)?
            .ok_or(crate::errors::CoreError::NoSuchBranch(name.to_string()))?;

        Ok(self.store().load_commit(&oid)?)
    }
}
