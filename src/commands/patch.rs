use crate::areas::repository::Repository;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::patch;

impl Repository {
    /// Render one patch block per revision, mbox-style
    ///
    /// Numbered `[PATCH i/N]` only when more than one revision is given.
    pub fn format_patch(&self, revisions: &[String]) -> anyhow::Result<String> {
        if revisions.is_empty() {
            anyhow::bail!("format-patch needs at least one revision");
        }

        let oids: Vec<ObjectId> = revisions
            .iter()
            .map(|revision| self.resolve_revision(revision))
            .collect::<anyhow::Result<_>>()?;

        Ok(patch::format_patch(self.store(), &oids)?)
    }
}
