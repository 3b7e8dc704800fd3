use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::RefName;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tag::Tag;

impl Repository {
    /// Create an annotated tag at the given revision, or at HEAD
    ///
    /// Returns the id of the commit that was tagged.
    pub fn tag(
        &mut self,
        name: &str,
        revision: Option<&str>,
        message: Option<&str>,
    ) -> anyhow::Result<ObjectId> {
        let target = match revision {
            Some(revision) => self.resolve_revision(revision)?,
            None => self
                .refs()
                .read_head()?
                .ok_or_else(|| anyhow::anyhow!("no current HEAD to tag"))?,
        };

        let tagger = self.author()?;
        let tag = Tag::new(
            target.clone(),
            name.to_string(),
            tagger,
            message.unwrap_or_default().to_string(),
        );
        let tag_oid = self.store().put(&tag)?;

        self.refs().create(&RefName::tag(name), &tag_oid)?;

        Ok(target)
    }

    /// Names of all tags in the repository
    pub fn tags(&self) -> anyhow::Result<Vec<String>> {
        Ok(self
            .refs()
            .list_tags()?
            .iter()
            .map(|name| name.short_name().to_string())
            .collect())
    }
}
