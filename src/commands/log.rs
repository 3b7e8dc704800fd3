use crate::areas::repository::Repository;
use crate::areas::store::CommitCache;
use crate::artifacts::graph::walker::HistoryWalker;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use std::fmt::Write;

impl Repository {
    /// Commits reachable from the given revision (HEAD by default),
    /// newest first
    pub fn log(&self, revision: Option<&str>) -> anyhow::Result<Vec<(ObjectId, Commit)>> {
        let start = match revision {
            Some(revision) => self.resolve_revision(revision)?,
            None => self
                .refs()
                .read_head()?
                .ok_or_else(|| anyhow::anyhow!("no commits yet"))?,
        };

        let cache = CommitCache::new();
        let walker = HistoryWalker::new(|oid: &ObjectId| cache.get_or_load(self.store(), oid));

        let mut commits = Vec::new();
        for slim in walker.ancestors(&start) {
            let slim = slim?;
            commits.push((slim.oid.clone(), self.store().load_commit(&slim.oid)?));
        }

        Ok(commits)
    }

    /// Render the log the way `log` prints it
    pub fn render_log(&self, revision: Option<&str>) -> anyhow::Result<String> {
        let mut out = String::new();

        for (oid, commit) in self.log(revision)? {
            let _ = writeln!(out, "commit {oid}");
            let _ = writeln!(out, "Author: {}", commit.author().display_name());
            let _ = writeln!(out, "Date:   {}", commit.author().readable_timestamp());
            let _ = writeln!(out);
            for line in commit.message().lines() {
                let _ = writeln!(out, "    {line}");
            }
            let _ = writeln!(out);
        }

        Ok(out)
    }
}
