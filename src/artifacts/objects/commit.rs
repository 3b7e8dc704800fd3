//! Commit object
//!
//! Commits tie a tree snapshot to its history: zero parents for a root
//! commit, one for ordinary history, two or more for merges. Parent links
//! form a DAG, never a cycle, because a commit's id depends on its parents'
//! ids.
//!
//! ## Format
//!
//! On disk:
//! ```text
//! commit <size>\0
//! tree <tree-id>
//! parent <parent-id>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```

use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object::{Object, Packable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{CoreError, CoreResult};
use bytes::Bytes;
use std::io::{BufRead, Write};

/// Author or committer identity with a zoned timestamp
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Identity {
    name: String,
    email: String,
    timestamp: chrono::DateTime<chrono::FixedOffset>,
}

impl Identity {
    /// New identity stamped with the current local time
    pub fn new(name: String, email: String) -> Self {
        Identity {
            name,
            email,
            timestamp: chrono::Local::now().fixed_offset(),
        }
    }

    /// New identity with an explicit timestamp
    pub fn at(
        name: String,
        email: String,
        timestamp: chrono::DateTime<chrono::FixedOffset>,
    ) -> Self {
        Identity {
            name,
            email,
            timestamp,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// "Name <email@example.com>"
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// "Name <email> timestamp timezone", the serialized form
    pub fn display(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }

    /// "Mon Jan 1 12:34:56 2024 +0000"
    pub fn readable_timestamp(&self) -> String {
        self.timestamp
            .format("%a %b %-d %H:%M:%S %Y %z")
            .to_string()
    }

    /// RFC 2822 form, used by patch rendering
    pub fn rfc2822_timestamp(&self) -> String {
        self.timestamp.to_rfc2822()
    }

    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.timestamp
    }
}

impl TryFrom<&str> for Identity {
    type Error = CoreError;

    fn try_from(value: &str) -> CoreResult<Self> {
        // Format: "name <email> timestamp timezone"
        // Split from right to get timezone and timestamp first
        let parts: Vec<&str> = value.rsplitn(3, ' ').collect();
        if parts.len() < 3 {
            return Err(CoreError::Validation("invalid identity format".to_string()));
        }

        let timezone = parts[0];
        let timestamp = parts[1]
            .parse::<i64>()
            .map_err(|_| CoreError::Validation("invalid identity timestamp".to_string()))?;
        let name_email_part = parts[2]; // "name <email>"

        let email_start = name_email_part
            .find('<')
            .ok_or_else(|| CoreError::Validation("invalid identity: missing '<'".to_string()))?;
        let email_end = name_email_part
            .find('>')
            .ok_or_else(|| CoreError::Validation("invalid identity: missing '>'".to_string()))?;

        let name = name_email_part[..email_start].trim().to_string();
        let email = name_email_part[email_start + 1..email_end].to_string();

        // the timestamp is a UTC epoch; the offset only says how to render it
        let offset = parse_timezone_offset(timezone)?;
        let datetime = chrono::DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| CoreError::Validation("invalid identity timestamp".to_string()))?
            .with_timezone(&offset);

        Ok(Identity {
            name,
            email,
            timestamp: datetime,
        })
    }
}

/// Parse a `+hhmm` / `-hhmm` timezone suffix into a fixed offset
fn parse_timezone_offset(timezone: &str) -> CoreResult<chrono::FixedOffset> {
    let invalid = || CoreError::Validation(format!("invalid identity timezone: {timezone}"));

    if timezone.len() != 5 {
        return Err(invalid());
    }
    let (sign, digits) = timezone.split_at(1);
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;

    let seconds = (hours * 60 + minutes) * 60;
    let seconds = match sign {
        "+" => seconds,
        "-" => -seconds,
        _ => return Err(invalid()),
    };

    chrono::FixedOffset::east_opt(seconds).ok_or_else(invalid)
}

/// How a commit relates to its history, derived from the parent count
///
/// Callers branch on this variant instead of probing lookups and catching
/// failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parentage {
    /// First commit of a history
    Root,
    /// Ordinary commit with a single parent
    Linear(ObjectId),
    /// Merge commit with two or more parents
    Merge(Vec<ObjectId>),
}

/// Graph-walk projection of a commit: just identity, parents and time
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SlimCommit {
    pub oid: ObjectId,
    pub parents: Vec<ObjectId>,
    pub timestamp: chrono::DateTime<chrono::FixedOffset>,
}

impl PartialOrd for SlimCommit {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SlimCommit {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.timestamp.cmp(&other.timestamp)
    }
}

/// Snapshot of the repository with metadata
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    /// Parent commit ids (empty for a root commit, several for a merge)
    parents: Vec<ObjectId>,
    /// Tree object id of the directory snapshot
    tree_oid: ObjectId,
    author: Identity,
    committer: Identity,
    message: String,
}

impl Commit {
    pub fn new(
        parents: Vec<ObjectId>,
        tree_oid: ObjectId,
        author: Identity,
        message: String,
    ) -> Self {
        Commit {
            parents,
            tree_oid,
            author: author.clone(),
            committer: author,
            message,
        }
    }

    /// First line of the message, for one-line displays
    pub fn short_message(&self) -> String {
        self.message.lines().next().unwrap_or("").to_string()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    /// Tagged variant over the parent list
    pub fn parentage(&self) -> Parentage {
        match self.parents.as_slice() {
            [] => Parentage::Root,
            [single] => Parentage::Linear(single.clone()),
            many => Parentage::Merge(many.to_vec()),
        }
    }

    pub fn author(&self) -> &Identity {
        &self.author
    }

    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.author.timestamp()
    }
}

impl Packable for Commit {
    fn serialize(&self) -> CoreResult<Bytes> {
        let mut object_content = vec![];

        object_content.push(format!("tree {}", self.tree_oid.as_ref()));
        for parent in &self.parents {
            object_content.push(format!("parent {}", parent.as_ref()));
        }
        object_content.push(format!("author {}", self.author.display()));
        object_content.push(format!("committer {}", self.committer.display()));
        object_content.push(String::new());
        object_content.push(self.message.to_string());

        let object_content = object_content.join("\n");
        let content_bytes = object_content.into_bytes();

        let mut commit_bytes = Vec::new();
        let header = format!("{} {}\0", self.object_type().as_str(), content_bytes.len());
        commit_bytes.write_all(header.as_bytes())?;
        commit_bytes.write_all(&content_bytes)?;

        Ok(Bytes::from(commit_bytes))
    }
}

impl Unpackable for Commit {
    fn deserialize(reader: impl BufRead) -> CoreResult<Self> {
        let content = reader
            .bytes()
            .collect::<Result<Vec<u8>, std::io::Error>>()?;

        let content = String::from_utf8(content)
            .map_err(|_| CoreError::Validation("commit payload is not utf-8".to_string()))?;
        let mut lines = content.lines();

        let tree_line = lines
            .next()
            .ok_or_else(|| CoreError::Validation("commit is missing its tree line".to_string()))?;
        let tree_oid = tree_line
            .strip_prefix("tree ")
            .ok_or_else(|| CoreError::Validation("commit has an invalid tree line".to_string()))?
            .to_string();
        let tree_oid = ObjectId::try_parse(tree_oid)?;

        // Parse all parent lines (0, 1, or several)
        let mut parents = Vec::new();
        let mut next_line = lines.next().ok_or_else(|| {
            CoreError::Validation("commit is missing its author line".to_string())
        })?;

        while let Some(parent_oid) = next_line.strip_prefix("parent ") {
            parents.push(ObjectId::try_parse(parent_oid.to_string())?);

            next_line = lines.next().ok_or_else(|| {
                CoreError::Validation("commit is missing its author line".to_string())
            })?;
        }

        let author = next_line.strip_prefix("author ").ok_or_else(|| {
            CoreError::Validation("commit has an invalid author line".to_string())
        })?;
        let author = Identity::try_from(author)?;

        let committer_line = lines.next().ok_or_else(|| {
            CoreError::Validation("commit is missing its committer line".to_string())
        })?;
        let committer = committer_line.strip_prefix("committer ").ok_or_else(|| {
            CoreError::Validation("commit has an invalid committer line".to_string())
        })?;
        let _committer = Identity::try_from(committer)?;

        // skip the empty line
        lines.next();

        let message = lines.collect::<Vec<&str>>().join("\n");
        Ok(Self::new(parents, tree_oid, author, message))
    }
}

impl Object for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }

    fn display(&self) -> String {
        let mut lines = vec![];

        lines.push(format!("tree {}", self.tree_oid.as_ref()));
        for parent in &self.parents {
            lines.push(format!("parent {}", parent.as_ref()));
        }
        lines.push(format!("author {}", self.author.display()));
        lines.push(format!("committer {}", self.committer.display()));
        lines.push(String::new());
        lines.push(self.message.to_string());

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::object_type::ObjectType;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn oid(fill: char) -> ObjectId {
        ObjectId::try_parse(fill.to_string().repeat(40)).unwrap()
    }

    fn identity() -> Identity {
        let ts = chrono::DateTime::parse_from_rfc3339("2024-03-01T10:00:00+02:00").unwrap();
        Identity::at("Alice".to_string(), "alice@example.com".to_string(), ts)
    }

    #[test]
    fn identity_display_round_trips() {
        let id = identity();
        let parsed = Identity::try_from(id.display().as_str()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn serialization_round_trips_with_merge_parents() {
        let commit = Commit::new(
            vec![oid('a'), oid('b')],
            oid('c'),
            identity(),
            "Merge branch 'feature'\n\nDetails.".to_string(),
        );

        let bytes = commit.serialize().unwrap();
        let mut reader = Cursor::new(bytes);
        ObjectType::parse_object_type(&mut reader).unwrap();
        let parsed = Commit::deserialize(reader).unwrap();

        assert_eq!(parsed, commit);
    }

    #[test]
    fn parentage_is_derived_from_parent_count() {
        let root = Commit::new(vec![], oid('c'), identity(), "root".to_string());
        assert_eq!(root.parentage(), Parentage::Root);

        let linear = Commit::new(vec![oid('a')], oid('c'), identity(), "one".to_string());
        assert_eq!(linear.parentage(), Parentage::Linear(oid('a')));

        let merge = Commit::new(vec![oid('a'), oid('b')], oid('c'), identity(), "m".to_string());
        assert_eq!(merge.parentage(), Parentage::Merge(vec![oid('a'), oid('b')]));
    }
}
