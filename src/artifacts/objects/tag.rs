//! Annotated tag object
//!
//! A tag is an immutable, named pointer to a commit carrying its own
//! tagger identity and message. The `refs/tags/<name>` reference points at
//! the tag object, which in turn points at the commit.
//!
//! On disk:
//! ```text
//! tag <size>\0
//! object <commit-id>
//! type commit
//! tag <name>
//! tagger <name> <email> <timestamp> <timezone>
//!
//! <message>
//! ```

use crate::artifacts::objects::commit::Identity;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object::{Object, Packable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{CoreError, CoreResult};
use bytes::Bytes;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Tag {
    target: ObjectId,
    name: String,
    tagger: Identity,
    message: String,
}

impl Tag {
    pub fn new(target: ObjectId, name: String, tagger: Identity, message: String) -> Self {
        Tag {
            target,
            name,
            tagger,
            message,
        }
    }

    pub fn target(&self) -> &ObjectId {
        &self.target
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tagger(&self) -> &Identity {
        &self.tagger
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Packable for Tag {
    fn serialize(&self) -> CoreResult<Bytes> {
        let object_content = [
            format!("object {}", self.target.as_ref()),
            "type commit".to_string(),
            format!("tag {}", self.name),
            format!("tagger {}", self.tagger.display()),
            String::new(),
            self.message.to_string(),
        ]
        .join("\n");
        let content_bytes = object_content.into_bytes();

        let mut tag_bytes = Vec::new();
        let header = format!("{} {}\0", self.object_type().as_str(), content_bytes.len());
        tag_bytes.write_all(header.as_bytes())?;
        tag_bytes.write_all(&content_bytes)?;

        Ok(Bytes::from(tag_bytes))
    }
}

impl Unpackable for Tag {
    fn deserialize(reader: impl BufRead) -> CoreResult<Self> {
        let content = reader
            .bytes()
            .collect::<Result<Vec<u8>, std::io::Error>>()?;
        let content = String::from_utf8(content)
            .map_err(|_| CoreError::Validation("tag payload is not utf-8".to_string()))?;
        let mut lines = content.lines();

        let target = lines
            .next()
            .and_then(|line| line.strip_prefix("object "))
            .ok_or_else(|| CoreError::Validation("tag is missing its object line".to_string()))?;
        let target = ObjectId::try_parse(target.to_string())?;

        let _type_line = lines
            .next()
            .and_then(|line| line.strip_prefix("type "))
            .ok_or_else(|| CoreError::Validation("tag is missing its type line".to_string()))?;

        let name = lines
            .next()
            .and_then(|line| line.strip_prefix("tag "))
            .ok_or_else(|| CoreError::Validation("tag is missing its name line".to_string()))?
            .to_string();

        let tagger = lines
            .next()
            .and_then(|line| line.strip_prefix("tagger "))
            .ok_or_else(|| CoreError::Validation("tag is missing its tagger line".to_string()))?;
        let tagger = Identity::try_from(tagger)?;

        // skip the empty line
        lines.next();

        let message = lines.collect::<Vec<&str>>().join("\n");
        Ok(Self::new(target, name, tagger, message))
    }
}

impl Object for Tag {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tag
    }

    fn display(&self) -> String {
        [
            format!("object {}", self.target.as_ref()),
            "type commit".to_string(),
            format!("tag {}", self.name),
            format!("tagger {}", self.tagger.display()),
            String::new(),
            self.message.to_string(),
        ]
        .join("\n")
    }
}
