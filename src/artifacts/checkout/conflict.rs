use std::fmt;

/// Ways a checkout can collide with local state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictType {
    /// A tracked file has local modifications the checkout would overwrite
    StaleFile,
    /// An untracked file sits where the checkout needs to write
    UntrackedOverwritten,
}

pub struct ConflictMessage {
    pub header: &'static str,
    pub footer: &'static str,
}

impl From<ConflictType> for ConflictMessage {
    fn from(conflict_type: ConflictType) -> Self {
        match conflict_type {
            ConflictType::StaleFile => ConflictMessage {
                header: "Your local changes to the following files would be overwritten by checkout:",
                footer: "Please commit your changes before you switch branches.",
            },
            ConflictType::UntrackedOverwritten => ConflictMessage {
                header: "The following untracked working tree files would be overwritten by checkout:",
                footer: "Please move or remove them before you switch branches.",
            },
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message: ConflictMessage = (*self).into();
        write!(f, "{}", message.header)
    }
}
