use crate::artifacts::branch::INVALID_BRANCH_NAME_REGEX;
use crate::errors::{CoreError, CoreResult};
use derive_new::new;

const HEADS_PREFIX: &str = "refs/heads/";
const TAGS_PREFIX: &str = "refs/tags/";
const REMOTES_PREFIX: &str = "refs/remotes/";

/// Full reference name as stored on disk, e.g. `refs/heads/master` or `HEAD`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord, new)]
pub struct RefName(String);

impl RefName {
    pub fn head() -> Self {
        RefName("HEAD".to_string())
    }

    pub fn branch(name: &BranchName) -> Self {
        RefName(format!("{HEADS_PREFIX}{}", name.as_ref()))
    }

    pub fn tag(name: &str) -> Self {
        RefName(format!("{TAGS_PREFIX}{name}"))
    }

    pub fn is_detached_head(&self) -> bool {
        self.0.starts_with("HEAD")
    }

    pub fn as_ref_path(&self) -> &str {
        &self.0
    }

    /// Short name for display: `refs/heads/x` -> `x`, `refs/remotes/o/x` -> `o/x`
    pub fn short_name(&self) -> &str {
        self.0
            .strip_prefix(HEADS_PREFIX)
            .or_else(|| self.0.strip_prefix(TAGS_PREFIX))
            .or_else(|| self.0.strip_prefix(REMOTES_PREFIX))
            .unwrap_or(&self.0)
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated short branch name, e.g. `master` or `feature/login`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    pub fn try_parse(name: String) -> CoreResult<Self> {
        if name.is_empty() {
            return Err(CoreError::Validation(
                "branch name cannot be empty".to_string(),
            ));
        }

        let re = regex::Regex::new(INVALID_BRANCH_NAME_REGEX).map_err(|_| {
            CoreError::Validation(format!(
                "invalid branch name regex: {INVALID_BRANCH_NAME_REGEX}"
            ))
        })?;

        if re.is_match(&name) {
            Err(CoreError::Validation(format!("invalid branch name: {name}")))
        } else {
            Ok(Self(name))
        }
    }

    pub fn try_parse_ref_name(ref_name: &RefName) -> CoreResult<Self> {
        if !ref_name.0.starts_with(HEADS_PREFIX) && !ref_name.0.starts_with("HEAD") {
            return Err(CoreError::Validation(format!(
                "reference name must start with '{HEADS_PREFIX}' or 'HEAD', got '{}'",
                ref_name.0
            )));
        }

        let name = ref_name.0.trim_start_matches(HEADS_PREFIX);
        Self::try_parse(name.to_string())
    }

    pub fn is_default_branch(&self) -> bool {
        self.0 == "master" || self.0 == "main"
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::proptest;

    proptest! {
        #[test]
        fn valid_simple_names(branch_name in "[a-zA-Z0-9_-]+") {
            assert!(BranchName::try_parse(branch_name).is_ok());
        }

        #[test]
        fn valid_names_with_slashes(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let branch_name = format!("{}/{}", prefix, suffix);
            assert!(BranchName::try_parse(branch_name).is_ok());
        }

        #[test]
        fn invalid_when_starting_with_dot(suffix in "[a-zA-Z0-9_-]+") {
            let branch_name = format!(".{}", suffix);
            assert!(BranchName::try_parse(branch_name).is_err());
        }

        #[test]
        fn invalid_when_ending_with_lock(prefix in "[a-zA-Z0-9_-]+") {
            let branch_name = format!("{}.lock", prefix);
            assert!(BranchName::try_parse(branch_name).is_err());
        }

        #[test]
        fn invalid_with_consecutive_dots(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let branch_name = format!("{}..{}", prefix, suffix);
            assert!(BranchName::try_parse(branch_name).is_err());
        }

        #[test]
        fn invalid_with_special_chars(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+",
            special_char in r"[\*:\?\[\\^~]"
        ) {
            let branch_name = format!("{}{}{}", prefix, special_char, suffix);
            assert!(BranchName::try_parse(branch_name).is_err());
        }
    }

    #[test]
    fn empty_name_is_invalid() {
        assert!(BranchName::try_parse("".to_string()).is_err());
    }

    #[test]
    fn hierarchical_names_are_valid() {
        assert!(BranchName::try_parse("feature/new-feature".to_string()).is_ok());
        assert!(BranchName::try_parse("bugfix/issue-123".to_string()).is_ok());
    }

    #[test]
    fn ref_name_short_forms() {
        let branch = BranchName::try_parse("feature/login".to_string()).unwrap();
        let ref_name = RefName::branch(&branch);
        assert_eq!(ref_name.as_ref_path(), "refs/heads/feature/login");
        assert_eq!(ref_name.short_name(), "feature/login");
        assert!(!ref_name.is_detached_head());
        assert!(RefName::head().is_detached_head());
    }
}
