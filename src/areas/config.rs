//! Typed repository configuration
//!
//! The core needs exactly two settings, the committing user's name and
//! email, so the configuration is an explicit struct validated once at
//! load time instead of a free-form key/value bag. Values come from
//! `.mingit/config.toml`, with `MINGIT_AUTHOR_NAME` / `MINGIT_AUTHOR_EMAIL`
//! taking precedence so scripts and tests can inject identities.
//!
//! `MINGIT_AUTHOR_DATE` optionally pins the commit timestamp.

use crate::artifacts::objects::commit::Identity;
use crate::errors::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub user: UserConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub name: String,
    pub email: String,
}

impl Config {
    /// Load the configuration for a repository metadata directory
    ///
    /// Environment variables win over the file; a repository with neither
    /// cannot commit and says so up front.
    pub fn load(meta_path: &Path) -> CoreResult<Self> {
        let env_name = std::env::var("MINGIT_AUTHOR_NAME").ok();
        let env_email = std::env::var("MINGIT_AUTHOR_EMAIL").ok();

        let file_config = Self::load_file(&meta_path.join(CONFIG_FILE))?;

        let name = env_name.or_else(|| file_config.as_ref().map(|c| c.user.name.clone()));
        let email = env_email.or_else(|| file_config.as_ref().map(|c| c.user.email.clone()));

        match (name, email) {
            (Some(name), Some(email)) => Ok(Config {
                user: UserConfig { name, email },
            }),
            _ => Err(CoreError::Validation(
                "no committer identity configured; set user.name and user.email in \
                 config.toml or export MINGIT_AUTHOR_NAME and MINGIT_AUTHOR_EMAIL"
                    .to_string(),
            )),
        }
    }

    fn load_file(path: &Path) -> CoreResult<Option<Config>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content).map_err(|error| {
            CoreError::Validation(format!("invalid configuration file: {error}"))
        })?;

        Ok(Some(config))
    }

    pub fn save(&self, meta_path: &Path) -> CoreResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|error| CoreError::Validation(format!("unserializable config: {error}")))?;
        std::fs::write(meta_path.join(CONFIG_FILE), content)?;
        Ok(())
    }

    /// Identity for the next commit or tag
    ///
    /// `MINGIT_AUTHOR_DATE` pins the timestamp (RFC 2822 or
    /// `%Y-%m-%d %H:%M:%S %z`), otherwise the current time is used.
    pub fn author(&self) -> Identity {
        let timestamp = std::env::var("MINGIT_AUTHOR_DATE").ok().and_then(|date| {
            chrono::DateTime::parse_from_rfc2822(&date)
                .or_else(|_| chrono::DateTime::parse_from_str(&date, "%Y-%m-%d %H:%M:%S %z"))
                .ok()
        });

        match timestamp {
            Some(timestamp) => Identity::at(
                self.user.name.clone(),
                self.user.email.clone(),
                timestamp,
            ),
            None => Identity::new(self.user.name.clone(), self.user.email.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_round_trip() {
        let dir = assert_fs::TempDir::new().unwrap();
        let config = Config {
            user: UserConfig {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
            },
        };

        config.save(dir.path()).unwrap();
        let loaded = Config::load_file(&dir.path().join(CONFIG_FILE))
            .unwrap()
            .unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = assert_fs::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[user]\nname = \"A\"\nemail = \"a@b.c\"\nshell = \"zsh\"\n",
        )
        .unwrap();

        let err = Config::load_file(&dir.path().join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
