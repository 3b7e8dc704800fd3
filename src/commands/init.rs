use crate::areas::repository::{META_DIR, Repository};
use std::io::Write;

const DEFAULT_BRANCH: &str = "master";

impl Repository {
    pub fn init(&mut self) -> anyhow::Result<()> {
        let meta = self.path().join(META_DIR);

        std::fs::create_dir_all(meta.join("objects"))?;
        std::fs::create_dir_all(meta.join("refs").join("heads"))?;
        std::fs::create_dir_all(meta.join("refs").join("tags"))?;

        let head = meta.join("HEAD");
        if !head.exists() {
            std::fs::write(&head, format!("ref: refs/heads/{DEFAULT_BRANCH}"))?;
        }

        writeln!(
            self.writer(),
            "Initialized empty repository at {}",
            self.path().display()
        )?;

        Ok(())
    }
}
