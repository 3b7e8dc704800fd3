use crate::areas::repository::Repository;
use crate::errors::CoreError;
use crate::transport::Transport;
use std::io::Write;
use std::path::Path;

impl Repository {
    /// Clone a remote repository through the transport collaborator
    ///
    /// The transport owns all network I/O; by the time it returns, the
    /// destination holds a complete metadata directory and this function
    /// only opens a handle over it. An occupied destination is refused
    /// before the transport runs.
    pub fn clone_from(
        transport: &dyn Transport,
        url: &str,
        destination: &str,
        bare: bool,
        writer: Box<dyn std::io::Write>,
    ) -> anyhow::Result<Repository> {
        if Path::new(destination).exists() {
            return Err(CoreError::AlreadyExists(destination.to_string()).into());
        }

        transport.clone_repo(url, Path::new(destination), bare)?;

        Repository::new(destination, writer)
    }

    /// Update remote-tracking references for `remote`
    pub fn fetch(&mut self, transport: &dyn Transport, remote: &str) -> anyhow::Result<()> {
        let updated = transport.fetch(remote)?;

        for reference in &updated {
            writeln!(self.writer(), "updated {}", reference.as_ref_path())?;
        }

        Ok(())
    }

    /// Publish local references matching `refspec`
    pub fn push(&mut self, transport: &dyn Transport, refspec: &str) -> anyhow::Result<()> {
        transport.push(refspec)?;

        Ok(())
    }
}
