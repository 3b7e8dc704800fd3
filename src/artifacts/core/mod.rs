//! Shared output utilities

use anyhow::Context;
use is_terminal::IsTerminal;
use minus::Pager;
use std::io::{self, Write};

/// `Write` adapter for the minus pager
///
/// Lets commands that normally write to stdout stream their output into a
/// pager instead, without knowing which one they got.
pub struct PagerWriter {
    pager: Pager,
}

impl PagerWriter {
    pub fn new(pager: Pager) -> Self {
        PagerWriter { pager }
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }
}

impl Write for PagerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s =
            std::str::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.pager.push_str(s).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Page long output on a terminal, print it plainly everywhere else
pub fn page_or_print(text: &str) -> anyhow::Result<()> {
    if text.is_empty() {
        return Ok(());
    }

    if io::stdout().is_terminal() {
        let pager = Pager::new();
        pager
            .push_str(text)
            .context("failed to hand output to the pager")?;
        minus::page_all(pager).context("pager failed")?;
    } else {
        print!("{text}");
    }

    Ok(())
}
