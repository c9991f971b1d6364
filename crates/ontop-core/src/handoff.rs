use std::convert::Infallible;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};

/// The installed program this process should become once bootstrap is done.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Handoff {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Handoff {
    pub fn new(program: PathBuf, args: Vec<OsString>) -> Self {
        Self { program, args }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Replaces the current process image with the installed host.
    ///
    /// Only returns when the exec itself fails.
    #[cfg(unix)]
    pub fn exec(self) -> Result<Infallible> {
        use std::os::unix::process::CommandExt;

        tracing::info!(program = %self.program.display(), "handing off to installed host");
        let err = Command::new(&self.program).args(&self.args).exec();
        Err(err).with_context(|| format!("failed to exec {}", self.program.display()))
    }

    /// Runs the installed host to completion and exits with its status.
    #[cfg(not(unix))]
    pub fn exec(self) -> Result<Infallible> {
        tracing::info!(program = %self.program.display(), "handing off to installed host");
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .with_context(|| format!("failed to start {}", self.program.display()))?;
        std::process::exit(status.code().unwrap_or(1));
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn failed_exec_reports_the_program() {
        let handoff = Handoff::new(
            PathBuf::from("/nonexistent/always_on_top.bin"),
            vec![OsString::from("chrome-extension://x/")],
        );
        assert_eq!(handoff.args().len(), 1);
        let err = handoff.exec().expect_err("exec must fail");
        assert!(format!("{err:#}").contains("/nonexistent/always_on_top.bin"));
    }
}
