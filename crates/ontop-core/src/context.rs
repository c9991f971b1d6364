use std::env;
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use ontop_domain::PackagingMode;

/// Whether the running executable is a packaged host or a plain source build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildMarker {
    Source,
    Packaged(PackagingMode),
}

impl BuildMarker {
    /// Reads the packaging mode stamped in at compile time by the build
    /// pipeline; `frozen` marks an unstamped executable as packaged in the
    /// active mode.
    pub fn resolve(frozen: bool, active: PackagingMode) -> Self {
        Self::from_stamp(option_env!("ONTOP_PACKAGING_MODE"), frozen, active)
    }

    pub(crate) fn from_stamp(stamp: Option<&str>, frozen: bool, active: PackagingMode) -> Self {
        match stamp.and_then(PackagingMode::from_label) {
            Some(mode) => BuildMarker::Packaged(mode),
            None if frozen => BuildMarker::Packaged(active),
            None => BuildMarker::Source,
        }
    }

    /// True when the running executable can be installed as-is in `mode`.
    pub fn packaged_as(self, mode: PackagingMode) -> bool {
        self == BuildMarker::Packaged(mode)
    }

    pub fn label(self) -> &'static str {
        match self {
            BuildMarker::Source => "source",
            BuildMarker::Packaged(PackagingMode::SingleFile) => "packaged-single-file",
            BuildMarker::Packaged(PackagingMode::Bundle) => "packaged-bundle",
        }
    }
}

/// Flags parsed from the command line that steer the state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InvocationFlags {
    pub force: bool,
    pub keep_build: bool,
    pub packaging: PackagingMode,
}

/// Read-only facts about this process, captured once at startup.
#[derive(Clone, Debug)]
pub struct ProcessContext {
    /// Arguments after the program name, exactly as received.
    pub args: Vec<OsString>,
    pub force: bool,
    pub keep_build: bool,
    pub packaging: PackagingMode,
    pub marker: BuildMarker,
    pub stdin_is_terminal: bool,
    pub executable: PathBuf,
}

impl ProcessContext {
    /// Captures the running process.
    ///
    /// # Errors
    /// Returns an error when the path of the running executable cannot be resolved.
    pub fn capture(args: Vec<OsString>, flags: InvocationFlags, frozen: bool) -> Result<Self> {
        let executable = env::current_exe().context("resolving the running executable")?;
        Ok(Self::new(
            args,
            flags,
            BuildMarker::resolve(frozen, flags.packaging),
            io::stdin().is_terminal(),
            executable,
        ))
    }

    pub fn new(
        args: Vec<OsString>,
        flags: InvocationFlags,
        marker: BuildMarker,
        stdin_is_terminal: bool,
        executable: PathBuf,
    ) -> Self {
        Self {
            args,
            force: flags.force,
            keep_build: flags.keep_build,
            packaging: flags.packaging,
            marker,
            stdin_is_terminal,
            executable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::PACKAGING_ENV;

    #[test]
    fn compile_stamp_wins_over_frozen_flag() {
        let marker = BuildMarker::from_stamp(Some("bundle"), true, PackagingMode::SingleFile);
        assert_eq!(marker, BuildMarker::Packaged(PackagingMode::Bundle));
        assert!(!marker.packaged_as(PackagingMode::SingleFile));
        assert!(marker.packaged_as(PackagingMode::Bundle));
    }

    #[test]
    fn frozen_flag_follows_active_mode() {
        let marker = BuildMarker::from_stamp(None, true, PackagingMode::Bundle);
        assert_eq!(marker.label(), "packaged-bundle");
        assert_eq!(
            BuildMarker::from_stamp(Some("garbage"), false, PackagingMode::Bundle),
            BuildMarker::Source
        );
    }

    #[test]
    fn packaging_env_name_matches_stamp_lookup() {
        assert_eq!(PACKAGING_ENV, "ONTOP_PACKAGING_MODE");
    }
}
