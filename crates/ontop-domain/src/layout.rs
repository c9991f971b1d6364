use std::fmt;
use std::path::{Path, PathBuf};

use crate::manifest::HOST_NAME;
use crate::state::{InstallState, InstallStateReport};

/// File name of the canonical artifact and of the executable inside a bundle.
pub const ARTIFACT_NAME: &str = "always_on_top.bin";

const BUILD_DIR: &str = "build";
const SOURCE_STAGE_DIR: &str = "src";
const BUILD_ENV_DIR: &str = "env";
const BUNDLE_BUILD_DIR: &str = "always_on_top.dist";

/// How the host executable is packaged on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PackagingMode {
    /// One self-contained executable file.
    #[default]
    SingleFile,
    /// A directory holding the executable and its runtime libraries.
    Bundle,
}

impl PackagingMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PackagingMode::SingleFile => "single-file",
            PackagingMode::Bundle => "bundle",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "single-file" => Some(PackagingMode::SingleFile),
            "bundle" => Some(PackagingMode::Bundle),
            _ => None,
        }
    }
}

impl fmt::Display for PackagingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every path the host reads or writes, derived from one install directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(format!("{HOST_NAME}.json"))
    }

    /// Canonical artifact: a file in single-file mode, a directory in bundle mode.
    pub fn artifact_path(&self) -> PathBuf {
        self.root.join(ARTIFACT_NAME)
    }

    /// The program the manifest points at and the bootstrap hands over to.
    pub fn executable_path(&self, mode: PackagingMode) -> PathBuf {
        match mode {
            PackagingMode::SingleFile => self.artifact_path(),
            PackagingMode::Bundle => self.artifact_path().join(ARTIFACT_NAME),
        }
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(BUILD_DIR)
    }

    pub fn source_stage_dir(&self) -> PathBuf {
        self.build_dir().join(SOURCE_STAGE_DIR)
    }

    pub fn build_env_dir(&self) -> PathBuf {
        self.build_dir().join(BUILD_ENV_DIR)
    }

    /// Where a freshly built (or copied) artifact waits before installation.
    pub fn build_artifact_path(&self, mode: PackagingMode) -> PathBuf {
        match mode {
            PackagingMode::SingleFile => self.build_dir().join(ARTIFACT_NAME),
            PackagingMode::Bundle => self.build_dir().join(BUNDLE_BUILD_DIR),
        }
    }

    /// Inspects the filesystem; nothing is cached between calls.
    pub fn inspect(&self) -> InstallStateReport {
        let artifact = self.artifact_path();
        InstallStateReport {
            artifact_exists: artifact.exists(),
            artifact_is_dir: artifact.is_dir(),
            manifest_exists: self.manifest_path().exists(),
        }
    }

    pub fn state(&self, mode: PackagingMode) -> InstallState {
        self.inspect().state_for(mode)
    }
}
