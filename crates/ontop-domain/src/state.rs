use crate::layout::PackagingMode;

/// Raw filesystem facts behind [`InstallState`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstallStateReport {
    pub artifact_exists: bool,
    pub artifact_is_dir: bool,
    pub manifest_exists: bool,
}

impl InstallStateReport {
    /// Single-file installs accept any artifact shape; bundles need a directory.
    pub fn state_for(self, mode: PackagingMode) -> InstallState {
        let artifact_present = match mode {
            PackagingMode::SingleFile => self.artifact_exists,
            PackagingMode::Bundle => self.artifact_exists && self.artifact_is_dir,
        };
        if artifact_present && self.manifest_exists {
            InstallState::Installed
        } else {
            InstallState::Incomplete {
                artifact_present,
                manifest_present: self.manifest_exists,
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallState {
    Installed,
    Incomplete {
        artifact_present: bool,
        manifest_present: bool,
    },
}

impl InstallState {
    #[must_use]
    pub fn is_installed(self) -> bool {
        matches!(self, InstallState::Installed)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            InstallState::Installed => "installed",
            InstallState::Incomplete {
                artifact_present: false,
                manifest_present: false,
            } => "not-installed",
            InstallState::Incomplete {
                artifact_present: false,
                ..
            } => "missing-artifact",
            InstallState::Incomplete { .. } => "missing-manifest",
        }
    }
}
