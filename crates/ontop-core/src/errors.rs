use std::path::PathBuf;

use crate::codec::FramingError;

/// Fatal conditions; each one aborts the run with exit code 1.
#[derive(thiserror::Error, Debug)]
pub enum HostError {
    #[error("missing required tool(s): {}; please install them", .tools.join(", "))]
    DependencyMissing { tools: Vec<String> },
    #[error("build failed during {step}: {detail}")]
    BuildFailure { step: &'static str, detail: String },
    #[error("failed to install {}: {detail}", .path.display())]
    InstallWrite { path: PathBuf, detail: String },
    #[error("native messaging protocol error: {0}")]
    Framing(#[from] FramingError),
}

impl HostError {
    pub(crate) fn build(step: &'static str, err: &anyhow::Error) -> Self {
        HostError::BuildFailure {
            step,
            detail: format!("{err:#}"),
        }
    }

    pub(crate) fn install(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        HostError::InstallWrite {
            path: path.into(),
            detail: format!("{err:#}"),
        }
    }

    /// Short stable code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            HostError::DependencyMissing { .. } => "dependency-missing",
            HostError::BuildFailure { .. } => "build-failure",
            HostError::InstallWrite { .. } => "install-write-failure",
            HostError::Framing(_) => "protocol-framing-error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_error_lists_every_tool() {
        let err = HostError::DependencyMissing {
            tools: vec!["xdotool".into(), "wmctrl".into()],
        };
        assert_eq!(
            err.to_string(),
            "missing required tool(s): xdotool, wmctrl; please install them"
        );
        assert_eq!(err.code(), "dependency-missing");
    }

    #[test]
    fn install_error_keeps_context_chain() {
        let source = anyhow::anyhow!("disk full").context("writing manifest");
        let err = HostError::install("/hosts/always_on_top.json", &source);
        assert_eq!(
            err.to_string(),
            "failed to install /hosts/always_on_top.json: writing manifest: disk full"
        );
    }
}
