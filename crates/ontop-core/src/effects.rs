use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use super::process::{run_command, RunOutput};
use crate::HostConfig;

pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &Path,
        args: &[String],
        envs: &[(String, String)],
        cwd: Option<&Path>,
    ) -> Result<RunOutput>;
}

pub trait ToolLocator: Send + Sync {
    fn locate(&self, tool: &str) -> Option<PathBuf>;
}

pub trait Effects: Send + Sync {
    fn runner(&self) -> &dyn CommandRunner;
    fn tools(&self) -> &dyn ToolLocator;
}

pub struct SystemEffects {
    runner: Arc<SystemCommandRunner>,
    tools: Arc<SystemToolLocator>,
}

impl SystemEffects {
    #[must_use]
    pub fn new(config: &HostConfig) -> Self {
        Self {
            runner: Arc::new(SystemCommandRunner),
            tools: Arc::new(SystemToolLocator {
                search_path: config.search_path().cloned(),
            }),
        }
    }
}

impl Effects for SystemEffects {
    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn tools(&self) -> &dyn ToolLocator {
        self.tools.as_ref()
    }
}

struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(
        &self,
        program: &Path,
        args: &[String],
        envs: &[(String, String)],
        cwd: Option<&Path>,
    ) -> Result<RunOutput> {
        run_command(program, args, envs, cwd)
    }
}

struct SystemToolLocator {
    search_path: Option<OsString>,
}

impl ToolLocator for SystemToolLocator {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        which::which_in(tool, self.search_path.as_ref(), cwd).ok()
    }
}
