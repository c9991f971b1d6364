use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use ontop_domain::{InstallLayout, PackagingMode, ARTIFACT_NAME};

use crate::effects::Effects;
use crate::fs::remove_path;
use crate::{HostConfig, HostError, RunOutput};

pub const CARGO: &str = "cargo";
pub const RUSTUP: &str = "rustup";

/// Compile-time variable that stamps the packaging mode into the product.
pub const PACKAGING_ENV: &str = "ONTOP_PACKAGING_MODE";

const CLI_PACKAGE: &str = "ontop-cli";
const BINARY_NAME: &str = "always_on_top";
const TARGET_DIR: &str = "target";
const CARGO_HOME_DIR: &str = "cargo-home";
const BUNDLE_RUSTFLAGS: &str = "-C prefer-dynamic -C link-arg=-Wl,-rpath,$ORIGIN";

/// A build output waiting in the build area; not canonical until installed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildArtifact {
    pub mode: PackagingMode,
    pub location: PathBuf,
}

/// Compiles the staged sources into a host artifact with the Rust toolchain.
pub struct BuildPipeline<'a> {
    layout: &'a InstallLayout,
    toolchain: &'a str,
    effects: &'a dyn Effects,
}

impl<'a> BuildPipeline<'a> {
    pub fn new(config: &'a HostConfig, effects: &'a dyn Effects) -> Self {
        Self {
            layout: config.layout(),
            toolchain: config.toolchain(),
            effects,
        }
    }

    /// Builds the staged sources in `mode`.
    ///
    /// # Errors
    /// Returns [`HostError::BuildFailure`] when any toolchain step fails or
    /// the expected output is missing afterwards.
    pub fn run(&self, mode: PackagingMode) -> Result<BuildArtifact, HostError> {
        tracing::info!(mode = %mode, toolchain = self.toolchain, "compiling host");
        let env_dir = self.ensure_environment()?;
        self.install_toolchain()?;
        let compiled = self.compile(mode, &env_dir)?;
        self.assemble(mode, &compiled)
    }

    fn ensure_environment(&self) -> Result<PathBuf, HostError> {
        let env_dir = self.layout.build_env_dir();
        if env_dir.is_dir() {
            tracing::debug!(path = %env_dir.display(), "reusing build environment");
        } else {
            fs::create_dir_all(&env_dir)
                .with_context(|| format!("creating {}", env_dir.display()))
                .map_err(|err| HostError::build("prepare build environment", &err))?;
            tracing::info!(path = %env_dir.display(), "created build environment");
        }
        Ok(env_dir)
    }

    fn install_toolchain(&self) -> Result<(), HostError> {
        self.step(
            "install toolchain",
            &[
                "toolchain",
                "install",
                self.toolchain,
                "--profile",
                "minimal",
                "--no-self-update",
            ],
            &[],
            None,
        )
        .map(|_| ())
    }

    fn compile(&self, mode: PackagingMode, env_dir: &Path) -> Result<PathBuf, HostError> {
        let target_dir = env_dir.join(TARGET_DIR);
        let mut envs = vec![
            (
                "CARGO_HOME".to_string(),
                env_dir.join(CARGO_HOME_DIR).display().to_string(),
            ),
            (
                "CARGO_TARGET_DIR".to_string(),
                target_dir.display().to_string(),
            ),
            (PACKAGING_ENV.to_string(), mode.as_str().to_string()),
        ];
        if mode == PackagingMode::Bundle {
            envs.push(("RUSTFLAGS".to_string(), BUNDLE_RUSTFLAGS.to_string()));
        }
        let source = self.layout.source_stage_dir();
        self.step(
            "compile",
            &[
                "run",
                self.toolchain,
                CARGO,
                "build",
                "--release",
                "-p",
                CLI_PACKAGE,
            ],
            &envs,
            Some(&source),
        )?;

        let compiled = target_dir
            .join("release")
            .join(format!("{BINARY_NAME}{}", std::env::consts::EXE_SUFFIX));
        if !compiled.is_file() {
            return Err(HostError::BuildFailure {
                step: "compile",
                detail: format!(
                    "toolchain reported success but {} is missing",
                    compiled.display()
                ),
            });
        }
        tracing::debug!(path = %compiled.display(), "compiled host");
        Ok(compiled)
    }

    fn assemble(&self, mode: PackagingMode, compiled: &Path) -> Result<BuildArtifact, HostError> {
        let location = self.layout.build_artifact_path(mode);
        let result = match mode {
            PackagingMode::SingleFile => fs::copy(compiled, &location)
                .map(|_| ())
                .with_context(|| format!("copying {} to {}", compiled.display(), location.display())),
            PackagingMode::Bundle => {
                let libraries = self.runtime_libraries()?;
                assemble_bundle(compiled, &libraries, &location)
            }
        };
        result.map_err(|err| HostError::build("assemble artifact", &err))?;

        if !location.exists() {
            return Err(HostError::BuildFailure {
                step: "assemble artifact",
                detail: format!("{} is missing after assembly", location.display()),
            });
        }
        tracing::info!(mode = %mode, path = %location.display(), "build artifact ready");
        Ok(BuildArtifact { mode, location })
    }

    /// Shared standard library objects that a `prefer-dynamic` binary loads at runtime.
    fn runtime_libraries(&self) -> Result<Vec<PathBuf>, HostError> {
        let output = self.step(
            "locate runtime libraries",
            &["run", self.toolchain, "rustc", "--print", "sysroot"],
            &[],
            None,
        )?;
        let lib_dir = PathBuf::from(output.stdout.trim()).join("lib");
        let entries = fs::read_dir(&lib_dir)
            .with_context(|| format!("reading {}", lib_dir.display()))
            .map_err(|err| HostError::build("locate runtime libraries", &err))?;
        let mut libraries: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| is_std_runtime_library(path))
            .collect();
        libraries.sort();
        if libraries.is_empty() {
            return Err(HostError::BuildFailure {
                step: "locate runtime libraries",
                detail: format!("no libstd runtime library under {}", lib_dir.display()),
            });
        }
        Ok(libraries)
    }

    fn step(
        &self,
        step: &'static str,
        args: &[&str],
        envs: &[(String, String)],
        cwd: Option<&Path>,
    ) -> Result<RunOutput, HostError> {
        let program = self
            .effects
            .tools()
            .locate(RUSTUP)
            .ok_or_else(|| HostError::DependencyMissing {
                tools: vec![RUSTUP.to_string()],
            })?;
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        tracing::info!(step, command = %args.join(" "), "running rustup");
        let output = self
            .effects
            .runner()
            .run(&program, &args, envs, cwd)
            .map_err(|err| HostError::build(step, &err))?;
        if !output.success() {
            return Err(HostError::build(
                step,
                &anyhow!(
                    "rustup exited with code {}: {}",
                    output.code,
                    output.stderr_tail(20)
                ),
            ));
        }
        Ok(output)
    }
}

fn is_std_runtime_library(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            name.starts_with(&format!("{}std-", std::env::consts::DLL_PREFIX))
                && name.ends_with(std::env::consts::DLL_SUFFIX)
        })
}

fn assemble_bundle(compiled: &Path, libraries: &[PathBuf], location: &Path) -> anyhow::Result<()> {
    remove_path(location)?;
    fs::create_dir_all(location).with_context(|| format!("creating {}", location.display()))?;
    let executable = location.join(ARTIFACT_NAME);
    fs::copy(compiled, &executable)
        .with_context(|| format!("copying {} to {}", compiled.display(), executable.display()))?;
    for library in libraries {
        let Some(name) = library.file_name() else {
            continue;
        };
        let dest = location.join(name);
        fs::copy(library, &dest)
            .with_context(|| format!("copying {} to {}", library.display(), dest.display()))?;
    }
    Ok(())
}
