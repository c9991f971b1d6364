use std::ffi::OsString;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ontop_domain::{InstallLayout, PackagingMode, ARTIFACT_NAME};

use crate::build::{BuildArtifact, BuildPipeline};
use crate::deps::{check_dependencies, required_tools};
use crate::effects::Effects;
use crate::fs::{copy_tree, remove_path, same_path, STAGING_SKIP};
use crate::install::Installer;
use crate::{Handoff, HostConfig, HostError, ProcessContext};

/// Flags that only steer the bootstrap and must not reach the installed host.
const BOOTSTRAP_ONLY_FLAGS: [&str; 3] = ["--force", "--keep-build", "--keepbuild"];

pub fn needs_bootstrap(ctx: &ProcessContext, layout: &InstallLayout) -> bool {
    if ctx.force {
        return true;
    }
    let state = layout.state(ctx.packaging);
    tracing::debug!(state = state.as_str(), mode = %ctx.packaging, "install state");
    !state.is_installed()
}

/// Installs the host and returns the process it should hand off to.
///
/// Steps run strictly in order: dependency check, source staging, build
/// (or copy of the already packaged executable), artifact install, manifest
/// write, build area purge. The manifest is written last so it never names
/// a missing executable.
pub fn run_bootstrap(
    ctx: &ProcessContext,
    config: &HostConfig,
    effects: &dyn Effects,
) -> Result<Handoff, HostError> {
    let layout = config.layout();
    tracing::info!(
        mode = %ctx.packaging,
        marker = ctx.marker.label(),
        force = ctx.force,
        root = %layout.root().display(),
        "bootstrapping host"
    );
    check_dependencies(&required_tools(ctx), effects.tools())?;

    let packaged = ctx.marker.packaged_as(ctx.packaging);
    materialize(layout, (!packaged).then(|| config.source_root()))?;

    let artifact = if packaged {
        copy_running_artifact(ctx, layout)?
    } else {
        BuildPipeline::new(config, effects).run(ctx.packaging)?
    };

    let installer = Installer::new(layout);
    let executable = installer.install_artifact(&artifact)?;
    installer.write_manifest(ctx.packaging)?;

    if ctx.keep_build {
        tracing::info!(path = %layout.build_dir().display(), "keeping build area");
    } else {
        purge(layout);
    }

    Ok(Handoff::new(executable, forwarded_args(&ctx.args)))
}

/// The original arguments without the bootstrap-only flags.
pub fn forwarded_args(args: &[OsString]) -> Vec<OsString> {
    args.iter()
        .filter(|arg| {
            arg.to_str()
                .is_none_or(|arg| !BOOTSTRAP_ONLY_FLAGS.contains(&arg))
        })
        .cloned()
        .collect()
}

fn materialize(layout: &InstallLayout, sources: Option<&Path>) -> Result<(), HostError> {
    const STEP: &str = "stage sources";

    let build_dir = layout.build_dir();
    fs::create_dir_all(&build_dir)
        .with_context(|| format!("creating {}", build_dir.display()))
        .map_err(|err| HostError::build(STEP, &err))?;

    let Some(sources) = sources else {
        return Ok(());
    };
    if !sources.join("Cargo.toml").is_file() {
        return Err(HostError::build(
            STEP,
            &anyhow!(
                "no Cargo workspace at {}; set ONTOP_SOURCE_DIR",
                sources.display()
            ),
        ));
    }
    let stage = layout.source_stage_dir();
    if same_path(sources, &stage) {
        tracing::debug!(path = %stage.display(), "sources already staged in place");
        return Ok(());
    }
    stage_sources(sources, &stage, layout.root()).map_err(|err| HostError::build(STEP, &err))?;
    tracing::info!(from = %sources.display(), to = %stage.display(), "staged sources");
    Ok(())
}

fn stage_sources(sources: &Path, stage: &Path, install_root: &Path) -> Result<()> {
    remove_path(stage)?;
    copy_tree(sources, stage, |path| {
        let skipped_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| STAGING_SKIP.contains(&name));
        skipped_name || same_path(path, install_root)
    })
}

/// Places the running, already packaged executable in the build area.
fn copy_running_artifact(
    ctx: &ProcessContext,
    layout: &InstallLayout,
) -> Result<BuildArtifact, HostError> {
    const STEP: &str = "copy packaged host";

    let dest = layout.build_artifact_path(ctx.packaging);
    let copied = match ctx.packaging {
        PackagingMode::SingleFile => copy_executable(&ctx.executable, &dest),
        PackagingMode::Bundle => copy_bundle(&ctx.executable, &dest, layout),
    };
    copied.map_err(|err| HostError::build(STEP, &err))?;
    tracing::info!(
        from = %ctx.executable.display(),
        to = %dest.display(),
        "copied packaged host into build area"
    );
    Ok(BuildArtifact {
        mode: ctx.packaging,
        location: dest,
    })
}

fn copy_executable(executable: &Path, dest: &Path) -> Result<()> {
    if same_path(executable, dest) {
        return Ok(());
    }
    fs::copy(executable, dest)
        .with_context(|| format!("copying {} to {}", executable.display(), dest.display()))?;
    Ok(())
}

/// Copies the directory holding `executable`, never descending into the
/// install root, which may sit inside the bundle directory.
fn copy_bundle(executable: &Path, dest: &Path, layout: &InstallLayout) -> Result<()> {
    let bundle = executable
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", executable.display()))?;
    if same_path(bundle, dest) {
        return Ok(());
    }
    remove_path(dest)?;
    let install_root = layout.root();
    let build_dir = layout.build_dir();
    copy_tree(bundle, dest, |path| {
        same_path(path, install_root) || same_path(path, &build_dir)
    })?;
    let named = dest.join(ARTIFACT_NAME);
    if !named.is_file() {
        fs::copy(executable, &named)
            .with_context(|| format!("copying {} to {}", executable.display(), named.display()))?;
    }
    Ok(())
}

fn purge(layout: &InstallLayout) {
    let build_dir = layout.build_dir();
    match remove_path(&build_dir) {
        Ok(()) => tracing::debug!(path = %build_dir.display(), "removed build area"),
        Err(err) => {
            let detail = format!("{err:#}");
            tracing::warn!(path = %build_dir.display(), error = %detail, "failed to remove build area");
        }
    }
}
