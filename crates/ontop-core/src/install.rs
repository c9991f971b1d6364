use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use ontop_domain::{HostManifest, InstallLayout, PackagingMode, ARTIFACT_NAME};
use tempfile::NamedTempFile;

use crate::build::BuildArtifact;
use crate::fs::{copy_tree, ensure_executable, make_world_readable, remove_path};
use crate::HostError;

const STAGE_PREFIX: &str = ".always_on_top.stage";

/// Places build outputs at their canonical location and registers the host.
pub struct Installer<'a> {
    layout: &'a InstallLayout,
}

impl<'a> Installer<'a> {
    pub fn new(layout: &'a InstallLayout) -> Self {
        Self { layout }
    }

    /// Replaces the canonical artifact with `artifact` and returns the path
    /// of the executable that now lives there.
    ///
    /// Whatever occupied the canonical path before (a file or a directory)
    /// is removed; the new content is staged next to it and renamed in.
    pub fn install_artifact(&self, artifact: &BuildArtifact) -> Result<PathBuf, HostError> {
        let target = self.layout.artifact_path();
        let installed = match artifact.mode {
            PackagingMode::SingleFile => self.install_file(&artifact.location, &target),
            PackagingMode::Bundle => self.install_dir(&artifact.location, &target),
        };
        installed.map_err(|err| HostError::install(&target, &err))?;

        let executable = self.layout.executable_path(artifact.mode);
        tracing::info!(
            mode = %artifact.mode,
            path = %executable.display(),
            "installed host artifact"
        );
        Ok(executable)
    }

    /// Writes the host manifest for the executable installed in `mode`.
    ///
    /// Refuses to register a host whose executable is not on disk.
    pub fn write_manifest(&self, mode: PackagingMode) -> Result<HostManifest, HostError> {
        let manifest_path = self.layout.manifest_path();
        let executable = self.layout.executable_path(mode);
        if !executable.is_file() {
            return Err(HostError::install(
                &manifest_path,
                &anyhow!("host executable {} is missing", executable.display()),
            ));
        }
        let manifest = HostManifest::for_executable(&executable)
            .and_then(|manifest| {
                let rendered = manifest.to_pretty_json()?;
                self.write_atomically(&manifest_path, &rendered)?;
                Ok(manifest)
            })
            .map_err(|err| HostError::install(&manifest_path, &err))?;
        tracing::info!(path = %manifest_path.display(), "wrote host manifest");
        Ok(manifest)
    }

    fn install_file(&self, source: &Path, target: &Path) -> Result<()> {
        let root = self.prepare_root()?;
        let mut staged = NamedTempFile::with_prefix_in(STAGE_PREFIX, root)
            .with_context(|| format!("creating staging file under {}", root.display()))?;
        let mut reader = fs::File::open(source)
            .with_context(|| format!("opening build artifact {}", source.display()))?;
        std::io::copy(&mut reader, staged.as_file_mut())
            .with_context(|| format!("staging {}", source.display()))?;
        staged.as_file().sync_all().ok();
        ensure_executable(staged.path())?;

        if target.is_dir() {
            remove_path(target)?;
        }
        staged
            .persist(target)
            .map_err(|err| err.error)
            .with_context(|| format!("moving staged artifact to {}", target.display()))?;
        Ok(())
    }

    fn install_dir(&self, source: &Path, target: &Path) -> Result<()> {
        let root = self.prepare_root()?;
        let stage = tempfile::Builder::new()
            .prefix(STAGE_PREFIX)
            .tempdir_in(root)
            .with_context(|| format!("creating staging directory under {}", root.display()))?;
        copy_tree(source, stage.path(), |_| false)?;
        ensure_executable(&stage.path().join(ARTIFACT_NAME))?;

        remove_path(target)?;
        let staged = stage.keep();
        if let Err(err) = fs::rename(&staged, target) {
            let _ = remove_path(&staged);
            return Err(err)
                .with_context(|| format!("moving staged bundle to {}", target.display()));
        }
        Ok(())
    }

    fn write_atomically(&self, dest: &Path, contents: &[u8]) -> Result<()> {
        let root = self.prepare_root()?;
        let mut staged = NamedTempFile::with_prefix_in(STAGE_PREFIX, root)
            .with_context(|| format!("creating staging file under {}", root.display()))?;
        staged
            .write_all(contents)
            .with_context(|| format!("writing {}", staged.path().display()))?;
        make_world_readable(staged.path())?;
        staged
            .persist(dest)
            .map_err(|err| err.error)
            .with_context(|| format!("replacing {}", dest.display()))?;
        Ok(())
    }

    fn prepare_root(&self) -> Result<&Path> {
        let root = self.layout.root();
        fs::create_dir_all(root).with_context(|| format!("creating {}", root.display()))?;
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontop_domain::{ALLOWED_EXTENSION, HOST_NAME};

    fn single_file_artifact(layout: &InstallLayout, contents: &[u8]) -> BuildArtifact {
        let location = layout.build_artifact_path(PackagingMode::SingleFile);
        fs::create_dir_all(location.parent().expect("parent")).expect("build dir");
        fs::write(&location, contents).expect("artifact");
        BuildArtifact {
            mode: PackagingMode::SingleFile,
            location,
        }
    }

    fn bundle_artifact(layout: &InstallLayout) -> BuildArtifact {
        let location = layout.build_artifact_path(PackagingMode::Bundle);
        fs::create_dir_all(&location).expect("bundle dir");
        fs::write(location.join(ARTIFACT_NAME), b"bundled host").expect("executable");
        fs::write(location.join("libstd-abc.so"), b"std").expect("runtime lib");
        BuildArtifact {
            mode: PackagingMode::Bundle,
            location,
        }
    }

    #[test]
    fn single_file_replaces_previous_bundle() {
        let temp = tempfile::tempdir().expect("tempdir");
        let layout = InstallLayout::new(temp.path().join("hosts"));
        let installer = Installer::new(&layout);

        let bundle = bundle_artifact(&layout);
        installer.install_artifact(&bundle).expect("bundle install");
        assert!(layout.artifact_path().is_dir());

        let single = single_file_artifact(&layout, b"single host");
        let executable = installer.install_artifact(&single).expect("single install");
        assert_eq!(executable, layout.artifact_path());
        assert!(executable.is_file());
        assert_eq!(fs::read(&executable).expect("read"), b"single host");
    }

    #[test]
    fn bundle_replaces_previous_single_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let layout = InstallLayout::new(temp.path().join("hosts"));
        let installer = Installer::new(&layout);

        let single = single_file_artifact(&layout, b"single host");
        installer.install_artifact(&single).expect("single install");

        let bundle = bundle_artifact(&layout);
        let executable = installer.install_artifact(&bundle).expect("bundle install");
        assert_eq!(executable, layout.executable_path(PackagingMode::Bundle));
        assert_eq!(fs::read(&executable).expect("read"), b"bundled host");
        assert!(layout.artifact_path().join("libstd-abc.so").is_file());

        let leftovers: Vec<_> = fs::read_dir(layout.root())
            .expect("root")
            .flatten()
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(STAGE_PREFIX))
            .collect();
        assert!(leftovers.is_empty(), "staging entries left behind");
    }

    #[cfg(unix)]
    #[test]
    fn installed_executable_is_marked_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let layout = InstallLayout::new(temp.path().join("hosts"));
        let single = single_file_artifact(&layout, b"host");
        let executable = Installer::new(&layout)
            .install_artifact(&single)
            .expect("install");
        let mode = fs::metadata(executable).expect("meta").permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn manifest_points_at_installed_executable() {
        let temp = tempfile::tempdir().expect("tempdir");
        let layout = InstallLayout::new(temp.path().join("hosts"));
        let installer = Installer::new(&layout);
        installer
            .install_artifact(&bundle_artifact(&layout))
            .expect("install");

        let written = installer
            .write_manifest(PackagingMode::Bundle)
            .expect("manifest");
        let on_disk = HostManifest::read_from(&layout.manifest_path()).expect("read back");
        assert_eq!(written, on_disk);
        assert_eq!(on_disk.name, HOST_NAME);
        assert_eq!(on_disk.allowed_extensions, vec![ALLOWED_EXTENSION.to_string()]);
        assert_eq!(
            PathBuf::from(&on_disk.path),
            layout.executable_path(PackagingMode::Bundle)
        );
    }

    #[cfg(unix)]
    #[test]
    fn manifest_is_readable_by_everyone() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let layout = InstallLayout::new(temp.path().join("hosts"));
        let installer = Installer::new(&layout);
        installer
            .install_artifact(&single_file_artifact(&layout, b"host"))
            .expect("install");
        installer.write_manifest(PackagingMode::SingleFile).expect("manifest");

        let mode = fs::metadata(layout.manifest_path())
            .expect("meta")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn manifest_is_refused_without_executable() {
        let temp = tempfile::tempdir().expect("tempdir");
        let layout = InstallLayout::new(temp.path().join("hosts"));
        let err = Installer::new(&layout)
            .write_manifest(PackagingMode::SingleFile)
            .expect_err("no executable");
        assert!(matches!(err, HostError::InstallWrite { .. }));
        assert!(!layout.manifest_path().exists());
    }

    #[test]
    fn rewriting_manifest_is_byte_identical() {
        let temp = tempfile::tempdir().expect("tempdir");
        let layout = InstallLayout::new(temp.path().join("hosts"));
        let installer = Installer::new(&layout);
        installer
            .install_artifact(&single_file_artifact(&layout, b"host"))
            .expect("install");

        installer.write_manifest(PackagingMode::SingleFile).expect("first");
        let first = fs::read(layout.manifest_path()).expect("first read");
        installer.write_manifest(PackagingMode::SingleFile).expect("second");
        let second = fs::read(layout.manifest_path()).expect("second read");
        assert_eq!(first, second);
        assert!(String::from_utf8(first).expect("utf8").contains("\n    \"name\""));
    }
}
