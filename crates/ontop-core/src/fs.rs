use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Directory names never staged into a build area.
pub(crate) const STAGING_SKIP: [&str; 2] = ["target", ".git"];

/// Recursively copies `from` into `to`, skipping any entry for which `skip` is true.
pub(crate) fn copy_tree(from: &Path, to: &Path, skip: impl Fn(&Path) -> bool) -> Result<()> {
    let walker = WalkDir::new(from)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !skip(entry.path()));
    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", from.display()))?;
        let path = entry.path();
        let relative = path.strip_prefix(from).unwrap_or(path);
        let dest = to.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&dest)
                .with_context(|| format!("creating {}", dest.display()))?;
        } else if file_type.is_file() {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::copy(path, &dest)
                .with_context(|| format!("copying {} to {}", path.display(), dest.display()))?;
        } else if file_type.is_symlink() {
            copy_symlink(path, &dest)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(path: &Path, dest: &Path) -> Result<()> {
    let target =
        fs::read_link(path).with_context(|| format!("reading link {}", path.display()))?;
    let _ = remove_path(dest);
    std::os::unix::fs::symlink(&target, dest)
        .with_context(|| format!("linking {} -> {}", dest.display(), target.display()))
}

#[cfg(not(unix))]
fn copy_symlink(path: &Path, dest: &Path) -> Result<()> {
    fs::copy(path, dest)
        .map(|_| ())
        .with_context(|| format!("copying {} to {}", path.display(), dest.display()))
}

/// Removes a file, symlink or directory tree; a missing path is not an error.
pub(crate) fn remove_path(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err).with_context(|| format!("failed to stat {}", path.display())),
    };
    if meta.is_dir() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove dir {}", path.display()))?;
    } else {
        fs::remove_file(path)
            .with_context(|| format!("failed to remove file {}", path.display()))?;
    }
    Ok(())
}

/// True when both paths resolve to the same filesystem entry.
pub(crate) fn same_path(left: &Path, right: &Path) -> bool {
    match (fs::canonicalize(left), fs::canonicalize(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

#[cfg(unix)]
pub(crate) fn ensure_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let meta = fs::metadata(path).with_context(|| format!("metadata for {}", path.display()))?;
    let mut perms = meta.permissions();
    if perms.mode() & 0o111 != 0o111 {
        perms.set_mode(perms.mode() | 0o755);
        fs::set_permissions(path, perms)
            .with_context(|| format!("marking {} executable", path.display()))?;
    }
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn ensure_executable(path: &Path) -> Result<()> {
    fs::metadata(path)
        .map(|_| ())
        .with_context(|| format!("metadata for {}", path.display()))
}

/// Gives a freshly staged file the usual `rw-r--r--` mode; temp files start private.
#[cfg(unix)]
pub(crate) fn make_world_readable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
        .with_context(|| format!("setting permissions on {}", path.display()))
}

#[cfg(not(unix))]
pub(crate) fn make_world_readable(_path: &Path) -> Result<()> {
    Ok(())
}
