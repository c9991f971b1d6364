use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use ontop_domain::{InstallLayout, HOST_NAME};

const DEFAULT_TOOLCHAIN: &str = "stable";

#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self {
            vars: env::vars_os()
                .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
                .collect(),
        }
    }

    pub(crate) fn flag_is_enabled(&self, key: &str) -> bool {
        matches!(self.var(key), Some("1" | "true" | "yes"))
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// Process-wide settings, resolved once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct HostConfig {
    layout: InstallLayout,
    log_file: PathBuf,
    toolchain: String,
    frozen: bool,
    search_path: Option<OsString>,
    source_root: PathBuf,
}

impl HostConfig {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error if no install directory is configured and the home
    /// directory cannot be determined.
    pub fn from_env() -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self> {
        let install_dir = match snapshot.var("ONTOP_INSTALL_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_install_dir()?,
        };
        let install_dir = std::path::absolute(&install_dir)
            .with_context(|| format!("resolving install directory {}", install_dir.display()))?;
        let log_file = snapshot
            .var("ONTOP_LOG_FILE")
            .map_or_else(default_log_file, PathBuf::from);
        let source_root = snapshot
            .var("ONTOP_SOURCE_DIR")
            .map_or_else(compiled_source_root, PathBuf::from);
        Ok(Self {
            layout: InstallLayout::new(install_dir),
            log_file,
            toolchain: snapshot
                .var("ONTOP_TOOLCHAIN")
                .unwrap_or(DEFAULT_TOOLCHAIN)
                .to_string(),
            frozen: snapshot.flag_is_enabled("ONTOP_FROZEN"),
            search_path: snapshot.var("PATH").map(OsString::from),
            source_root,
        })
    }

    #[must_use]
    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    #[must_use]
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    #[must_use]
    pub fn toolchain(&self) -> &str {
        &self.toolchain
    }

    /// Whether the running executable should be treated as an already packaged host.
    #[must_use]
    pub fn frozen(&self) -> bool {
        self.frozen
    }

    #[must_use]
    pub fn search_path(&self) -> Option<&OsString> {
        self.search_path.as_ref()
    }

    /// Workspace root the build pipeline stages and compiles.
    #[must_use]
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }
}

fn default_install_dir() -> Result<PathBuf> {
    dirs_next::home_dir()
        .map(|home| home.join(".mozilla").join("native-messaging-hosts"))
        .ok_or_else(|| anyhow!("unable to determine the home directory; set ONTOP_INSTALL_DIR"))
}

fn default_log_file() -> PathBuf {
    env::temp_dir().join(format!("{HOST_NAME}.log"))
}

fn compiled_source_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .unwrap_or(manifest_dir)
        .to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_come_from_the_environment() {
        let snapshot = EnvSnapshot::testing(&[
            ("ONTOP_INSTALL_DIR", "/srv/hosts"),
            ("ONTOP_LOG_FILE", "/srv/log/host.log"),
            ("ONTOP_TOOLCHAIN", "1.89.0"),
            ("ONTOP_FROZEN", "1"),
            ("ONTOP_SOURCE_DIR", "/srv/src"),
            ("PATH", "/srv/bin"),
        ]);
        let config = HostConfig::from_snapshot(&snapshot).expect("config");
        assert_eq!(config.layout().root(), Path::new("/srv/hosts"));
        assert_eq!(config.log_file(), Path::new("/srv/log/host.log"));
        assert_eq!(config.toolchain(), "1.89.0");
        assert!(config.frozen());
        assert_eq!(config.source_root(), Path::new("/srv/src"));
        assert_eq!(config.search_path(), Some(&OsString::from("/srv/bin")));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let snapshot = EnvSnapshot::testing(&[("ONTOP_INSTALL_DIR", "/srv/hosts"), ("ONTOP_FROZEN", "")]);
        let config = HostConfig::from_snapshot(&snapshot).expect("config");
        assert_eq!(config.toolchain(), DEFAULT_TOOLCHAIN);
        assert!(!config.frozen());
        assert!(config.log_file().ends_with("always_on_top.log"));
        assert!(config.source_root().join("crates").join("ontop-core").is_dir());
        assert!(config.search_path().is_none());
    }

    #[test]
    fn relative_install_dir_is_made_absolute() {
        let snapshot = EnvSnapshot::testing(&[("ONTOP_INSTALL_DIR", "hosts")]);
        let config = HostConfig::from_snapshot(&snapshot).expect("config");
        assert!(config.layout().root().is_absolute());
        assert!(config.layout().root().ends_with("hosts"));
    }
}
