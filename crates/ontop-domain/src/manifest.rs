use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub const HOST_NAME: &str = "always_on_top";
pub const HOST_DESCRIPTION: &str = "Always on Top";
pub const TRANSPORT_STDIO: &str = "stdio";
pub const ALLOWED_EXTENSION: &str = "{E6C93316-271E-4b3d-8D7E-FE11B4350AEB}";

/// Native messaging host descriptor read by the browser.
///
/// Field order matches the on-disk layout browsers document, and the file
/// is rewritten whole on every install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostManifest {
    pub name: String,
    pub description: String,
    pub path: String,
    #[serde(rename = "type")]
    pub transport: String,
    pub allowed_extensions: Vec<String>,
}

impl HostManifest {
    /// Describes the host installed at `executable`.
    ///
    /// # Errors
    /// Returns an error when the path is relative or not valid UTF-8, since
    /// browsers only accept absolute UTF-8 paths in the manifest.
    pub fn for_executable(executable: &Path) -> Result<Self> {
        if !executable.is_absolute() {
            return Err(anyhow!(
                "manifest path must be absolute: {}",
                executable.display()
            ));
        }
        let path = executable
            .to_str()
            .ok_or_else(|| anyhow!("manifest path is not valid UTF-8: {}", executable.display()))?;
        Ok(Self {
            name: HOST_NAME.to_string(),
            description: HOST_DESCRIPTION.to_string(),
            path: path.to_string(),
            transport: TRANSPORT_STDIO.to_string(),
            allowed_extensions: vec![ALLOWED_EXTENSION.to_string()],
        })
    }

    /// Renders the manifest as four-space indented JSON.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)
            .context("serializing host manifest")?;
        buffer.push(b'\n');
        Ok(buffer)
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing manifest {}", path.display()))
    }
}
