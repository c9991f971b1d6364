#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// `{"status":"ok"}` with its length prefix.
pub const ACK: &[u8] = b"\x0f\x00\x00\x00{\"status\":\"ok\"}";

const FAKE_XDOTOOL: &str = r#"#!/bin/sh
echo "xdotool $*" >> "$ONTOP_TEST_CALLS"
if [ "$1" = "getmouselocation" ]; then
    echo "X=640"
    echo "Y=360"
    echo "SCREEN=0"
    echo "WINDOW=4242"
fi
"#;

const FAKE_WMCTRL: &str = r#"#!/bin/sh
echo "wmctrl $*" >> "$ONTOP_TEST_CALLS"
"#;

/// An isolated install directory, log file and `PATH` for one test.
pub struct HostSandbox {
    _temp: TempDir,
    pub install_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub calls_file: PathBuf,
    pub log_file: PathBuf,
}

impl HostSandbox {
    pub fn new() -> Self {
        let sandbox = Self::without_tools();
        write_script(&sandbox.bin_dir.join("xdotool"), FAKE_XDOTOOL);
        write_script(&sandbox.bin_dir.join("wmctrl"), FAKE_WMCTRL);
        sandbox
    }

    pub fn without_tools() -> Self {
        let temp = tempfile::Builder::new()
            .prefix("ontop-cli")
            .tempdir()
            .expect("tempdir");
        let root = temp.path().to_path_buf();
        let bin_dir = root.join("bin");
        fs::create_dir_all(&bin_dir).expect("bin dir");
        Self {
            install_dir: root.join("hosts"),
            calls_file: root.join("calls.log"),
            log_file: root.join("always_on_top.log"),
            bin_dir,
            _temp: temp,
        }
    }

    pub fn command(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("always_on_top");
        cmd.env_clear()
            .env("PATH", &self.bin_dir)
            .env("ONTOP_INSTALL_DIR", &self.install_dir)
            .env("ONTOP_LOG_FILE", &self.log_file)
            .env("ONTOP_TEST_CALLS", &self.calls_file);
        cmd
    }

    /// The test binary stands in for an already packaged host.
    pub fn frozen_command(&self) -> Command {
        let mut cmd = self.command();
        cmd.env("ONTOP_FROZEN", "1");
        cmd
    }

    /// Lays out a single-file install so the host goes straight to serving.
    pub fn mark_installed(&self) {
        fs::create_dir_all(&self.install_dir).expect("install dir");
        fs::write(self.artifact_path(), b"installed host").expect("artifact");
        fs::write(self.manifest_path(), b"{}").expect("manifest");
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.install_dir.join("always_on_top.bin")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.install_dir.join("always_on_top.json")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.install_dir.join("build")
    }

    pub fn manifest(&self) -> Value {
        let contents = fs::read_to_string(self.manifest_path()).expect("manifest contents");
        serde_json::from_str(&contents).expect("manifest json")
    }

    /// Tool invocations recorded by the fake scripts, in order.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.calls_file)
            .map(|contents| contents.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

pub fn frame(payload: &[u8]) -> Vec<u8> {
    let len = u32::try_from(payload.len()).expect("frame length");
    let mut bytes = len.to_le_bytes().to_vec();
    bytes.extend_from_slice(payload);
    bytes
}

#[cfg(unix)]
fn write_script(path: &Path, contents: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, contents).expect("write script");
    let mut perms = fs::metadata(path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod script");
}

#[cfg(not(unix))]
fn write_script(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write script");
}
