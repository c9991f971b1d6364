use std::path::PathBuf;

use crate::effects::Effects;
use crate::RunOutput;

pub const XDOTOOL: &str = "xdotool";
pub const WMCTRL: &str = "wmctrl";

/// What happened during one toggle; for logs and tests only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowActionReport {
    pub window: Option<String>,
    pub toggled: bool,
    pub raised: bool,
}

/// Best-effort window manager façade. Failures are logged and swallowed.
pub struct WindowActions<'a> {
    effects: &'a dyn Effects,
}

impl<'a> WindowActions<'a> {
    pub fn new(effects: &'a dyn Effects) -> Self {
        Self { effects }
    }

    /// Toggles "always on top" for the window under the pointer, then raises it.
    pub fn toggle_pointer_window(&self) -> WindowActionReport {
        let mut report = WindowActionReport::default();
        tracing::debug!("looking up window under pointer");
        let Some(window) = self.pointer_window() else {
            tracing::info!("no window under pointer; nothing to toggle");
            return report;
        };
        report.toggled = self
            .invoke(WMCTRL, &["-i", "-r", window.as_str(), "-b", "toggle,above"])
            .is_some();
        report.raised = self.invoke(XDOTOOL, &["windowraise", window.as_str()]).is_some();
        if report.toggled {
            tracing::info!(window = %window, raised = report.raised, "toggled always-on-top");
        }
        report.window = Some(window);
        report
    }

    fn pointer_window(&self) -> Option<String> {
        let output = self.invoke(XDOTOOL, &["getmouselocation", "--shell"])?;
        parse_window_id(&output.stdout)
    }

    fn invoke(&self, tool: &str, args: &[&str]) -> Option<RunOutput> {
        let Some(program) = self.locate(tool) else {
            tracing::warn!(tool, "window tool not found on PATH");
            return None;
        };
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        match self.effects.runner().run(&program, &args, &[], None) {
            Ok(output) if output.success() => Some(output),
            Ok(output) => {
                tracing::warn!(
                    tool,
                    code = output.code,
                    stderr = %output.stderr.trim(),
                    "window tool failed"
                );
                None
            }
            Err(err) => {
                tracing::warn!(tool, error = %format!("{err:#}"), "window tool could not run");
                None
            }
        }
    }

    fn locate(&self, tool: &str) -> Option<PathBuf> {
        self.effects.tools().locate(tool)
    }
}

/// Extracts `WINDOW=<id>` from `xdotool getmouselocation --shell` output.
fn parse_window_id(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("WINDOW="))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::testing::{failed_output, ok_output, FakeEffects};

    const LOCATION: &str = "X=812\nY=411\nSCREEN=0\nWINDOW=65011718\n";

    #[test]
    fn parses_window_from_shell_output() {
        assert_eq!(parse_window_id(LOCATION).as_deref(), Some("65011718"));
        assert_eq!(parse_window_id("X=1\nY=2\n"), None);
        assert_eq!(parse_window_id("WINDOW=\n"), None);
    }

    #[test]
    fn toggles_then_raises_pointer_window() {
        let effects = FakeEffects::with_tools(&[XDOTOOL, WMCTRL]).responding(|call| {
            if call.args.first().map(String::as_str) == Some("getmouselocation") {
                Ok(ok_output(LOCATION))
            } else {
                Ok(ok_output(""))
            }
        });
        let report = WindowActions::new(&effects).toggle_pointer_window();
        assert_eq!(
            report,
            WindowActionReport {
                window: Some("65011718".into()),
                toggled: true,
                raised: true,
            }
        );
        assert_eq!(
            effects.call_lines(),
            [
                "xdotool getmouselocation --shell",
                "wmctrl -i -r 65011718 -b toggle,above",
                "xdotool windowraise 65011718",
            ]
        );
    }

    #[test]
    fn missing_window_is_a_silent_no_op() {
        let effects = FakeEffects::with_tools(&[XDOTOOL, WMCTRL])
            .responding(|_| Ok(ok_output("X=1\nY=2\nSCREEN=0\n")));
        let report = WindowActions::new(&effects).toggle_pointer_window();
        assert_eq!(report, WindowActionReport::default());
        assert_eq!(effects.calls().len(), 1);
    }

    #[test]
    fn failures_are_swallowed() {
        let effects = FakeEffects::with_tools(&[XDOTOOL, WMCTRL]).responding(|call| {
            match (call.tool(), call.args.first().map(String::as_str)) {
                ("xdotool", Some("getmouselocation")) => Ok(ok_output(LOCATION)),
                ("wmctrl", _) => Ok(failed_output(1, "Cannot open display")),
                _ => Err(anyhow::anyhow!("spawn failed")),
            }
        });
        let report = WindowActions::new(&effects).toggle_pointer_window();
        assert_eq!(report.window.as_deref(), Some("65011718"));
        assert!(!report.toggled);
        assert!(!report.raised);
        assert_eq!(effects.calls().len(), 3, "raise is still attempted");
    }

    #[test]
    fn absent_tools_do_nothing() {
        let effects = FakeEffects::with_tools(&[]);
        let report = WindowActions::new(&effects).toggle_pointer_window();
        assert_eq!(report, WindowActionReport::default());
        assert!(effects.calls().is_empty());
    }
}
