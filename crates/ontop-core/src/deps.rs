use crate::build::{CARGO, RUSTUP};
use crate::effects::ToolLocator;
use crate::window::{WMCTRL, XDOTOOL};
use crate::{HostError, ProcessContext};

/// Tools this run needs; the build toolchain only matters when compiling.
pub fn required_tools(ctx: &ProcessContext) -> Vec<&'static str> {
    let mut tools = vec![XDOTOOL, WMCTRL];
    if !ctx.marker.packaged_as(ctx.packaging) {
        tools.extend([CARGO, RUSTUP]);
    }
    tools
}

/// Fails with every missing tool named, so one run reports them all.
///
/// # Errors
/// Returns [`HostError::DependencyMissing`] when any tool cannot be found.
pub fn check_dependencies(tools: &[&str], locator: &dyn ToolLocator) -> Result<(), HostError> {
    let missing: Vec<String> = tools
        .iter()
        .filter(|tool| {
            let found = locator.locate(tool);
            tracing::debug!(tool = **tool, found = ?found, "checked dependency");
            found.is_none()
        })
        .map(|tool| (*tool).to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(HostError::DependencyMissing { tools: missing })
    }
}
