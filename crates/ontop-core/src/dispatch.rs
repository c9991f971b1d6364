use std::io::{Read, Write};

use ontop_domain::{acknowledgement, InstallLayout};

use crate::bootstrap::{needs_bootstrap, run_bootstrap};
use crate::codec::{read_message, write_message};
use crate::effects::Effects;
use crate::window::{WindowActionReport, WindowActions};
use crate::{Handoff, HostConfig, HostError, ProcessContext};

/// What this process is going to do, decided once from its context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invocation {
    Bootstrap,
    Serve,
    Interactive,
}

impl Invocation {
    pub fn as_str(self) -> &'static str {
        match self {
            Invocation::Bootstrap => "bootstrap",
            Invocation::Serve => "serve",
            Invocation::Interactive => "interactive",
        }
    }
}

#[derive(Debug)]
pub enum DispatchOutcome {
    /// Bootstrap finished; the caller must execute the handoff.
    Handoff(Handoff),
    /// One request served and acknowledged.
    Served(WindowActionReport),
    Acted(WindowActionReport),
}

pub fn plan(ctx: &ProcessContext, layout: &InstallLayout) -> Invocation {
    if needs_bootstrap(ctx, layout) {
        Invocation::Bootstrap
    } else if ctx.stdin_is_terminal {
        Invocation::Interactive
    } else {
        Invocation::Serve
    }
}

pub fn execute<R: Read, W: Write>(
    ctx: &ProcessContext,
    config: &HostConfig,
    effects: &dyn Effects,
    input: &mut R,
    output: &mut W,
) -> Result<DispatchOutcome, HostError> {
    let invocation = plan(ctx, config.layout());
    tracing::debug!(invocation = invocation.as_str(), "dispatching");
    match invocation {
        Invocation::Bootstrap => run_bootstrap(ctx, config, effects).map(DispatchOutcome::Handoff),
        Invocation::Serve => serve_one(effects, input, output).map(DispatchOutcome::Served),
        Invocation::Interactive => Ok(DispatchOutcome::Acted(
            WindowActions::new(effects).toggle_pointer_window(),
        )),
    }
}

/// Reads one request, acts once and acknowledges it.
///
/// The request payload is not inspected. Input that is already closed
/// (a hotkey launch with stdin on `/dev/null`) still toggles and acknowledges.
pub fn serve_one<R: Read, W: Write>(
    effects: &dyn Effects,
    input: &mut R,
    output: &mut W,
) -> Result<WindowActionReport, HostError> {
    match read_message(input)? {
        Some(message) => tracing::debug!(request = %message, "received request"),
        None => tracing::info!("input closed before a request arrived; acting anyway"),
    }
    let report = WindowActions::new(effects).toggle_pointer_window();
    write_message(output, &acknowledgement())?;
    Ok(report)
}
