#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

mod bootstrap;
mod build;
mod codec;
mod config;
mod context;
mod deps;
mod dispatch;
mod effects;
mod errors;
mod fs;
mod handoff;
mod install;
mod process;
mod window;

pub use bootstrap::{forwarded_args, needs_bootstrap, run_bootstrap};
pub use build::{BuildArtifact, BuildPipeline, PACKAGING_ENV};
pub use codec::{
    decode_frame, encode_frame, read_message, write_message, FramingError, MAX_OUTGOING_FRAME,
};
pub use config::{EnvSnapshot, HostConfig};
pub use context::{BuildMarker, InvocationFlags, ProcessContext};
pub use deps::{check_dependencies, required_tools};
pub use dispatch::{execute, plan, serve_one, DispatchOutcome, Invocation};
pub use effects::{CommandRunner, Effects, SystemEffects, ToolLocator};
pub use errors::HostError;
pub use handoff::Handoff;
pub use install::Installer;
pub use process::{run_command, RunOutput};
pub use window::{WindowActionReport, WindowActions, WMCTRL, XDOTOOL};
