#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod layout;
pub mod manifest;
pub mod message;
pub mod state;

pub use layout::{InstallLayout, PackagingMode, ARTIFACT_NAME};
pub use manifest::{
    HostManifest, ALLOWED_EXTENSION, HOST_DESCRIPTION, HOST_NAME, TRANSPORT_STDIO,
};
pub use message::{acknowledgement, NativeMessage};
pub use state::{InstallState, InstallStateReport};
