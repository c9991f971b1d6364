use std::env;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use ontop_core::{DispatchOutcome, HostConfig, ProcessContext, SystemEffects};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

use cli::HostCli;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = HostCli::parse();
    let config = HostConfig::from_env().map_err(|err| eyre!("{err:?}"))?;
    init_tracing(cli.log_level(), config.log_file());

    let args: Vec<OsString> = env::args_os().skip(1).collect();
    tracing::info!(
        log_file = %config.log_file().display(),
        args = ?args,
        "always_on_top starting"
    );

    let ctx = ProcessContext::capture(args, cli.flags(), config.frozen())
        .map_err(|err| eyre!("{err:?}"))?;
    let effects = SystemEffects::new(&config);
    let outcome = ontop_core::execute(
        &ctx,
        &config,
        &effects,
        &mut io::stdin().lock(),
        &mut io::stdout().lock(),
    )
    .map_err(|err| {
        tracing::error!(code = err.code(), "{err}");
        color_eyre::Report::new(err)
    })?;

    match outcome {
        DispatchOutcome::Handoff(handoff) => {
            let never = handoff.exec().map_err(|err| eyre!("{err:?}"))?;
            match never {}
        }
        DispatchOutcome::Served(report) => {
            tracing::debug!(?report, "request served");
        }
        DispatchOutcome::Acted(report) => {
            tracing::debug!(?report, "toggled from the terminal");
        }
    }
    Ok(())
}

/// Logs go to stderr and the log file; stdout is reserved for protocol frames.
fn init_tracing(level: &str, log_file: &Path) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("always_on_top={level},ontop_core={level}")));
    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true);
    let (file_layer, file_error) = match open_log_file(log_file) {
        Ok(file) => (
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            ),
            None,
        ),
        Err(err) => (None, Some(err)),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    if let Some(err) = file_error {
        tracing::warn!(
            path = %log_file.display(),
            error = %err,
            "log file unavailable; logging to stderr only"
        );
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
