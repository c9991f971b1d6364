use clap::{ArgAction, Parser, ValueEnum};
use ontop_core::InvocationFlags;
use ontop_domain::PackagingMode;

pub const HOST_BEFORE_HELP: &str = concat!(
    "always_on_top ",
    env!("CARGO_PKG_VERSION"),
    " – native messaging host that toggles always-on-top for the window under the pointer\n\n",
    "Run it once from a terminal to install it for the browser. Afterwards the browser\n",
    "launches it on demand; launched from a terminal it toggles the window directly.\n",
);

#[derive(Parser, Debug)]
#[command(name = "always_on_top", version, before_help = HOST_BEFORE_HELP)]
#[allow(clippy::struct_excessive_bools)]
pub struct HostCli {
    #[arg(long, help = "Rebuild and reinstall even when the host is already installed")]
    pub force: bool,
    #[arg(
        long = "keep-build",
        visible_alias = "keepbuild",
        help = "Keep the build area after installing"
    )]
    pub keep_build: bool,
    #[arg(
        long,
        value_enum,
        default_value_t = PackagingArg::SingleFile,
        help = "How the installed host is packaged; bundle is less hardened than single-file"
    )]
    pub packaging: PackagingArg,
    #[arg(
        long,
        conflicts_with = "packaging",
        help = "Shorthand for --packaging bundle"
    )]
    pub standalone: bool,
    #[arg(short, long, help = "Only log warnings and errors")]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)")]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q")]
    pub trace: bool,
    /// Arguments the browser appends (manifest path, extension id); ignored.
    #[arg(hide = true, num_args = 0.., allow_hyphen_values = true)]
    pub caller: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PackagingArg {
    /// One self-contained executable
    SingleFile,
    /// A directory with the executable and the Rust runtime libraries (less hardened)
    Bundle,
}

impl From<PackagingArg> for PackagingMode {
    fn from(arg: PackagingArg) -> Self {
        match arg {
            PackagingArg::SingleFile => PackagingMode::SingleFile,
            PackagingArg::Bundle => PackagingMode::Bundle,
        }
    }
}

impl HostCli {
    pub fn flags(&self) -> InvocationFlags {
        InvocationFlags {
            force: self.force,
            keep_build: self.keep_build,
            packaging: if self.standalone {
                PackagingMode::Bundle
            } else {
                self.packaging.into()
            },
        }
    }

    pub fn log_level(&self) -> &'static str {
        if self.trace {
            "trace"
        } else if self.quiet {
            "warn"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}
