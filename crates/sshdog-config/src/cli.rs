//! Command-line surface.
//!
//! Without a bundle the binary takes `-d` and `-p <port>`. With a bundle the
//! flags are not parsed at all; only the raw first argument is consulted as a
//! port override (see [`bundled_positional`]).

use std::ffi::OsString;

use clap::Parser;

use crate::defaults::DEFAULT_PORT;

/// Flags accepted when no resource bundle is present.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "sshdog", about = "Portable SSH daemon")]
pub struct UnbundledArgs {
    /// Enable daemon mode.
    #[arg(short = 'd', long = "daemon")]
    pub daemon: bool,
    /// Listen port; values of zero or below defer to the environment.
    #[arg(
        short = 'p',
        long = "port",
        default_value_t = 0,
        allow_negative_numbers = true,
        help = format!("Port, default {DEFAULT_PORT}")
    )]
    pub port: i64,
}

impl UnbundledArgs {
    /// Parses process arguments, program name first.
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args)
    }
}

/// First argument after the program name, as text.
#[must_use]
pub fn bundled_positional(args: &[OsString]) -> Option<String> {
    args.get(1)
        .map(|argument| argument.to_string_lossy().into_owned())
}
