//! Command line surface.

use crate::context::Context;
use crate::dispatch::Dispatcher;
use crate::dump::{self, Report};
use crate::error::Error;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_CONFIG: &str = "/etc/ddns-srv.conf";

#[derive(Parser, Debug, Clone)]
#[command(name = "ddns-srv", author, version, about = "Dynamic DNS update server", long_about = None)]
pub struct Cli {
    /// Log at debug level
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP server
    Run,
    /// Print the data of records matching a hostname: `lookup [type] <hostname>`
    Lookup {
        #[arg(num_args = 1..=2, required = true, value_names = ["TYPE", "HOSTNAME"])]
        args: Vec<String>,
    },
    /// Print every record of the named providers (all when none are named)
    Records { names: Vec<String> },
    /// Print the zones of the named providers (all when none are named)
    Zones { names: Vec<String> },
    /// Print the configuration of the named providers (all when none are named)
    Inspect { names: Vec<String> },
    /// Print the version
    Version,
}

impl Command {
    /// Whether the command needs providers built from the configuration.
    #[must_use]
    pub fn needs_providers(&self) -> bool {
        !matches!(self, Command::Version)
    }

    /// Produce the output of a read-only command. `Run` and `Version` produce none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThrottleClosed`] if provider calls couldn't be fanned out. Provider
    /// failures are collected in the [`Report`].
    pub async fn report(&self, dispatcher: &Dispatcher, ctx: &Context) -> Result<Option<Report>, Error> {
        let report = match self {
            Command::Run | Command::Version => return Ok(None),
            Command::Lookup { args } => {
                let (rtype, hostname) = match args.as_slice() {
                    [rtype, hostname] => (rtype.to_ascii_uppercase(), hostname.as_str()),
                    [hostname] => ("A".to_string(), hostname.as_str()),
                    _ => return Ok(None),
                };
                dump::lookup(dispatcher, ctx, &rtype, hostname).await?
            }
            Command::Records { names } => dump::records(dispatcher, ctx, names).await?,
            Command::Zones { names } => dump::zones(dispatcher, ctx, names).await?,
            Command::Inspect { names } => Report {
                out: dump::inspect(dispatcher, names),
                errors: Vec::new(),
            },
        };
        Ok(Some(report))
    }
}
