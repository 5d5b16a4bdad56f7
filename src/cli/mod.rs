use crate::{
    environment::{Environment, DEFAULT_CEREMONY_NAME, DEFAULT_SEALING_ENGINE_PATH, DEFAULT_STORE_PATH},
    objects::Identity,
};

use std::path::PathBuf;
use structopt::{clap::AppSettings, StructOpt};
use tracing::Level;

#[derive(StructOpt, Debug)]
pub enum Command {
    /// Run the sealing engine on the last completed participant.
    Seal {
        /// Read the ceremony state snapshot (JSON) at the given path.
        #[structopt(long, parse(from_os_str))]
        state: PathBuf,
    },
    /// Promote every unverified transcript of a participant to verified.
    Promote { identity: Identity },
    /// Print the transcripts of a participant as JSON.
    List {
        identity: Identity,
        /// List the unverified area instead of the verified one.
        #[structopt(long)]
        unverified: bool,
        /// Include signature files.
        #[structopt(long)]
        signatures: bool,
    },
    /// Erase the transcripts of a participant.
    Erase {
        identity: Identity,
        /// Erase only the unverified area.
        #[structopt(long)]
        unverified: bool,
        /// Erase only the unverified transcript with this sequence number.
        #[structopt(long, requires = "unverified")]
        num: Option<u64>,
    },
    /// Move the initial parameters of the ceremony into the store.
    InitParams {
        #[structopt(parse(from_os_str))]
        path: PathBuf,
    },
}

#[derive(StructOpt, Debug)]
#[structopt(
    name = "Setup Coordinator",
    author = "The Aleo Team <hello@aleo.org>",
    setting(AppSettings::ColoredHelp),
    setting(AppSettings::DisableHelpSubcommand),
    setting(AppSettings::SubcommandRequiredElseHelp)
)]
pub struct Options {
    /// The directory every transcript store is rooted under.
    #[structopt(long, env = "STORE_PATH", default_value = DEFAULT_STORE_PATH, parse(from_os_str))]
    pub store_path: PathBuf,

    /// The sealing engine executable.
    #[structopt(long, env = "SEAL_PATH", default_value = DEFAULT_SEALING_ENGINE_PATH, parse(from_os_str))]
    pub seal_path: PathBuf,

    /// The ceremony whose transcripts are operated on.
    #[structopt(long, env = "CEREMONY_NAME", default_value = DEFAULT_CEREMONY_NAME)]
    pub ceremony_name: String,

    /// The maximum level of log events (error, warn, info, debug, trace).
    #[structopt(long, env = "VERBOSITY", default_value = "info")]
    pub verbosity: Level,

    #[structopt(subcommand)]
    pub subcommand: Command,
}

impl Options {
    /// Returns the environment described by these options.
    pub fn environment(&self) -> Environment {
        Environment::new(&self.store_path, &self.seal_path)
            .with_ceremony_name(self.ceremony_name.clone())
            .with_verbosity(self.verbosity)
    }
}
