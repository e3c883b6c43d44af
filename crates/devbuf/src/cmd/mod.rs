use clap::{Args, Subcommand};
use std::path::PathBuf;

use devbuf_registry::{RegistryConfig, DEFAULT_CAPACITY, MAX_MINORS};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod info;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute an operation script against a fresh registry.
    Run(RunArgs),
    /// Print registry configuration and control command numbers.
    Info(InfoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Clone, Copy)]
pub struct RegistryArgs {
    /// Per-minor buffer capacity in bytes.
    #[arg(long, env = "DEVBUF_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,
    /// Number of minor ids (1-256).
    #[arg(long, env = "DEVBUF_MINORS", default_value_t = MAX_MINORS)]
    pub minors: u32,
}

impl RegistryArgs {
    pub fn config(self) -> RegistryConfig {
        RegistryConfig {
            capacity: self.capacity,
            max_minors: self.minors,
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Script file to execute. Reads stdin when omitted or "-".
    pub script: Option<PathBuf>,
    #[command(flatten)]
    pub registry: RegistryArgs,
    /// Continue past failed operations instead of stopping at the first one.
    #[arg(long)]
    pub keep_going: bool,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub registry: RegistryArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
