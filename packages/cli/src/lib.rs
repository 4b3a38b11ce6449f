//! The `kvfs` command-line tool.
//!
//! Every command takes full URIs (`redis://host:port/key/...`). The
//! filesystem for an endpoint is created the first time a command touches
//! it, with the key prefix from `--prefix` or the config file.

use std::fs::File;
use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kvfs_provider::Registry;

mod commands;
mod config;
mod error;

pub use commands::execute;
pub use config::{default_config_path, load as load_config};
pub use error::CliError;

/// kvfs - files on a key/value store
#[derive(Parser, Debug)]
#[command(name = "kvfs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON config file [default: <config dir>/kvfs/config.json]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Key prefix for every filesystem, overriding the config file
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List the entries under a directory
    Ls {
        uri: String,
        /// Keep entries whose key matches this glob
        #[arg(long, conflicts_with = "regex")]
        glob: Option<String>,
        /// Keep entries whose whole key matches this regex
        #[arg(long)]
        regex: Option<String>,
    },
    /// Print a file
    Cat { uri: String },
    /// Write a file from FILE or stdin
    Put {
        uri: String,
        file: Option<PathBuf>,
        /// Add to the end instead of replacing
        #[arg(long)]
        append: bool,
    },
    /// Delete a file and its attributes
    Rm { uri: String },
    /// Rename a file within one endpoint
    Mv { src: String, dst: String },
    /// Copy a file within one endpoint
    Cp { src: String, dst: String },
    /// Show file attributes
    Stat { uri: String },
    /// Show endpoint capacity
    Df { uri: String },
}

impl Cli {
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

pub fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(prefix) = cli.prefix {
        config.key_prefix = Some(prefix);
    }
    let registry = Registry::redis().with_config(config);

    let mut input: Box<dyn io::Read> = match &cli.command {
        Command::Put {
            file: Some(file), ..
        } => Box::new(File::open(file)?),
        _ => Box::new(io::stdin().lock()),
    };
    let mut out = io::stdout().lock();

    let result = execute(&registry, &cli.command, &mut input, &mut out);
    registry.close_all();
    result
}
