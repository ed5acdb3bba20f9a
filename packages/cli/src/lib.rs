//! # unsfs-cli
//!
//! The `unsfs` command: inspect, write and resolve Unified Namespace
//! bindings, and bootstrap a filesystem against a local storage root.
//!
//! ## Usage
//!
//! ```bash
//! # Encode and decode attribute text
//! unsfs encode group=daos_server pool=456 cont=789
//! unsfs decode 'group=a\:b\=1:pool=123'
//!
//! # Bind a directory to a container, then read it back
//! unsfs bind /mnt/data pool=456 cont=789 layout=POSIX
//! unsfs inspect /mnt/data --record
//!
//! # Resolve connection parameters
//! unsfs resolve daos://uns/mnt/data -D read_buffer_size=16
//! unsfs resolve daos://10.0.0.1:10001/ -D pool=123 -D cont=56
//!
//! # Bootstrap against a local directory standing in for the cluster
//! unsfs init daos://uns/mnt/data --root /var/tmp/unsfs --create
//! ```

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{run, CliError};

/// unsfs - Unified Namespace resolver
#[derive(Parser, Debug)]
#[command(name = "unsfs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON file with resolver settings; unset fields keep their defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode KEY=VALUE pairs into attribute text
    Encode {
        #[arg(required = true)]
        pairs: Vec<String>,
    },

    /// Decode attribute text into KEY=VALUE lines
    Decode {
        text: String,

        /// Print the entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Store KEY=VALUE pairs as the namespace attribute of PATH
    Bind {
        path: PathBuf,

        #[arg(required = true)]
        pairs: Vec<String>,
    },

    /// Read the namespace attribute of PATH
    Inspect {
        path: PathBuf,

        /// Validate the entries as an attribute record
        #[arg(long)]
        record: bool,
    },

    /// Resolve a filesystem URI into connection parameters
    Resolve {
        uri: String,

        /// Explicit configuration entry, repeatable
        #[arg(short = 'D', value_name = "KEY=VALUE")]
        define: Vec<String>,
    },

    /// Resolve a URI and bootstrap a filesystem under a local storage root
    Init {
        uri: String,

        #[arg(short = 'D', value_name = "KEY=VALUE")]
        define: Vec<String>,

        /// Directory standing in for the storage cluster
        #[arg(long)]
        root: PathBuf,

        /// Create missing pool and container directories
        #[arg(long)]
        create: bool,

        /// User for the default working directory (defaults to $USER)
        #[arg(long)]
        user: Option<String>,

        /// Absolute working directory instead of /user/<user>
        #[arg(long)]
        working_dir: Option<String>,
    },
}
