//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "allowgate")]
#[command(author, version, about = "Admin allowlist gatekeeper synced to a Cloudflare rules list")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(
        short,
        long,
        default_value = "/etc/allowgate/config.yaml",
        global = true
    )]
    pub config: PathBuf,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add an IP or CIDR to the allowlist
    Add {
        /// IP address or CIDR block
        ip: String,
        /// Free-text label for the entry
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Remove an IP or CIDR from the allowlist
    Remove {
        /// IP address or CIDR block
        ip: String,
    },

    /// Update the description of an existing entry
    Update {
        /// IP address or CIDR block
        ip: String,
        /// New description
        #[arg(short, long)]
        description: String,
    },

    /// Re-key an entry, keeping its creation time
    Rename {
        /// Current IP or CIDR
        old_ip: String,
        /// New IP or CIDR
        new_ip: String,
        /// Description for the renamed entry
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// List allowlist entries
    List,

    /// Check whether an address would be allowed
    Check {
        /// IP address to check
        ip: String,
    },

    /// Print version
    Version,
}
