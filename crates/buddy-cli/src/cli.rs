use clap::{Parser, Subcommand};

use crate::commands::{Fees, Members};

#[derive(Parser, Debug)]
#[clap(name = "buddy", version=env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[clap(long, env = "BUDDY_DB", default_value = "members.sqlite3")]
    pub members_db: String,

    /// Give up on a database call after this many milliseconds
    #[clap(long, env = "BUDDY_TIMEOUT_MS", default_value_t = 1000)]
    pub timeout_ms: u64,

    /// Log filter, used when RUST_LOG is not set
    #[clap(long, env = "BUDDY_LOG", default_value = "warn")]
    pub log_level: String,

    #[clap(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn init() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the member roster
    #[clap(subcommand)]
    Members(Members),

    /// Manage semester dues
    #[clap(subcommand)]
    Fees(Fees),
}
