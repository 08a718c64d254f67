use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "duet")]
#[command(about = "Drive the Duet conversation sync engine from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional JSON configuration file (defaults to DUET_* environment variables)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the canonical conversation id of two participants
    ConversationId {
        /// First participant id
        a: String,
        /// Second participant id
        b: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay a scripted two-participant session against an in-memory store
    Demo {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Number of messages to exchange
        #[arg(short, long, default_value = "4")]
        messages: usize,
    },
}
