//! CLI module for ares-research
//!
//! Provides command-line interface parsing for the ares-research binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod ask;
pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ares-research - multi-question research server
///
/// Splits a request into sub-questions, researches each one concurrently
/// and streams back one synthesized answer.
#[derive(Parser, Debug)]
#[command(
    name = "ares-research",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "ares-research - fan-out/fan-in multi-question research server",
    long_about = "Splits a request into independent sub-questions, researches each one\n\
                  concurrently (knowledge base, optional web search, answer) and streams\n\
                  one synthesized reply.\n\n\
                  Run without arguments to start the server, or use 'init' to scaffold a config.",
    after_help = "EXAMPLES:\n    \
                  ares-research init                    # Write a starter ares.toml\n    \
                  ares-research                         # Start the server (requires ares.toml)\n    \
                  ares-research ask \"What is 2+2?\"      # Run one request in the terminal\n    \
                  ares-research --config my.toml serve  # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "ares.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Run a single research request and print the streamed answer
    Ask {
        /// The question to research
        query: String,

        /// Print raw protocol frames instead of formatted output
        #[arg(long)]
        raw: bool,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },

    /// Write a starter ares.toml and knowledge directory
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "3000")]
        port: u16,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
