//! CLI module for deepdive
//!
//! Provides command-line interface parsing and handling for the deepdive binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;
pub mod run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// deepdive - research report server
///
/// Refines a query, searches the web, synthesizes the results and drafts a
/// structured markdown report with sections generated in parallel.
#[derive(Parser, Debug)]
#[command(
    name = "deepdive",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "deepdive - research report server",
    long_about = "Refines a query, searches the web, synthesizes the findings and drafts a\n\
                  structured markdown report with sections generated in parallel.\n\n\
                  Run without arguments to start the HTTP server, or use 'run' for a one-off report.",
    after_help = "EXAMPLES:\n    \
                  deepdive init                          # Write deepdive.toml and .env.example\n    \
                  deepdive run \"AI agents in 2025\"       # Generate a report in reports/\n    \
                  deepdive                               # Start the server (same as 'serve')\n    \
                  deepdive --config my.toml config       # Show a custom configuration"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "deepdive.toml", global = true)]
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

    /// Research a query and write the markdown report
    Run {
        /// The research question
        query: String,

        /// Output file (defaults to reports/research_report_<query>.md)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override report.max_workers
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Show configuration information
    Config {
        /// Also check that both provider keys are set
        #[arg(long)]
        validate: bool,
    },

    /// Write a starter deepdive.toml and .env.example
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
