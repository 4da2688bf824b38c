//! anybakup CLI - abk command

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;
mod diff_utils;
mod util;

/// anybakup - versioned backups of files and directories into one store
#[derive(Parser)]
#[command(name = "abk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Store profile to use (default: the config's default profile)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a backup store and register it as a profile
    Init {
        /// Directory that will hold the store
        dir: PathBuf,
    },
    /// Back up a file or directory
    Add {
        path: PathBuf,
        /// Tag the entry after adding it
        #[arg(long)]
        tag: Option<String>,
    },
    /// Remove a file or directory from the store
    Rm { path: PathBuf },
    /// Show whether a path is tracked, with its kind, revisions and tag
    Status { path: PathBuf },
    /// Show the revisions of a path, newest first
    Log { path: PathBuf },
    /// Restore a path as it was in a revision
    Get {
        path: PathBuf,
        /// Revision hash (full or abbreviated)
        revision: String,
        /// Write here instead of the original location
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Diff a stored revision against the current file
    Diff {
        path: PathBuf,
        /// Revision to compare with (default: newest)
        revision: Option<String>,
        /// Number of context lines (default: 3)
        #[arg(short = 'U', long, default_value = "3")]
        context: usize,
    },
    /// Set or show the tag of a tracked path
    Tag {
        path: PathBuf,
        tag: Option<String>,
    },
    /// List all tags in use
    Tags,
    /// List tracked entries, most recently updated first
    Ls {
        /// Only entries carrying this tag
        #[arg(long)]
        tag: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Check the ledger against the store history
    Verify {
        /// Fix what can be fixed
        #[arg(long)]
        repair: bool,
    },
    /// Show configuration
    Config {
        /// Print the config file path
        #[arg(long, conflicts_with = "example")]
        path: bool,
        /// Print an example configuration
        #[arg(long)]
        example: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let profile = cli.profile.as_deref();
    match cli.command {
        Commands::Init { dir } => cmd::init::run(&dir, profile),
        Commands::Add { path, tag } => cmd::add::run(&path, tag.as_deref(), profile),
        Commands::Rm { path } => cmd::rm::run(&path, profile),
        Commands::Status { path } => cmd::status::run(&path, profile),
        Commands::Log { path } => cmd::log::run(&path, profile),
        Commands::Get { path, revision, out } => {
            cmd::get::run(&path, &revision, out.as_deref(), profile)
        }
        Commands::Diff { path, revision, context } => {
            cmd::diff::run(&path, revision.as_deref(), context, profile)
        }
        Commands::Tag { path, tag } => cmd::tag::run(&path, tag.as_deref(), profile),
        Commands::Tags => cmd::tags::run(profile),
        Commands::Ls { tag, json } => cmd::ls::run(tag.as_deref(), json, profile),
        Commands::Verify { repair } => cmd::verify::run(repair, profile),
        Commands::Config { path, example } => {
            if path {
                cmd::config::run_path()
            } else if example {
                cmd::config::run_example()
            } else {
                cmd::config::run_list()
            }
        }
    }
}
