// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
// Two subcommands:
// - fetch: sample a repository and download the chosen files
// - plan:  sample a repository but only show what would be downloaded
//
// Options shared by both (token, concurrency, cache TTL, ...) are global, so
// they can go before or after the subcommand. Several of them also read an
// environment variable, which is how the tool is usually configured in CI.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "repo-sampler",
    version,
    about = "Fetch a representative sample of files from a GitHub repository",
    long_about = "repo-sampler picks a bounded, extension-diverse subset of a GitHub repository's \
                  source files and downloads them, staying within the API rate limit. \
                  Repeated runs in one process are served from a TTL cache."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// GitHub token (unauthenticated requests are limited to 60 per hour)
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Number of file downloads allowed in flight at once
    #[arg(long, global = true, env = "BATCH_SIZE")]
    pub concurrency: Option<usize>,

    /// Seconds a cached tree or file stays valid
    #[arg(long, global = true, env = "CACHE_TTL")]
    pub cache_ttl: Option<u64>,

    /// Give up on the whole operation after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// TOML file with settings (flags and environment variables win over it)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a sample of the repository's files
    ///
    /// Example: repo-sampler fetch https://github.com/rust-lang/log --max-files 10
    Fetch {
        #[command(flatten)]
        target: TargetArgs,

        /// Print each file's content after the table
        #[arg(long)]
        show_content: bool,
    },

    /// Show which files would be downloaded, without downloading them
    ///
    /// Example: repo-sampler plan https://github.com/rust-lang/log
    Plan {
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Arguments shared by every subcommand that works on one repository.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// GitHub repository URL (e.g., https://github.com/user/repo)
    pub repo_url: String,

    /// Maximum number of files to sample
    #[arg(long, env = "MAX_FILES_TO_FETCH")]
    pub max_files: Option<usize>,

    /// Output JSON instead of a table
    #[arg(long)]
    pub json: bool,
}


// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why are most flags Option<T>?
//    - None means "not given", so the value from the config file (or the
//      built-in default) survives. A default_value here would always win.
//
// 2. What does `env = "..."` do?
//    - If the flag is missing, clap reads the environment variable instead
//    - It needs the "env" feature of clap (see Cargo.toml)
//
// 3. What is #[command(flatten)]?
//    - It copies the fields of TargetArgs into the subcommand, so fetch and
//      plan share the same repo_url / --max-files / --json arguments
// -----------------------------------------------------------------------------
