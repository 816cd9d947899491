// src/main.rs
// =============================================================================
// Entry point of the repo-sampler CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (stderr, WARN by default, DEBUG with --verbose)
// 3. Merge settings: defaults < --config file < flags / environment
// 4. Run the subcommand, cancelling it on Ctrl-C or --timeout
// 5. Print the results and exit with a code:
//    0 = files found, 1 = nothing to fetch, 2 = error
// =============================================================================

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, TargetArgs};
use repo_sampler::github::RateLimitState;
use repo_sampler::{sample, FetchConfig, RepoFetcher, RepositorySnapshot, SamplePlan, StatsSnapshot};
use serde::Serialize;
use std::time::Duration;
use tracing::{warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Fetch { target, show_content } => handle_fetch(&cli, target, *show_content).await,
        Commands::Plan { target } => handle_plan(&cli, target).await,
    }
}

fn init_logging(verbose: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(verbose, rust_log.as_deref()))
        .try_init();
}

// A valid RUST_LOG is used as is; otherwise --verbose picks DEBUG and the default is WARN
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    if let Some(filter) = rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
    {
        return filter;
    }

    let level = if verbose { Level::DEBUG } else { Level::WARN };
    EnvFilter::default().add_directive(level.into())
}

// Defaults, then the TOML file, then whatever was given on the command line
fn load_config(cli: &Cli, target: &TargetArgs) -> Result<FetchConfig> {
    let mut config = match &cli.config {
        Some(path) => FetchConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => FetchConfig::default(),
    };

    if let Some(token) = &cli.token {
        config.token = Some(token.clone());
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(ttl) = cli.cache_ttl {
        config.cache_ttl_secs = ttl;
    }
    if let Some(max_files) = target.max_files {
        config.max_files = max_files;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

// Completes on Ctrl-C, or once `timeout` has passed
async fn cancellation(timeout: Option<Duration>) {
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let deadline = async {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = interrupted => {}
        _ = deadline => {}
    }
}

// Handles the 'fetch' subcommand
async fn handle_fetch(cli: &Cli, target: &TargetArgs, show_content: bool) -> Result<i32> {
    let config = load_config(cli, target)?;
    let fetcher = RepoFetcher::from_config(&config).context("Failed to set up the GitHub client")?;

    if !target.json {
        println!("🔍 Sampling up to {} file(s) from {}", config.max_files, target.repo_url);
    }

    let snapshot = fetcher
        .fetch_repository_until(&target.repo_url, config.max_files, cancellation(cli.timeout.map(Duration::from_secs)))
        .await
        .with_context(|| format!("Failed to fetch {}", target.repo_url))?;

    let report = FetchReport {
        snapshot: &snapshot,
        stats: fetcher.stats(),
        rate_limit: fetcher.rate_limit(),
    };

    if target.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&report);
        if show_content {
            print_contents(&snapshot);
        }
    }

    if snapshot.files.is_empty() {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Handles the 'plan' subcommand
async fn handle_plan(cli: &Cli, target: &TargetArgs) -> Result<i32> {
    let config = load_config(cli, target)?;
    let fetcher = RepoFetcher::from_config(&config).context("Failed to set up the GitHub client")?;

    let plan = fetcher
        .plan_until(&target.repo_url, config.max_files, cancellation(cli.timeout.map(Duration::from_secs)))
        .await
        .with_context(|| format!("Failed to plan {}", target.repo_url))?;

    if target.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }

    if plan.sampled.is_empty() {
        Ok(1)
    } else {
        Ok(0)
    }
}

#[derive(Serialize)]
struct FetchReport<'a> {
    #[serde(flatten)]
    snapshot: &'a RepositorySnapshot,
    stats: StatsSnapshot,
    rate_limit: RateLimitState,
}

fn print_table(report: &FetchReport<'_>) {
    let snapshot = report.snapshot;

    println!("{:<60} {:<10} {:>10}", "PATH", "EXT", "BYTES");
    println!("{}", "=".repeat(82));

    for file in snapshot.files.values() {
        println!("{:<60} {:<10} {:>10}", shorten(&file.path, 57), file.extension, file.size);
    }

    println!();
    println!("📊 Summary:");
    println!("   🌿 Branch: {}", snapshot.branch);
    println!("   📋 Files in tree: {}", snapshot.total_count);
    println!("   ✅ Fetched: {} of {} sampled", snapshot.files.len(), snapshot.sampled_count);
    println!(
        "   🌐 API calls: {} (cache hits: {}, {:.0}% hit rate)",
        report.stats.api_calls,
        report.stats.cache_hits,
        report.stats.cache_hit_rate * 100.0
    );
    println!("   ⏳ Rate limit remaining: {}", report.rate_limit.remaining);
}

fn print_contents(snapshot: &RepositorySnapshot) {
    for file in snapshot.files.values() {
        println!();
        println!("──── {} ────", file.path);
        println!("{}", file.content);
    }
}

fn print_plan(plan: &SamplePlan) {
    println!("🌿 {} @ {}", plan.repository, plan.branch);
    println!("📋 {} entries in tree", plan.total_count);
    if plan.truncated {
        println!("⚠️  GitHub truncated the listing; the sample comes from a partial tree");
    }

    println!();
    println!("{:<60} {:>10}", "PATH", "BYTES");
    println!("{}", "=".repeat(71));
    for entry in &plan.sampled {
        println!("{:<60} {:>10}", shorten(&entry.path, 57), entry.size);
    }

    println!();
    println!("📊 Sampled {} file(s):", plan.sampled.len());
    for (extension, count) in sample::extension_histogram(&plan.sampled) {
        println!("   .{:<12} {}", extension, count);
    }
}

// Keeps table columns aligned for long paths
fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
