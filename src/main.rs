mod classify;
mod cli;
mod config;
mod error;
#[cfg(test)]
mod fixtures;
mod models;
mod output;
mod policy;
mod retention;
mod source;

use std::process;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, Format, ScanArgs};
use error::AppError;
use models::ReferencePools;
use output::{plan_json, print_policies, print_pools, print_targets, print_trace};
use policy::KeepPolicy;
use source::GitRepository;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "reftidy=debug" } else { "reftidy=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Scan(args) => run_scan(cli, args),
        Command::Refs => run_refs(cli),
        Command::Policies => run_policies(cli),
    }
}

fn load_policies(cli: &Cli) -> Result<Vec<KeepPolicy>> {
    config::load_keep_policies(&cli.dir, cli.config.as_deref())
        .context("Failed to load cleanup keep policies")
}

fn load_pools(cli: &Cli) -> Result<ReferencePools> {
    let repo = GitRepository::discover(&cli.dir).map_err(|source| AppError::OpenRepository {
        path: cli.dir.clone(),
        source,
    })?;

    let pools = classify::classify(&repo, &cli.remote)
        .with_context(|| format!("Failed to classify references of remote {}", cli.remote))?;

    if pools.branches.is_empty() {
        tracing::warn!(remote = %cli.remote, "no upstream branches found, is the remote fetched?");
    }

    Ok(pools)
}

fn run_scan(cli: &Cli, args: &ScanArgs) -> Result<()> {
    let policies = load_policies(cli)?;
    let pools = load_pools(cli)?;

    let plan = retention::references_to_scan(&pools, &policies, Utc::now());

    tracing::info!(
        references = plan.targets.len(),
        branches = pools.branches.len(),
        tags = pools.tags.len(),
        "selected references to scan"
    );

    match args.format {
        Format::Text => {
            print_trace(&plan.trace);
            print_targets(&plan.targets);
        }
        Format::Json => {
            println!("{}", plan_json(&plan).context("Failed to render scan plan")?);
        }
    }

    Ok(())
}

fn run_refs(cli: &Cli) -> Result<()> {
    let pools = load_pools(cli)?;
    print_pools(&pools);
    Ok(())
}

fn run_policies(cli: &Cli) -> Result<()> {
    let configured = load_policies(cli)?;
    if configured.is_empty() {
        print_policies(&KeepPolicy::defaults(), true);
    } else {
        print_policies(&configured, false);
    }
    Ok(())
}
