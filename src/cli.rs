use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// reftidy — decide which git references to scan when cleaning up built images
#[derive(Parser, Debug)]
#[command(name = "reftidy", version, about)]
pub struct Cli {
    /// Project directory inside the git work tree
    #[arg(long, env = "REFTIDY_DIR", default_value = ".", global = true)]
    pub dir: PathBuf,

    /// Config file with cleanup keep policies (default: <dir>/werf.yaml)
    #[arg(long, env = "REFTIDY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Upstream remote whose tracking branches are considered
    #[arg(long, default_value = "origin", global = true)]
    pub remote: String,

    /// Verbose output
    #[arg(short, long, default_value_t = false, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply keep policies and list the references to scan
    Scan(ScanArgs),
    /// List upstream branches and tags without applying policies
    Refs,
    /// Show the effective keep policies
    Policies,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}
