//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "playbox")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Toolchain configuration file (TOML)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Playground directory, overriding the configuration file
    #[arg(short, long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Unpack a toolchain zip archive (local path or http(s) URL)
    Bootstrap(BootstrapArgs),
    /// Create the playground workspace
    Init,
    /// Build the playground
    Build,
    /// Build the playground, then run it
    Run(RunArgs),
    /// Format the playground source and print the result
    Fmt,
    /// Replace the playground source with new contents
    Edit(EditArgs),
    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
pub struct BootstrapArgs {
    /// Archive path or http(s) URL
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Directory to unpack into
    #[arg(value_name = "OUTPUT_DIR", default_value = "go")]
    pub output_dir: PathBuf,

    /// Maximum number of files to extract
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Maximum total extracted size in bytes
    #[arg(long, value_parser = parse_byte_size)]
    pub max_total_size: Option<u64>,

    /// Maximum single file size in bytes
    #[arg(long, value_parser = parse_byte_size)]
    pub max_file_size: Option<u64>,

    /// Remove everything written so far if extraction fails
    #[arg(long)]
    pub cleanup_on_failure: bool,
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Run the existing binary without building first
    #[arg(long)]
    pub no_build: bool,
}

#[derive(clap::Args)]
pub struct EditArgs {
    /// File with the new contents (default: stdin)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,
}

/// Parse byte size with optional suffix (K, M, G, T)
#[allow(clippy::option_if_let_else)]
fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty byte size".to_string());
    }

    let (num_str, multiplier) = if let Some(stripped) = s.strip_suffix('T') {
        (stripped, 1024_u64.pow(4))
    } else if let Some(stripped) = s.strip_suffix('G') {
        (stripped, 1024_u64.pow(3))
    } else if let Some(stripped) = s.strip_suffix('M') {
        (stripped, 1024_u64.pow(2))
    } else if let Some(stripped) = s.strip_suffix('K') {
        (stripped, 1024)
    } else {
        (s, 1)
    };

    num_str
        .parse::<u64>()
        .map_err(|_| format!("invalid byte size: {s}"))
        .and_then(|n| {
            n.checked_mul(multiplier)
                .ok_or_else(|| format!("byte size overflow: {s}"))
        })
}
