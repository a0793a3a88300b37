use std::path::PathBuf;
use clap::Parser;

/// Reconstruct a task timeline from MaaFramework and agent logs
#[derive(Debug, Parser)]
#[command(name = "analyzer")]
#[command(about = "Parse MaaFramework and agent logs into a correlated task timeline", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (overrides $MAALOGS_CONFIG_FILE and maalogs.toml)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Print the parser registrations and exit
    #[arg(long)]
    pub list_parsers: bool,

    /// Log files to ingest
    #[arg(required_unless_present = "list_parsers")]
    pub files: Vec<PathBuf>,
}
