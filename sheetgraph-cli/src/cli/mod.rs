//! Command-line interface

pub mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use sheetgraph::config::Config;

#[derive(Parser, Debug)]
#[command(name = "sheetgraph", version, about = "Import spreadsheets into a GraphQL object graph")]
pub struct Cli {
    /// Configuration file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create records from a workbook, CSV file or directory of CSV files
    Import(ImportArgs),
    /// Bulk-delete every entity type named by the workbook's ordinary sheets
    Delete(DeleteArgs),
    /// Show how sheets and headers are interpreted, without contacting any endpoint
    Inspect(InspectArgs),
}

/// Endpoint and credential options shared by commands that talk to the API
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Profile from the configuration file
    #[arg(long)]
    pub profile: Option<String>,

    /// GraphQL endpoint; repeat for fallback endpoints (overrides the profile)
    #[arg(long = "endpoint", value_name = "URL")]
    pub endpoints: Vec<String>,

    /// Basic-auth username (or SHEETGRAPH_USERNAME)
    #[arg(long)]
    pub username: Option<String>,

    /// Basic-auth password (or SHEETGRAPH_PASSWORD; prompted when missing)
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Input file or directory
    pub path: PathBuf,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Fold multi-level compositions into one mutation per root parent
    #[arg(long)]
    pub nested: bool,

    /// Values per lookup request
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Compile mutations and resolve references, but send no mutation
    #[arg(long)]
    pub dry_run: bool,

    /// Write compiled mutations to a file (one per line, or a JSON report for .json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Input file or directory
    pub path: PathBuf,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Show the bulk deletes without sending them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input file or directory
    pub path: PathBuf,
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Import(args) => commands::import::handle_import_command(args, &config).await,
        Commands::Delete(args) => commands::delete::handle_delete_command(args, &config).await,
        Commands::Inspect(args) => commands::inspect::handle_inspect_command(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import() {
        let cli = Cli::try_parse_from([
            "sheetgraph",
            "import",
            "data.xlsx",
            "--endpoint",
            "https://a/graphql",
            "--endpoint",
            "https://b/graphql",
            "--nested",
            "--batch-size",
            "50",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Import(args) => {
                assert_eq!(args.path, PathBuf::from("data.xlsx"));
                assert_eq!(args.connection.endpoints.len(), 2);
                assert!(args.nested && args.dry_run);
                assert_eq!(args.batch_size, Some(50));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_delete_and_global_flags() {
        let cli = Cli::try_parse_from(["sheetgraph", "delete", "data.xlsx", "--yes", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Delete(ref args) if args.yes));
    }
}
