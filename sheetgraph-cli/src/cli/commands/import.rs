//! Import command handler

use anyhow::{Context, Result};
use colored::*;
use std::sync::Arc;
use std::time::Instant;

use sheetgraph::config::Config;
use sheetgraph::graph::{LogSink, Pipeline, RunMode, RunReport};
use sheetgraph::source::read_source;

use super::connection::build_client;
use super::summary::{print_report, write_report};
use crate::cli::ImportArgs;

/// Handle `sheetgraph import`
pub async fn handle_import_command(args: ImportArgs, config: &Config) -> Result<()> {
    let start = Instant::now();

    let sheets = read_source(&args.path)?;
    println!(
        "Importing {} sheet(s) from {}",
        sheets.len(),
        args.path.display().to_string().cyan()
    );

    let mut options = config.pipeline_options();
    if let Some(batch_size) = args.batch_size {
        options.batch_size = batch_size.max(1);
    }
    options.nested_compositions |= args.nested;
    options.dry_run = args.dry_run;
    if options.dry_run {
        println!("{}", "Dry run: mutations will not be sent".yellow());
    }

    let client = build_client(&args.connection, config)?;
    let pipeline = Pipeline::new(Arc::new(client), Arc::new(LogSink), options);

    // the report is kept on failure so --output records what was already sent
    let mut report = RunReport::default();
    let outcome = pipeline.run_into(sheets, RunMode::Create, &mut report).await;

    print_report(&report);
    if let Some(output) = &args.output {
        write_report(&report, output)?;
    }
    outcome.context("Import failed")?;
    println!(
        "Finished in {:.2}s",
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
