//! Delete command handler

use anyhow::{Context, Result, bail};
use colored::*;
use dialoguer::Confirm;
use std::sync::Arc;

use sheetgraph::config::Config;
use sheetgraph::graph::types::apply_sheet_mapping;
use sheetgraph::graph::{LogSink, Pipeline, RunMode, RunReport};
use sheetgraph::source::read_source;

use super::connection::build_client;
use super::summary::print_report;
use crate::cli::DeleteArgs;

/// Handle `sheetgraph delete`
pub async fn handle_delete_command(args: DeleteArgs, config: &Config) -> Result<()> {
    let sheets = read_source(&args.path)?;

    let targets: Vec<String> = apply_sheet_mapping(sheets.clone(), &LogSink)?
        .iter()
        .rev()
        .filter(|s| !s.is_composition())
        .map(|s| s.entity_name().to_string())
        .collect();
    if targets.is_empty() {
        bail!("No entity sheets found in {}", args.path.display());
    }

    println!("{}", "The following entity types will be emptied, in this order:".bold());
    for entity in &targets {
        println!("  - {}", entity.red());
    }

    if !args.yes && !args.dry_run {
        let confirmed = Confirm::new()
            .with_prompt("Delete ALL records of these types?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let mut options = config.pipeline_options();
    options.dry_run = args.dry_run;
    let client = build_client(&args.connection, config)?;
    let pipeline = Pipeline::new(Arc::new(client), Arc::new(LogSink), options);

    let mut report = RunReport::default();
    let outcome = pipeline.run_into(sheets, RunMode::Delete, &mut report).await;
    print_report(&report);
    outcome.context("Delete failed")?;
    Ok(())
}
