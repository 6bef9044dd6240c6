//! Run report printing and export

use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

use sheetgraph::graph::RunReport;

/// Print a per-sheet summary of a run
pub fn print_report(report: &RunReport) {
    println!();
    for sheet in &report.sheets {
        let executed = if report.dry_run {
            "dry run".dimmed().to_string()
        } else {
            format!("{} sent", sheet.executed)
        };
        let issues = if sheet.issues.is_empty() {
            String::new()
        } else {
            format!(", {}", format!("{} skipped", sheet.issues.len()).yellow())
        };
        println!(
            "  {} {} - {} mutation(s), {}{}",
            sheet.sheet.bold(),
            format!("({})", sheet.kind).dimmed(),
            sheet.mutations.len(),
            executed,
            issues
        );
    }

    let issues: Vec<_> = report.issues().collect();
    if !issues.is_empty() {
        println!();
        println!("{}", "Skipped rows:".yellow().bold());
        for issue in issues {
            println!("  {}", issue.to_string().yellow());
        }
    }

    println!();
    let headline = format!(
        "{} mutation(s) compiled, {} sent, {} row(s) skipped, {} lookup request(s)",
        report.total_mutations(),
        report.total_executed(),
        report.total_issues(),
        report.lookups
    );
    if report.total_issues() == 0 {
        println!("{}", headline.bright_green());
    } else {
        println!("{}", headline.yellow());
    }
}

/// Write compiled mutations to `path`
///
/// `.json` files get the full report; anything else gets one mutation per line.
pub fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let content = if is_json {
        serde_json::to_string_pretty(report).context("Failed to serialize run report")?
    } else {
        let mut out = String::new();
        for mutation in report.mutations() {
            out.push_str(&mutation.text);
            out.push('\n');
        }
        out
    };

    fs::write(path, content)
        .with_context(|| format!("Failed to write output to: {}", path.display()))?;
    println!(
        "Mutations saved to: {}",
        path.display().to_string().bright_green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetgraph::graph::types::Node;
    use sheetgraph::graph::{Mutation, SheetReport};

    fn report() -> RunReport {
        RunReport {
            sheets: vec![SheetReport {
                sheet: "Department".to_string(),
                kind: "entity".to_string(),
                mutations: vec![
                    Mutation::create("Department", Node::object().with("nome", Node::scalar("\"Sales\""))),
                    Mutation::create("Department", Node::object().with("nome", Node::scalar("\"Ops\""))),
                ],
                issues: vec![],
                executed: 0,
            }],
            lookups: 0,
            dry_run: true,
        }
    }

    #[test]
    fn test_write_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mutations.graphql");
        write_report(&report(), &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.starts_with("mutation { Department___create"));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report(&report(), &path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["sheets"][0]["mutations"][1]["kind"], "create");
        assert_eq!(value["dry_run"], true);
    }
}
