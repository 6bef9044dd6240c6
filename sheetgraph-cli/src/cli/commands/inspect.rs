//! Inspect command handler: show how a workbook will be interpreted

use anyhow::{Result, bail};
use colored::*;

use sheetgraph::graph::LogSink;
use sheetgraph::graph::types::{Header, HeaderKind, Sheet, apply_sheet_mapping};
use sheetgraph::source::read_source;

use crate::cli::InspectArgs;

/// Handle `sheetgraph inspect`
pub fn handle_inspect_command(args: InspectArgs) -> Result<()> {
    let sheets = apply_sheet_mapping(read_source(&args.path)?, &LogSink)?;

    let mut invalid = 0;
    for raw in &sheets {
        match Sheet::parse(raw) {
            Ok(sheet) => print_sheet(&sheet),
            Err(e) => {
                invalid += 1;
                println!("{} {}", "✗".bright_red(), raw.name.bold());
                println!("    {}", e.to_string().red());
            }
        }
        println!();
    }

    if invalid > 0 {
        bail!("{} of {} sheet(s) cannot be imported", invalid, sheets.len());
    }
    println!("{}", format!("{} sheet(s) ready to import", sheets.len()).bright_green());
    Ok(())
}

fn print_sheet(sheet: &Sheet) {
    println!(
        "{} {} {} - {} row(s)",
        "✓".bright_green(),
        sheet.name().bold(),
        format!("({})", sheet.kind()).dimmed(),
        sheet.rows().len()
    );
    if sheet.is_composition() {
        println!("    role: {}", sheet.role_name().cyan());
        if let Some(parent) = sheet.parent_reference() {
            println!(
                "    parent: {} matched on {}",
                parent.class_name.cyan(),
                parent.attribute_name.cyan()
            );
        }
    } else {
        println!("    entity: {}", sheet.entity_name().cyan());
    }
    for (col, header) in sheet.headers().iter().enumerate() {
        println!("    [{}] {}", col, describe_header(header));
    }
}

fn describe_header(header: &Header) -> String {
    let quoted = if header.forced_quotation() {
        format!(" {}", "(always quoted)".dimmed())
    } else {
        String::new()
    };
    match header.kind() {
        HeaderKind::Attribute { name } => format!("{}{}", name, quoted),
        HeaderKind::Reference(reference) => format!(
            "{} {} {}.{}{}",
            reference.role_name.yellow(),
            "->".dimmed(),
            reference.class_name,
            reference.attribute_name,
            quoted
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_reference_header() {
        colored::control::set_override(false);
        let header = Header::parse("*Department[Dept].nome").unwrap();
        assert_eq!(describe_header(&header), "Dept -> Department.nome");
        let header = Header::parse("§codice").unwrap();
        assert_eq!(describe_header(&header), "codice (always quoted)");
    }
}
