//! Render UPDATE statements from a saved reconciliation report.
//!
//! Usage: render-update-sql <report.json> <output.sql> --attribute password

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use subject_reconcile::report::{read_json_report, render_update_sql, UpdateSpec};
use subject_reconcile::safety::validate_output_path;

#[derive(Parser)]
#[command(name = "render-update-sql")]
#[command(about = "Turn matched pairs into UPDATE statements for the target database")]
struct Args {
    report: PathBuf,

    output: PathBuf,

    #[arg(long, default_value = "subjects")]
    table: String,

    /// Column to set; defaults to the attribute name
    #[arg(long)]
    set_column: Option<String>,

    /// Source attribute holding the new value
    #[arg(long)]
    attribute: String,

    /// Column matched against the target id
    #[arg(long, default_value = "code")]
    key_column: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    validate_output_path(&args.output, "sql", &[args.report.as_path()])?;

    let report = read_json_report(&args.report)?;
    let spec = UpdateSpec {
        table: args.table.clone(),
        set_column: args.set_column.clone().unwrap_or_else(|| args.attribute.clone()),
        attribute: args.attribute.clone(),
        key_column: args.key_column.clone(),
    };

    let rendered = render_update_sql(&report, &spec)?;
    std::fs::write(&args.output, &rendered.sql)?;

    println!("Generated {:?} with {} UPDATE statements", args.output, rendered.updates);
    if rendered.skipped > 0 {
        eprintln!("  {} matches had no '{}' attribute", rendered.skipped, spec.attribute);
    }
    if rendered.duplicates > 0 {
        eprintln!("  {} matches skipped: target already updated by an earlier source", rendered.duplicates);
    }
    println!("Unmatched sources: {}", report.summary.unmatched);

    Ok(())
}
