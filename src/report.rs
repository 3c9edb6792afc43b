//! Rendering reconciliation reports.
//!
//! The core hands back a [`ReconcileReport`]; this module turns it into the
//! artifacts a migration needs: a JSON dump for re-use, a CSV of matches for
//! spreadsheet review, a plain-text summary grouped by confidence tier, and
//! `UPDATE` statements for the target database.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::models::{MatchedPair, ReconcileReport};

// ============================================================================
// JSON
// ============================================================================

pub fn write_json_report(report: &ReconcileReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn read_json_report(path: &Path) -> Result<ReconcileReport> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a reconciliation report", path.display()))
}

// ============================================================================
// CSV
// ============================================================================

#[derive(Serialize)]
struct CsvMatchRow<'a> {
    source_id: &'a str,
    source_name: &'a str,
    target_id: &'a str,
    target_name: &'a str,
    score: String,
    tier: &'a str,
    full_string: String,
    token_coverage: String,
    keyword_boost: String,
    roman_numeral: String,
}

impl<'a> From<&'a MatchedPair> for CsvMatchRow<'a> {
    fn from(m: &'a MatchedPair) -> Self {
        Self {
            source_id: &m.source.id,
            source_name: m.source.display_name(),
            target_id: &m.target.id,
            target_name: m.target.display_name(),
            score: format!("{:.3}", m.score),
            tier: &m.tier,
            full_string: format!("{:.3}", m.breakdown.full_string),
            token_coverage: format!("{:.3}", m.breakdown.token_coverage),
            keyword_boost: format!("{:.3}", m.breakdown.keyword_boost),
            roman_numeral: format!("{:.3}", m.breakdown.roman_numeral),
        }
    }
}

/// Write one CSV row per matched pair, with the score breakdown.
pub fn write_csv_matches(report: &ReconcileReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))?;
    for m in &report.matches {
        writer.serialize(CsvMatchRow::from(m))?;
    }
    writer.flush()?;
    Ok(())
}

// ============================================================================
// Plain text
// ============================================================================

/// Human-readable report: statistics, matches per tier (best first), then leftovers.
pub fn render_text_report(report: &ReconcileReport) -> String {
    let summary = &report.summary;
    let mut out = String::new();

    let _ = writeln!(out, "NAME RECONCILIATION REPORT");
    let _ = writeln!(out, "{:=<60}", "");
    let _ = writeln!(out, "Sources:            {}", summary.total_sources);
    let _ = writeln!(out, "Targets:            {}", summary.total_targets);
    let _ = writeln!(out, "Threshold:          {:.2}", report.acceptance_threshold);
    let _ = writeln!(out, "Exclusive targets:  {}", report.exclusive_targets);
    let _ = writeln!(out, "Matched:            {} ({:.1}%)", summary.matched, summary.match_rate());
    let _ = writeln!(out, "Unmatched:          {}", summary.unmatched);
    let _ = writeln!(out, "Unclaimed targets:  {}", summary.unclaimed_targets);
    for tier in &summary.tiers {
        let _ = writeln!(out, "  {:<16} {}", tier.label, tier.count);
    }

    for tier in &summary.tiers {
        let mut in_tier: Vec<&MatchedPair> = report.matches.iter().filter(|m| m.tier == tier.label).collect();
        in_tier.sort_by(|a, b| b.score.total_cmp(&a.score));

        let title = format!("{} CONFIDENCE MATCHES", tier.label.to_uppercase());
        let _ = writeln!(out, "\n{}\n{:-<width$}", title, "", width = title.len());
        for m in in_tier {
            let _ = writeln!(
                out,
                "{} -> {} ({}) [confidence: {:.2}]",
                m.source.display_name(),
                m.target.id,
                m.target.display_name(),
                m.score
            );
        }
    }

    let _ = writeln!(out, "\nUNMATCHED SOURCES\n{:-<17}", "");
    for u in &report.unmatched {
        let _ = writeln!(out, "{} ({}) - {}", u.source.display_name(), u.source.id, u.reason);
    }

    let _ = writeln!(out, "\nUNCLAIMED TARGETS\n{:-<17}", "");
    for t in &report.unclaimed_targets {
        let _ = writeln!(out, "{} ({})", t.display_name(), t.id);
    }

    out
}

pub fn write_text_report(report: &ReconcileReport, path: &Path) -> Result<()> {
    std::fs::write(path, render_text_report(report)).with_context(|| format!("Failed to write {}", path.display()))
}

// ============================================================================
// SQL
// ============================================================================

static SQL_IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)?$").unwrap());

/// Which column to update from which source attribute.
///
/// Renders `UPDATE <table> SET <set_column> = '<source attribute>' WHERE <key_column> = '<target id>';`
#[derive(Clone, Debug)]
pub struct UpdateSpec {
    pub table: String,
    pub set_column: String,
    pub attribute: String,
    pub key_column: String,
}

/// Rendered statements plus counts for the caller's log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateSql {
    pub sql: String,
    pub updates: usize,
    /// Matches whose source lacked the attribute
    pub skipped: usize,
    /// Later matches on a target that already got an update (many-to-one passes)
    pub duplicates: usize,
}

/// Quote a value as a SQL string literal.
pub fn sql_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Render one `UPDATE` per matched pair whose source carries `spec.attribute`.
///
/// Only the first match of each target id is rendered; in many-to-one passes
/// later matches on the same target would otherwise overwrite it.
pub fn render_update_sql(report: &ReconcileReport, spec: &UpdateSpec) -> Result<UpdateSql> {
    for ident in [&spec.table, &spec.set_column, &spec.key_column] {
        if !SQL_IDENTIFIER.is_match(ident) {
            bail!("'{}' is not a valid SQL identifier", ident);
        }
    }

    let mut sql = String::new();
    let _ = writeln!(sql, "-- Update {}.{} from reconciled '{}' values", spec.table, spec.set_column, spec.attribute);
    let _ = writeln!(sql);

    let mut updates = 0;
    let mut skipped = 0;
    let mut emitted: FxHashSet<&str> = FxHashSet::default();
    let mut duplicate_sources = Vec::new();
    for m in &report.matches {
        let Some(value) = m.source.attribute(&spec.attribute) else {
            skipped += 1;
            continue;
        };
        if !emitted.insert(m.target.id.as_str()) {
            duplicate_sources.push(format!("{} -> {}", m.source.id, m.target.id));
            continue;
        }
        let _ = writeln!(
            sql,
            "UPDATE {} SET {} = {} WHERE {} = {};",
            spec.table,
            spec.set_column,
            sql_quote(value),
            spec.key_column,
            sql_quote(&m.target.id)
        );
        updates += 1;
    }

    let _ = writeln!(sql);
    let _ = writeln!(sql, "-- Total updates: {}", updates);
    let _ = writeln!(sql, "-- Matches without '{}': {}", spec.attribute, skipped);
    let _ = writeln!(sql, "-- Duplicate targets skipped: {}", duplicate_sources.len());
    for dup in &duplicate_sources {
        let _ = writeln!(sql, "--   {}", dup);
    }
    let _ = writeln!(sql, "-- Unmatched sources: {}", report.summary.unmatched);

    Ok(UpdateSql {
        sql,
        updates,
        skipped,
        duplicates: duplicate_sources.len(),
    })
}
