use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;

use subject_reconcile::progress::{format_duration, set_log_only, MatchProgress, MATCH_PHASE};
use subject_reconcile::report::{write_csv_matches, write_json_report, write_text_report};
use subject_reconcile::safety::validate_output_path;
use subject_reconcile::similarity::SimilarityMetric;
use subject_reconcile::sources::{exclude_by_keywords, load_records, DEFAULT_EXCLUDED_KEYWORDS};
use subject_reconcile::{ReconcileConfig, Reconciler, SourceOrder};

#[derive(Parser)]
#[command(name = "subject-reconcile")]
#[command(about = "Match spreadsheet-derived names against database records")]
struct Args {
    /// Source records (JSON, or SQLite with --sources-query)
    sources: PathBuf,

    /// Target records (JSON, or SQLite with --targets-query)
    targets: PathBuf,

    /// JSON report output
    output: PathBuf,

    #[arg(long)]
    sources_query: Option<String>,

    /// e.g. "SELECT code, name_ca, name_es FROM subjects"
    #[arg(long)]
    targets_query: Option<String>,

    /// TOML config; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum score to accept a match (required unless the config sets it)
    #[arg(long)]
    threshold: Option<f64>,

    /// Allow several sources to claim the same target
    #[arg(long)]
    many_to_one: bool,

    /// Process longer names first
    #[arg(long)]
    longest_first: bool,

    #[arg(long, value_enum)]
    metric: Option<MetricArg>,

    /// Skip sources whose id or name contains one of these (comma-separated)
    #[arg(long, value_delimiter = ',')]
    exclude: Option<Vec<String>>,

    /// Also write matches as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Also write a plain-text report
    #[arg(long)]
    text: Option<PathBuf>,

    /// Hide progress bars, print periodic progress lines instead
    #[arg(long)]
    log_only: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum MetricArg {
    Sequence,
    Levenshtein,
    JaroWinkler,
}

impl From<MetricArg> for SimilarityMetric {
    fn from(m: MetricArg) -> Self {
        match m {
            MetricArg::Sequence => SimilarityMetric::SequenceRatio,
            MetricArg::Levenshtein => SimilarityMetric::NormalizedLevenshtein,
            MetricArg::JaroWinkler => SimilarityMetric::JaroWinkler,
        }
    }
}

fn build_config(args: &Args) -> Result<ReconcileConfig> {
    let mut config = match (&args.config, args.threshold) {
        (Some(path), _) => ReconcileConfig::load(path)?,
        (None, Some(threshold)) => ReconcileConfig::new(threshold)?,
        (None, None) => anyhow::bail!("--threshold is required when no --config is given"),
    };

    if let Some(threshold) = args.threshold {
        config.acceptance_threshold = threshold;
    }
    if args.many_to_one {
        config.exclusive_targets = false;
    }
    if args.longest_first {
        config.source_order = SourceOrder::LongestKeyFirst;
    }
    if let Some(metric) = args.metric {
        config.scoring.metric = metric.into();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.log_only);
    let start = Instant::now();

    let inputs: [&Path; 2] = [&args.sources, &args.targets];
    validate_output_path(&args.output, "json", &inputs)?;
    if let Some(path) = &args.csv {
        validate_output_path(path, "csv", &inputs)?;
    }
    if let Some(path) = &args.text {
        validate_output_path(path, "txt", &inputs)?;
    }

    let config = build_config(&args)?;
    let reconciler = Reconciler::new(config)?;

    println!("Loading sources: {:?}", args.sources);
    let sources = load_records(&args.sources, args.sources_query.as_deref())?;
    let keywords: Vec<String> = match &args.exclude {
        Some(list) => list.clone(),
        None => DEFAULT_EXCLUDED_KEYWORDS.iter().map(|k| k.to_string()).collect(),
    };
    let (sources, excluded) = exclude_by_keywords(sources, &keywords);
    println!("  {} sources ({} excluded by keyword)", sources.len(), excluded.len());

    println!("Loading targets: {:?}", args.targets);
    let targets = load_records(&args.targets, args.targets_query.as_deref())?;
    println!("  {} targets", targets.len());

    let mut progress = MatchProgress::new(sources.len() as u64);
    let report = reconciler.reconcile_with_progress(&sources, &targets, |source| progress.source_done(source));
    progress.finish();

    report.summary.log_phase(MATCH_PHASE);

    write_json_report(&report, &args.output)?;
    println!("Report written to {:?}", args.output);
    if let Some(path) = &args.csv {
        write_csv_matches(&report, path)?;
        println!("CSV written to {:?}", path);
    }
    if let Some(path) = &args.text {
        write_text_report(&report, path)?;
        println!("Text report written to {:?}", path);
    }

    let summary = &report.summary;
    println!("\n{:=<60}", "");
    println!("Reconciliation complete!");
    println!("  Matched: {} ({:.1}%)", summary.matched, summary.match_rate());
    for tier in &summary.tiers {
        println!("    {}: {}", tier.label, tier.count);
    }
    println!("  Unmatched sources: {}", summary.unmatched);
    println!("  Unclaimed targets: {}", summary.unclaimed_targets);
    println!("  Elapsed: {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    Ok(())
}
