use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

use mapeval::category::CanonicalTable;
use mapeval::config::{CategoryPolicy, EvalConfig};
use mapeval::manifest::read_manifest;
use mapeval::pipeline::{evaluate, write_reports};
use mapeval::report::TsvReportEmitter;

/// Parse a number that may have metric suffix (k/K=1000, m/M=1e6, g/G=1e9)
fn parse_metric_number(s: &str) -> Result<u64, String> {
    if s.is_empty() {
        return Err("Empty string".to_string());
    }

    let (num_part, suffix) = match s.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&s[..s.len() - c.len_utf8()], Some(c)),
        _ => (s, None),
    };

    let base: f64 = num_part
        .parse()
        .map_err(|e| format!("Invalid number: {e}"))?;

    let multiplier = match suffix {
        Some('k') | Some('K') => 1000.0,
        Some('m') | Some('M') => 1_000_000.0,
        Some('g') | Some('G') => 1_000_000_000.0,
        Some(c) => {
            return Err(format!(
                "Unknown suffix '{c}'. Use k/K (1000), m/M (1e6), or g/G (1e9)"
            ))
        }
        None => 1.0,
    };

    let result = base * multiplier;

    if !(0.0..=u64::MAX as f64).contains(&result) {
        return Err(format!("Value {result} out of range"));
    }

    Ok(result as u64)
}

/// mapeval - Compare sequence-to-graph alignment quality across graphs
///
/// Reads the aligner's JSON output for every (region, mode, method) listed in
/// the manifest, computes per-read match fractions and per-category summary
/// statistics, and writes ordered comparison datasets for plotting.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Manifest TSV: region, mode, method, sample, alignment path[, runtime path]
    #[clap(value_name = "MANIFEST")]
    manifest: PathBuf,

    /// Method table TSV: method, label, color (built-in graph set if omitted)
    #[clap(short = 'm', long = "methods")]
    methods: Option<String>,

    /// Output directory for datasets and summary.tsv
    #[clap(short = 'o', long = "out-dir", default_value = "plots")]
    out_dir: PathBuf,

    /// Minimum match fraction for a read to count as well mapped
    #[clap(short = 'w', long = "well-mapped", default_value = "0.98")]
    well_mapped_threshold: f64,

    /// Axis ceiling for read-count plots of simulated reads (e.g. 100k)
    #[clap(long = "sim-reads", value_parser = parse_metric_number)]
    simulated_read_ceiling: Option<u64>,

    /// Methods missing from the method table: strict (error), permissive (append), drop
    #[clap(short = 'p', long = "category-policy", default_value = "strict")]
    category_policy: CategoryPolicy,

    /// Number of threads for parallel processing
    #[clap(short = 't', long = "threads", default_value = "8")]
    threads: usize,

    /// Increase logging (-v info, -vv debug)
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbosity: u8,

    /// Only log errors
    #[clap(short = 'q', long = "quiet", conflicts_with = "verbosity")]
    quiet: bool,
}

fn init_logging(args: &Args) {
    let level = if args.quiet {
        LevelFilter::Error
    } else {
        match args.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    log::info!("Running {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = EvalConfig::default()
        .with_threshold(args.well_mapped_threshold)
        .with_simulated_read_ceiling(args.simulated_read_ceiling)
        .with_policy(args.category_policy);
    config.validate()?;

    let table = match &args.methods {
        Some(path) => CanonicalTable::from_tsv_file(path)?,
        None => CanonicalTable::builtin(),
    };

    // Set up rayon thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()?;

    let inputs = read_manifest(&args.manifest)?;
    if inputs.is_empty() {
        anyhow::bail!("No alignment inputs in {}", args.manifest.display());
    }
    log::info!("Evaluating {} alignment inputs", inputs.len());

    let evaluation = evaluate(inputs, &config);
    let summary = write_reports(
        &evaluation.cells,
        &table,
        &config,
        &TsvReportEmitter,
        &args.out_dir,
    )?;

    if !evaluation.empty.is_empty() {
        log::info!(
            "{} categories had no data and were omitted",
            evaluation.empty.len()
        );
    }

    if !evaluation.failed.is_empty() || !summary.failed.is_empty() {
        anyhow::bail!(
            "{} categories could not be read and {} datasets could not be built",
            evaluation.failed.len(),
            summary.failed.len()
        );
    }

    log::info!("{} end", env!("CARGO_PKG_NAME"));
    Ok(())
}
