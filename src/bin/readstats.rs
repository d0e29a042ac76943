/// readstats - Per-read statistics for graph alignment output (JSON lines)
///
/// Prints mapped, perfect, well-mapped and multimapping counts for one
/// alignment file, or a before/after comparison of two.
use anyhow::Result;
use clap::Parser;

use mapeval::aggregate::{AggregatedCell, CategoryAggregator};
use mapeval::category::{Category, Mode};
use mapeval::config::{EvalConfig, DEFAULT_WELL_MAPPED_THRESHOLD};
use mapeval::pipeline::aggregate_stream;
use mapeval::reader::read_alignment_file;

#[derive(Parser)]
#[clap(
    name = "readstats",
    about = "Per-read statistics for graph alignment output (JSON lines)"
)]
struct Args {
    /// First alignment file
    file1: String,

    /// Optional second file for comparison
    file2: Option<String>,

    /// Minimum match fraction for a read to count as well mapped
    #[clap(short = 'w', long = "well-mapped", default_value_t = DEFAULT_WELL_MAPPED_THRESHOLD)]
    well_mapped_threshold: f64,

    /// Show diagnostics for skipped records
    #[clap(short = 'd', long)]
    detailed: bool,
}

fn collect_stats(path: &str, config: &EvalConfig) -> Result<AggregatedCell> {
    let mut aggregator = CategoryAggregator::new(Category::new("-", Mode::Real, path), config);
    aggregate_stream(&mut aggregator, read_alignment_file(path)?)?;
    Ok(aggregator.finalize()?)
}

fn print_stats(path: &str, cell: &AggregatedCell, detailed: bool) {
    println!("\nStatistics for {path}:");
    println!("{}", "=".repeat(60));
    println!("Reads:                 {:>12}", format_number(cell.total_primary_count));
    println!("Mapped:                {:>12}", format_number(cell.mapped_count));
    println!("Unmapped:              {:>12}", format_number(cell.unmapped_count));
    println!("Perfect:               {:>12}", format_number(cell.perfect_count));
    println!("Well mapped:           {:>12}", format_number(cell.well_mapped_count));
    println!("Secondary:             {:>12}", format_number(cell.secondary_count));
    println!("Bad secondary:         {:>12}", format_number(cell.bad_secondary_count));
    println!("Mapped fraction:       {:>11.1}%", cell.mapped_fraction * 100.0);
    println!("Well mapped fraction:  {:>11.1}%", cell.well_mapped_fraction * 100.0);
    println!(
        "Not well multimapped:  {:>11.1}%",
        cell.not_well_multimapped_fraction * 100.0
    );
    if let Some(summary) = cell.match_fraction_summary() {
        println!("Median match fraction: {:>12.4}", summary.median);
    }

    if detailed {
        let d = &cell.diagnostics;
        println!("\nSkipped records:");
        println!("{}", "-".repeat(60));
        println!("Malformed:             {:>12}", format_number(d.malformed_records));
        if let Some(index) = d.first_malformed_index {
            println!("First malformed:       {:>12}", index);
        }
        println!("Duplicate primaries:   {:>12}", format_number(d.duplicate_primaries));
        println!("Orphan secondaries:    {:>12}", format_number(d.orphan_secondaries));
        println!("Unmapped secondaries:  {:>12}", format_number(d.unmapped_secondaries));
        println!("Extra secondaries:     {:>12}", format_number(d.extra_secondaries));
        if d.excess_secondaries > 0 {
            println!("Excess secondaries:    {:>12}", format_number(d.excess_secondaries));
        }
    }
}

fn compare_stats(file1: &str, file2: &str, a: &AggregatedCell, b: &AggregatedCell) {
    println!("\nComparison: {file1} vs {file2}");
    println!("{}", "=".repeat(60));

    print_comparison("Reads", a.total_primary_count, b.total_primary_count);
    print_comparison("Mapped", a.mapped_count, b.mapped_count);
    print_comparison("Perfect", a.perfect_count, b.perfect_count);
    print_comparison("Well mapped", a.well_mapped_count, b.well_mapped_count);
    print_comparison("Secondary", a.secondary_count, b.secondary_count);

    print_fraction_change(
        "Well mapped fraction",
        file1,
        file2,
        a.well_mapped_fraction,
        b.well_mapped_fraction,
    );
    print_fraction_change(
        "Not well multimapped fraction",
        file1,
        file2,
        a.not_well_multimapped_fraction,
        b.not_well_multimapped_fraction,
    );
}

fn print_fraction_change(label: &str, file1: &str, file2: &str, v1: f64, v2: f64) {
    println!("\n{label}:");
    println!("  {:30} {:>11.1}%", file1, v1 * 100.0);
    println!("  {:30} {:>11.1}%", file2, v2 * 100.0);
    println!("  {:30} {:>+10.1}%", "Change", (v2 - v1) * 100.0);
}

fn print_comparison(label: &str, before: usize, after: usize) {
    let change = after as i64 - before as i64;
    let relative = match before {
        0 => 0.0,
        n => change as f64 * 100.0 / n as f64,
    };

    println!("\n{label}:");
    for (name, count) in [("Before", before), ("After", after)] {
        println!("  {:30} {:>12}", name, format_number(count));
    }
    println!(
        "  {:30} {:>12} ({:+.1}%)",
        "Change",
        format_signed(change),
        relative
    );
}

/// Thousands-separated count, e.g. 1,234,567
fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let groups: Vec<&str> = digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .collect();
    groups.join(",")
}

fn format_signed(n: i64) -> String {
    let sign = if n < 0 { '-' } else { '+' };
    format!("{sign}{}", format_number(n.unsigned_abs() as usize))
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let config = EvalConfig::default().with_threshold(args.well_mapped_threshold);
    config.validate()?;

    let stats1 = collect_stats(&args.file1, &config)?;

    if let Some(file2) = args.file2 {
        let stats2 = collect_stats(&file2, &config)?;
        compare_stats(&args.file1, &file2, &stats1, &stats2);
    } else {
        print_stats(&args.file1, &stats1, args.detailed);
    }

    Ok(())
}
