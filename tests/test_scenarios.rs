
use anyhow::Result;
use std::io::Cursor;

use mapeval::aggregate::{AggregatedCell, CategoryAggregator};
use mapeval::category::{CanonicalTable, Category, Mode};
use mapeval::config::EvalConfig;
use mapeval::dataset::{ComparisonDatasetBuilder, ReportMetric};
use mapeval::error::EvalError;
use mapeval::pipeline::aggregate_stream;
use mapeval::reader::AlignmentReader;
use test_utils::{mapped_line, primary_lines, unmapped_line};

const SCENARIO_PERCENTS: [usize; 10] = [100, 100, 100, 99, 99, 97, 50, 0, 0, 0];

fn aggregate(lines: &[String]) -> Result<CategoryAggregator> {
    let mut agg = CategoryAggregator::new(
        Category::new("brca1", Mode::Simulated, "cactus"),
        &EvalConfig::default(),
    );
    aggregate_stream(&mut agg, AlignmentReader::new(Cursor::new(lines.join("\n"))))?;
    Ok(agg)
}

fn finalize(lines: &[String]) -> Result<AggregatedCell> {
    Ok(aggregate(lines)?.finalize()?)
}

/// Ten primaries at [1, 1, 1, .99, .99, .97, .5, 0, 0, 0] with threshold 0.98
#[test]
fn test_perfect_and_well_mapped() -> Result<()> {
    let cell = finalize(&primary_lines("r", &SCENARIO_PERCENTS))?;

    assert_eq!(cell.perfect_count, 3);
    assert_eq!(cell.total_primary_count, 10);
    assert_eq!(cell.well_mapped_fraction, 0.5);
    assert_eq!(cell.secondary_count, 0);
    assert_eq!(cell.not_well_multimapped_fraction, 1.0);
    Ok(())
}

/// Same reads, four with secondaries at [.99, .5, .97, 1.0]
#[test]
fn test_not_well_multimapped() -> Result<()> {
    let mut lines = primary_lines("r", &SCENARIO_PERCENTS);
    for (read, pct) in [(0, 99), (3, 50), (6, 97), (9, 100)] {
        lines.push(mapped_line(&format!("r{read}"), 100, pct, true));
    }

    let cell = finalize(&lines)?;
    assert_eq!(cell.secondary_count, 4);
    assert_eq!(cell.bad_secondary_count, 2);
    assert!((cell.not_well_multimapped_fraction - 0.8).abs() < 1e-12);
    // Secondaries never change the primary-side statistics
    assert_eq!(cell.perfect_count, 3);
    assert_eq!(cell.well_mapped_fraction, 0.5);
    Ok(())
}

/// A category with no primary records is omitted, not rendered as zero
#[test]
fn test_empty_category_omitted() -> Result<()> {
    let err = aggregate(&[])?.finalize().unwrap_err();
    assert!(matches!(err, EvalError::MissingCategoryData { .. }));

    let mut table = CanonicalTable::new();
    table.insert("cactus", "Cactus", "purple")?;
    table.insert("camel", "Camel", "blue")?;
    let config = EvalConfig::default();

    let results = vec![
        aggregate(&[])?.finalize(),
        {
            let mut agg = CategoryAggregator::new(
                Category::new("brca1", Mode::Simulated, "camel"),
                &config,
            );
            aggregate_stream(
                &mut agg,
                AlignmentReader::new(Cursor::new(primary_lines("c", &[100]).join("\n"))),
            )?;
            agg.finalize()
        },
    ];
    let cells: Vec<AggregatedCell> = results.into_iter().filter_map(|r| r.ok()).collect();

    let ds = ComparisonDatasetBuilder::new(&table, &config).build(
        "brca1",
        &cells,
        ReportMetric::PerfectCount,
        ReportMetric::PerfectCount.display_meta("brca1", Mode::Simulated, &config),
    )?;
    assert_eq!(ds.methods(), ["camel"]);
    Ok(())
}

/// Zero-length mapped read: excluded from every count, visible in diagnostics
#[test]
fn test_zero_length_read() -> Result<()> {
    let mut lines = primary_lines("r", &[100, 50]);
    lines.push(r#"{"name":"empty","sequence":"","score":5,"path":{"mapping":[]}}"#.to_string());

    let cell = finalize(&lines)?;
    assert_eq!(cell.total_primary_count, 2);
    assert_eq!(cell.perfect_count, 1);
    assert_eq!(cell.diagnostics.malformed_records, 1);
    assert_eq!(cell.diagnostics.first_malformed_index, Some(3));
    Ok(())
}

/// Edits that run past the end of the read: counted as malformed, nothing else
#[test]
fn test_overlong_edit_list_only_in_diagnostics() -> Result<()> {
    let mut lines = primary_lines("r", &[100, 50]);
    lines.push(
        r#"{"name":"over","sequence":"AAAAAAAAAA","score":8,"path":{"mapping":[{"edit":[{"from_length":8,"to_length":8},{"from_length":0,"to_length":5,"sequence":"AAAAA"}]}]}}"#
            .to_string(),
    );

    let cell = finalize(&lines)?;
    assert_eq!(cell.total_primary_count, 2);
    assert_eq!(cell.mapped_count, 2);
    assert_eq!(cell.primary_match_fractions, vec![1.0, 0.5]);
    assert_eq!(cell.diagnostics.malformed_records, 1);
    assert_eq!(cell.diagnostics.first_malformed_index, Some(3));
    Ok(())
}

#[test]
fn test_unmapped_reads_never_well_mapped() -> Result<()> {
    let mut lines = primary_lines("r", &[100, 100]);
    lines.push(unmapped_line("u1", 100));
    lines.push(unmapped_line("u2", 100));

    let cell = finalize(&lines)?;
    assert_eq!(cell.total_primary_count, 4);
    assert_eq!(cell.unmapped_count, 2);
    assert_eq!(cell.well_mapped_fraction, 0.5);
    assert_eq!(cell.primary_match_fractions.len(), 2);
    // Unmapped reads have no secondary, so they count as not well multimapped
    assert_eq!(cell.not_well_multimapped_fraction, 1.0);
    Ok(())
}

#[test]
fn test_secondaries_interleaved_with_other_reads() -> Result<()> {
    let lines = vec![
        mapped_line("a", 100, 100, false),
        mapped_line("b", 100, 100, false),
        mapped_line("a", 100, 10, true),
        mapped_line("c", 100, 100, true),
    ];

    let cell = finalize(&lines)?;
    // "c" has only a secondary: counted as an attempted read without a primary mapping
    assert_eq!(cell.total_primary_count, 3);
    assert_eq!(cell.unmapped_count, 1);
    assert_eq!(cell.secondary_count, 1);
    assert_eq!(cell.bad_secondary_count, 1);
    assert_eq!(cell.diagnostics.orphan_secondaries, 1);
    assert!((cell.not_well_multimapped_fraction - 1.0).abs() < 1e-12);
    Ok(())
}
