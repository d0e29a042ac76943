/// Evaluation pipeline: aggregate every cell in parallel, then merge the
/// finalized cells into per-(region, mode) comparison reports
use anyhow::{Context, Result};
use indexmap::IndexMap;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::aggregate::{AggregatedCell, CategoryAggregator};
use crate::category::{CanonicalTable, Category, Mode};
use crate::classify::{classify_group, group_reads, EvaluatedRecord};
use crate::config::EvalConfig;
use crate::dataset::{ComparisonDatasetBuilder, ReportMetric};
use crate::error::EvalError;
use crate::manifest::{group_by_category, read_runtime_samples, CellInput};
use crate::reader::{read_alignment_file, AlignmentReader};
use crate::report::{write_summary, ReportEmitter};

/// Feed one alignment stream into an aggregator.
///
/// Unparseable lines are counted as malformed; I/O errors abort the stream.
/// Records are evaluated as they are read and only their outcome is kept
/// until the stream ends, since a read's records may be anywhere in it.
pub fn aggregate_stream<R: Read>(
    aggregator: &mut CategoryAggregator,
    reader: AlignmentReader<R>,
) -> Result<()> {
    let mut records = Vec::new();
    for item in reader {
        let (index, parsed) = item?;
        match parsed {
            Ok(record) => records.push(EvaluatedRecord::new(index, record)),
            Err(e) => aggregator.record_malformed(&e),
        }
    }

    for group in group_reads(records) {
        aggregator.ingest(&classify_group(group));
    }
    Ok(())
}

/// Aggregate all inputs of one category. Missing alignment files leave the
/// cell without records; they are not an error here.
pub fn aggregate_cell(
    category: &Category,
    inputs: &[CellInput],
    config: &EvalConfig,
) -> Result<CategoryAggregator> {
    let mut aggregator = CategoryAggregator::new(category.clone(), config);

    for input in inputs {
        if !input.path.exists() {
            log::warn!(
                "{}: alignment file {} for sample {} is missing, skipping",
                category,
                input.path.display(),
                input.sample
            );
        } else {
            let reader = read_alignment_file(&input.path)?;
            aggregate_stream(&mut aggregator, reader)
                .with_context(|| format!("{}: failed reading {}", category, input.path.display()))?;
        }

        if let Some(runtime_path) = &input.runtime_path {
            if runtime_path.exists() {
                let file = File::open(runtime_path)
                    .with_context(|| format!("Failed to open {}", runtime_path.display()))?;
                let samples = read_runtime_samples(BufReader::new(file))
                    .with_context(|| format!("{}: {}", category, runtime_path.display()))?;
                aggregator.add_runtime_samples(samples);
            } else {
                log::warn!(
                    "{}: runtime file {} is missing",
                    category,
                    runtime_path.display()
                );
            }
        }
    }

    let diagnostics = aggregator.diagnostics();
    if diagnostics.malformed_records > 0 {
        log::warn!(
            "{}: skipped {} malformed records (first at record {})",
            category,
            diagnostics.malformed_records,
            diagnostics.first_malformed_index.unwrap_or(0)
        );
    }

    Ok(aggregator)
}

/// Result of evaluating every cell of a manifest
#[derive(Debug, Default)]
pub struct Evaluation {
    /// Finalized cells in manifest order
    pub cells: Vec<AggregatedCell>,
    /// Categories with no primary records
    pub empty: Vec<Category>,
    /// Categories whose input could not be read completely
    pub failed: Vec<(Category, anyhow::Error)>,
}

/// Aggregate every category independently on the rayon pool
pub fn evaluate(inputs: Vec<CellInput>, config: &EvalConfig) -> Evaluation {
    let grouped: Vec<(Category, Vec<CellInput>)> = group_by_category(inputs).into_iter().collect();

    let results: Vec<(Category, Result<AggregatedCell, anyhow::Error>)> = grouped
        .into_par_iter()
        .map(|(category, inputs)| {
            let result = aggregate_cell(&category, &inputs, config)
                .and_then(|agg| agg.finalize().map_err(anyhow::Error::from));
            (category, result)
        })
        .collect();

    let mut evaluation = Evaluation::default();
    for (category, result) in results {
        match result {
            Ok(cell) => {
                log::info!(
                    "{}: {} reads, {} mapped, {} perfect, {:.3} well mapped",
                    category,
                    cell.total_primary_count,
                    cell.mapped_count,
                    cell.perfect_count,
                    cell.well_mapped_fraction
                );
                evaluation.cells.push(cell);
            }
            Err(e) => match e.downcast_ref::<EvalError>() {
                Some(EvalError::MissingCategoryData { .. }) => {
                    log::info!("{category}: no data, omitted from reports");
                    evaluation.empty.push(category);
                }
                _ => {
                    log::error!("{category}: {e:#}");
                    evaluation.failed.push((category, e));
                }
            },
        }
    }

    evaluation
}

/// Outcome of report generation
#[derive(Debug, Default)]
pub struct ReportSummary {
    pub written: Vec<PathBuf>,
    /// Datasets abandoned because of configuration errors
    pub failed: Vec<(String, EvalError)>,
}

/// Output path (without extension) of one dataset
pub fn report_path(out_dir: &Path, region: &str, mode: Mode, metric: ReportMetric) -> PathBuf {
    out_dir.join(region).join(mode.as_str()).join(metric.name())
}

/// Build and emit one dataset per metric for every (region, mode) pair,
/// plus `summary.tsv` over all cells.
pub fn write_reports(
    cells: &[AggregatedCell],
    table: &CanonicalTable,
    config: &EvalConfig,
    emitter: &dyn ReportEmitter,
    out_dir: &Path,
) -> Result<ReportSummary> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let mut by_panel: IndexMap<(String, Mode), Vec<&AggregatedCell>> = IndexMap::new();
    for cell in cells {
        by_panel
            .entry((cell.category.region.clone(), cell.category.mode))
            .or_default()
            .push(cell);
    }

    let builder = ComparisonDatasetBuilder::new(table, config);
    let mut summary = ReportSummary::default();

    for ((region, mode), panel) in &by_panel {
        for metric in ReportMetric::ALL {
            let meta = metric.display_meta(region, *mode, config);
            let dataset = match builder.build(region, panel.iter().copied(), metric, meta) {
                Ok(dataset) => dataset,
                Err(e) => {
                    let name = format!("{}/{}/{}", region, mode, metric.name());
                    log::error!("Skipping dataset {name}: {e}");
                    summary.failed.push((name, e));
                    continue;
                }
            };
            if dataset.is_empty() {
                log::debug!("No data for {}/{}/{}", region, mode, metric.name());
                continue;
            }

            let path = report_path(out_dir, region, *mode, metric);
            emitter.render(&dataset, &path)?;
            summary.written.push(path);
        }
    }

    let summary_path = out_dir.join("summary.tsv");
    let mut out = BufWriter::new(
        File::create(&summary_path)
            .with_context(|| format!("Failed to create {}", summary_path.display()))?,
    );
    write_summary(cells, table, &mut out)?;
    out.flush()?;

    log::info!(
        "Wrote {} datasets and {}",
        summary.written.len(),
        summary_path.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn line(name: &str, len: usize, matched: usize, secondary: bool) -> String {
        let mismatch = len - matched;
        let mut edits = vec![format!(r#"{{"from_length":{matched},"to_length":{matched}}}"#)];
        if mismatch > 0 {
            edits.push(format!(
                r#"{{"from_length":{mismatch},"to_length":{mismatch},"sequence":"{}"}}"#,
                "A".repeat(mismatch)
            ));
        }
        format!(
            r#"{{"name":"{name}","sequence":"{}","score":10,"is_secondary":{secondary},"path":{{"mapping":[{{"edit":[{}]}}]}}}}"#,
            "A".repeat(len),
            edits.join(",")
        )
    }

    #[test]
    fn test_aggregate_stream_counts_bad_lines() {
        let data = [
            line("r1", 100, 100, false),
            "{broken".to_string(),
            line("r2", 100, 90, false),
            line("r2", 100, 40, true),
            r#"{"name":"r3","sequence":"ACGT"}"#.to_string(),
        ]
        .join("\n");

        let mut agg =
            CategoryAggregator::new(Category::new("brca1", Mode::Real, "cactus"), &EvalConfig::default());
        aggregate_stream(&mut agg, AlignmentReader::new(Cursor::new(data))).unwrap();
        let cell = agg.finalize().unwrap();

        assert_eq!(cell.total_primary_count, 3);
        assert_eq!(cell.mapped_count, 2);
        assert_eq!(cell.perfect_count, 1);
        assert_eq!(cell.secondary_count, 1);
        assert_eq!(cell.bad_secondary_count, 1);
        assert_eq!(cell.diagnostics.malformed_records, 1);
        assert_eq!(cell.diagnostics.first_malformed_index, Some(2));
        // r1 and r3 have no secondary, r2's secondary is bad
        assert!((cell.not_well_multimapped_fraction - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_file_yields_empty_cell() {
        let category = Category::new("brca1", Mode::Real, "cactus");
        let inputs = vec![CellInput {
            category: category.clone(),
            sample: "s".into(),
            path: PathBuf::from("/nonexistent/cactus-brca1.json"),
            runtime_path: None,
        }];
        let agg = aggregate_cell(&category, &inputs, &EvalConfig::default()).unwrap();
        assert_eq!(agg.total_primary_count(), 0);

        let evaluation = evaluate(inputs, &EvalConfig::default());
        assert!(evaluation.cells.is_empty());
        assert_eq!(evaluation.empty, vec![category]);
        assert!(evaluation.failed.is_empty());
    }

    #[test]
    fn test_report_path_layout() {
        let p = report_path(Path::new("out"), "brca1", Mode::Simulated, ReportMetric::Runtime);
        assert_eq!(p, PathBuf::from("out/brca1/simulated/runtime"));
    }
}
