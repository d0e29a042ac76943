/// Output side of the evaluation: datasets for an external plotter and a
/// flat summary table of every finalized cell
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::aggregate::{AggregatedCell, SampleSummary};
use crate::category::{strip_region_tokens, CanonicalTable};
use crate::dataset::ComparisonDataset;

/// Boundary to a chart renderer
pub trait ReportEmitter: Sync {
    /// Render `dataset` to `output_path` (without extension)
    fn render(&self, dataset: &ComparisonDataset, output_path: &Path) -> Result<()>;
}

/// Writes a two-column TSV (`label<TAB>value`) and a JSON plot description
/// next to it. Sample sets produce one row per sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct TsvReportEmitter;

#[derive(Serialize)]
struct PlotSpec<'a> {
    title: &'a str,
    x_label: &'a str,
    y_label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value_max: Option<f64>,
    rotate_x_labels: bool,
    data: String,
    order: Vec<&'a str>,
    colors: IndexMap<&'a str, &'a str>,
}

fn with_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

impl TsvReportEmitter {
    pub fn write_tsv<W: Write>(dataset: &ComparisonDataset, out: &mut W) -> Result<()> {
        for entry in &dataset.entries {
            for value in entry.value.values() {
                writeln!(out, "{}\t{}", entry.label, value)?;
            }
        }
        Ok(())
    }
}

impl ReportEmitter for TsvReportEmitter {
    fn render(&self, dataset: &ComparisonDataset, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let tsv_path = with_extension(output_path, "tsv");
        let mut out = BufWriter::new(
            File::create(&tsv_path)
                .with_context(|| format!("Failed to create {}", tsv_path.display()))?,
        );
        Self::write_tsv(dataset, &mut out)?;
        out.flush()?;

        let meta = &dataset.meta;
        let spec = PlotSpec {
            title: &meta.title,
            x_label: &meta.x_label,
            y_label: &meta.y_label,
            value_min: meta.value_min,
            value_max: meta.value_max,
            rotate_x_labels: meta.rotate_x_labels,
            data: tsv_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            order: dataset.labels(),
            colors: dataset
                .entries
                .iter()
                .map(|e| (e.label.as_str(), e.color.as_str()))
                .collect(),
        };

        let json_path = with_extension(output_path, "json");
        let file = File::create(&json_path)
            .with_context(|| format!("Failed to create {}", json_path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &spec)
            .with_context(|| format!("Failed to write {}", json_path.display()))?;
        writer.flush()?;

        log::debug!(
            "Wrote {} entries to {}",
            dataset.entries.len(),
            tsv_path.display()
        );
        Ok(())
    }
}

const SUMMARY_HEADER: &str = "#region\tmode\tmethod\tlabel\treads\tmapped\tunmapped\tperfect\twell_mapped\tsecondary\tbad_secondary\twell_mapped_fraction\tnot_well_multimapped_fraction\tmedian_match_fraction\tmedian_runtime\tskipped_records";

/// One row per cell, in the order given
pub fn write_summary<W: Write>(
    cells: &[AggregatedCell],
    table: &CanonicalTable,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "{SUMMARY_HEADER}")?;
    for cell in cells {
        let cat = &cell.category;
        let canonical = strip_region_tokens(&cat.method, &cat.region);
        let label = table
            .get(&canonical)
            .map(|s| s.label.as_str())
            .unwrap_or(canonical.as_str());
        let median = |s: Option<SampleSummary>| {
            s.map(|s| format!("{:.4}", s.median))
                .unwrap_or_else(|| "NA".to_string())
        };

        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.4}\t{:.4}\t{}\t{}\t{}",
            cat.region,
            cat.mode,
            cat.method,
            label,
            cell.total_primary_count,
            cell.mapped_count,
            cell.unmapped_count,
            cell.perfect_count,
            cell.well_mapped_count,
            cell.secondary_count,
            cell.bad_secondary_count,
            cell.well_mapped_fraction,
            cell.not_well_multimapped_fraction,
            median(cell.match_fraction_summary()),
            median(cell.runtime_summary()),
            cell.diagnostics.skipped_records(),
        )?;
    }
    Ok(())
}
