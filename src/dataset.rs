/// Cross-method comparison datasets
///
/// Merges finalized cells of one region and mode into an ordered, labeled
/// and colored series, following the canonical method table.
use serde::Serialize;
use std::collections::HashMap;

use crate::aggregate::AggregatedCell;
use crate::category::{strip_region_tokens, CanonicalTable, Mode};
use crate::config::{CategoryPolicy, EvalConfig};
use crate::error::{EvalError, EvalResult};

/// Statistic plotted by a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportMetric {
    PerfectCount,
    MappedCount,
    WellMappedFraction,
    NotWellMultimappedFraction,
    MatchFraction,
    Runtime,
}

impl ReportMetric {
    pub const ALL: [ReportMetric; 6] = [
        ReportMetric::PerfectCount,
        ReportMetric::MappedCount,
        ReportMetric::WellMappedFraction,
        ReportMetric::NotWellMultimappedFraction,
        ReportMetric::MatchFraction,
        ReportMetric::Runtime,
    ];

    /// Stable identifier, used in output file names
    pub fn name(&self) -> &'static str {
        match self {
            ReportMetric::PerfectCount => "perfect_count",
            ReportMetric::MappedCount => "mapped_count",
            ReportMetric::WellMappedFraction => "well_mapped_fraction",
            ReportMetric::NotWellMultimappedFraction => "not_well_multimapped_fraction",
            ReportMetric::MatchFraction => "match_fraction",
            ReportMetric::Runtime => "runtime",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ReportMetric::PerfectCount => "Perfectly mapped reads",
            ReportMetric::MappedCount => "Mapped reads",
            ReportMetric::WellMappedFraction => "Fraction of reads well mapped",
            ReportMetric::NotWellMultimappedFraction => "Fraction of reads not well multimapped",
            ReportMetric::MatchFraction => "Match fraction per read",
            ReportMetric::Runtime => "Alignment runtime",
        }
    }

    fn y_label(&self) -> &'static str {
        match self {
            ReportMetric::PerfectCount | ReportMetric::MappedCount => "Reads",
            ReportMetric::WellMappedFraction
            | ReportMetric::NotWellMultimappedFraction
            | ReportMetric::MatchFraction => "Fraction",
            ReportMetric::Runtime => "Seconds",
        }
    }

    pub fn is_count(&self) -> bool {
        matches!(self, ReportMetric::PerfectCount | ReportMetric::MappedCount)
    }

    pub fn is_fraction(&self) -> bool {
        matches!(
            self,
            ReportMetric::WellMappedFraction
                | ReportMetric::NotWellMultimappedFraction
                | ReportMetric::MatchFraction
        )
    }

    /// Value of this metric for a cell; `None` when the cell has no data point
    pub fn value(&self, cell: &AggregatedCell) -> Option<SeriesValue> {
        match self {
            ReportMetric::PerfectCount => Some(SeriesValue::Scalar(cell.perfect_count as f64)),
            ReportMetric::MappedCount => Some(SeriesValue::Scalar(cell.mapped_count as f64)),
            ReportMetric::WellMappedFraction => Some(SeriesValue::Scalar(cell.well_mapped_fraction)),
            ReportMetric::NotWellMultimappedFraction => {
                Some(SeriesValue::Scalar(cell.not_well_multimapped_fraction))
            }
            ReportMetric::MatchFraction => non_empty(&cell.primary_match_fractions),
            ReportMetric::Runtime => non_empty(&cell.runtime_samples),
        }
    }

    pub fn display_meta(&self, region: &str, mode: Mode, config: &EvalConfig) -> DisplayMeta {
        let (value_min, value_max) = if self.is_fraction() {
            (Some(0.0), Some(1.0))
        } else if self.is_count() {
            let ceiling = match mode {
                Mode::Simulated => config.simulated_read_ceiling.map(|c| c as f64),
                Mode::Real => None,
            };
            (Some(0.0), ceiling)
        } else {
            (Some(0.0), None)
        };

        DisplayMeta {
            title: format!("{} in {} ({} reads)", self.title(), region.to_uppercase(), mode),
            x_label: "Graph".to_string(),
            y_label: self.y_label().to_string(),
            value_min,
            value_max,
            rotate_x_labels: true,
        }
    }
}

fn non_empty(samples: &[f64]) -> Option<SeriesValue> {
    if samples.is_empty() {
        None
    } else {
        Some(SeriesValue::Samples(samples.to_vec()))
    }
}

/// A single point or a sample set for box/violin style plots
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeriesValue {
    Scalar(f64),
    Samples(Vec<f64>),
}

impl SeriesValue {
    pub fn values(&self) -> &[f64] {
        match self {
            SeriesValue::Scalar(v) => std::slice::from_ref(v),
            SeriesValue::Samples(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayMeta {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub value_min: Option<f64>,
    pub value_max: Option<f64>,
    pub rotate_x_labels: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetEntry {
    /// Canonical method id, region tokens removed
    pub method: String,
    pub label: String,
    pub color: String,
    pub value: SeriesValue,
}

/// Ordered series ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonDataset {
    pub entries: Vec<DatasetEntry>,
    pub meta: DisplayMeta,
}

impl ComparisonDataset {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn methods(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.method.as_str()).collect()
    }
}

/// Builds comparison datasets against a canonical table
pub struct ComparisonDatasetBuilder<'a> {
    table: &'a CanonicalTable,
    config: &'a EvalConfig,
}

impl<'a> ComparisonDatasetBuilder<'a> {
    pub fn new(table: &'a CanonicalTable, config: &'a EvalConfig) -> Self {
        ComparisonDatasetBuilder { table, config }
    }

    /// Build one dataset for `metric` from the finalized cells of one region.
    ///
    /// Only cells with a value appear, in canonical order. Methods unknown to
    /// the table are handled per the configured `CategoryPolicy`.
    pub fn build<'c, I>(
        &self,
        region: &str,
        cells: I,
        metric: ReportMetric,
        meta: DisplayMeta,
    ) -> EvalResult<ComparisonDataset>
    where
        I: IntoIterator<Item = &'c AggregatedCell>,
    {
        // (sort key, entry); unknown methods sort after the table in arrival order
        let mut keyed: Vec<(usize, DatasetEntry)> = Vec::new();
        let mut seen: HashMap<String, String> = HashMap::new();
        let mut appended = 0usize;

        for cell in cells {
            let raw = &cell.category.method;
            let canonical = strip_region_tokens(raw, region);

            let (key, label, color) = match self.table.get(&canonical) {
                Some(style) => (
                    self.table.position(&canonical).unwrap_or(usize::MAX),
                    style.label.clone(),
                    style.color.clone(),
                ),
                None => match self.config.category_policy {
                    CategoryPolicy::Strict => {
                        return Err(EvalError::Configuration {
                            method: raw.clone(),
                            region: region.to_string(),
                        })
                    }
                    CategoryPolicy::Drop => {
                        log::warn!(
                            "Dropping method '{raw}' in region {region}: not in the method table"
                        );
                        continue;
                    }
                    CategoryPolicy::Permissive => {
                        log::warn!(
                            "Method '{raw}' in region {region} is not in the method table; appending with default style"
                        );
                        appended += 1;
                        (
                            self.table.len() + appended,
                            canonical.clone(),
                            self.config.default_color.clone(),
                        )
                    }
                },
            };

            // Only methods that survive the policy can collide
            if let Some(previous) = seen.insert(canonical.clone(), raw.clone()) {
                return Err(EvalError::InvalidConfig(format!(
                    "methods '{previous}' and '{raw}' both resolve to '{canonical}' in region {region}"
                )));
            }

            let Some(value) = metric.value(cell) else {
                continue;
            };

            keyed.push((
                key,
                DatasetEntry {
                    method: canonical,
                    label,
                    color,
                    value,
                },
            ));
        }

        keyed.sort_by_key(|(key, _)| *key);

        Ok(ComparisonDataset {
            entries: keyed.into_iter().map(|(_, e)| e).collect(),
            meta,
        })
    }
}
