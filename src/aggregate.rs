/// Per-category reduction of read outcomes into summary statistics
///
/// One `CategoryAggregator` is owned by the task that reads a cell's
/// records. `finalize` consumes it, so a cell is published whole or not at
/// all, and the resulting `AggregatedCell` is immutable.
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::category::Category;
use crate::classify::{ClassifiedRead, Role};
use crate::config::EvalConfig;
use crate::error::{EvalError, EvalResult};
use crate::metric::ReadOutcome;

/// Counts of records that were read but left out of the statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub malformed_records: usize,
    /// Input index of the first malformed record, for locating it
    pub first_malformed_index: Option<usize>,
    pub duplicate_primaries: usize,
    pub orphan_secondaries: usize,
    pub unmapped_secondaries: usize,
    pub extra_secondaries: usize,
    /// Secondaries beyond one per attempted read; only raw `record` calls
    /// can produce these, and the not-well-multimapped numerator is capped
    pub excess_secondaries: usize,
}

impl Diagnostics {
    pub fn skipped_records(&self) -> usize {
        self.malformed_records
            + self.duplicate_primaries
            + self.orphan_secondaries
            + self.unmapped_secondaries
            + self.extra_secondaries
    }
}

/// Count, range, mean and median of a sample series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl SampleSummary {
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted: Vec<OrderedFloat<f64>> = samples.iter().copied().map(OrderedFloat).collect();
        sorted.sort();

        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2].0
        } else {
            (sorted[n / 2 - 1].0 + sorted[n / 2].0) / 2.0
        };

        Some(SampleSummary {
            count: n,
            min: sorted[0].0,
            max: sorted[n - 1].0,
            mean: samples.iter().sum::<f64>() / n as f64,
            median,
        })
    }
}

/// Finalized statistics of one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedCell {
    pub category: Category,
    /// Reads attempted: mapped plus unmapped primaries
    pub total_primary_count: usize,
    pub mapped_count: usize,
    pub unmapped_count: usize,
    pub perfect_count: usize,
    pub well_mapped_count: usize,
    pub secondary_count: usize,
    pub bad_secondary_count: usize,
    pub well_mapped_fraction: f64,
    pub not_well_multimapped_fraction: f64,
    pub perfect_fraction: f64,
    pub mapped_fraction: f64,
    pub primary_match_fractions: Vec<f64>,
    pub secondary_match_fractions: Vec<f64>,
    pub runtime_samples: Vec<f64>,
    pub diagnostics: Diagnostics,
}

impl AggregatedCell {
    pub fn match_fraction_summary(&self) -> Option<SampleSummary> {
        SampleSummary::from_samples(&self.primary_match_fractions)
    }

    pub fn runtime_summary(&self) -> Option<SampleSummary> {
        SampleSummary::from_samples(&self.runtime_samples)
    }
}

/// Accumulates outcomes for one (region, mode, method) cell
#[derive(Debug, Clone)]
pub struct CategoryAggregator {
    category: Category,
    threshold: f64,
    mapped_count: usize,
    unmapped_count: usize,
    perfect_count: usize,
    well_mapped_count: usize,
    secondary_count: usize,
    bad_secondary_count: usize,
    primary_match_fractions: Vec<f64>,
    secondary_match_fractions: Vec<f64>,
    runtime_samples: Vec<f64>,
    diagnostics: Diagnostics,
}

impl CategoryAggregator {
    pub fn new(category: Category, config: &EvalConfig) -> Self {
        CategoryAggregator {
            category,
            threshold: config.well_mapped_threshold,
            mapped_count: 0,
            unmapped_count: 0,
            perfect_count: 0,
            well_mapped_count: 0,
            secondary_count: 0,
            bad_secondary_count: 0,
            primary_match_fractions: Vec::new(),
            secondary_match_fractions: Vec::new(),
            runtime_samples: Vec::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    /// Ingest one classified outcome.
    ///
    /// An unmapped secondary carries no multimapping evidence and is only
    /// counted in diagnostics.
    pub fn record(&mut self, outcome: ReadOutcome, role: Role) {
        match (role, outcome) {
            (Role::Primary, ReadOutcome::Mapped(metric)) => {
                self.mapped_count += 1;
                if metric.is_perfect {
                    self.perfect_count += 1;
                }
                if metric.is_well_mapped(self.threshold) {
                    self.well_mapped_count += 1;
                }
                self.primary_match_fractions.push(metric.match_fraction);
            }
            (Role::Primary, ReadOutcome::Unmapped) => {
                self.unmapped_count += 1;
            }
            (Role::Secondary, ReadOutcome::Mapped(metric)) => {
                self.secondary_count += 1;
                if !metric.is_well_mapped(self.threshold) {
                    self.bad_secondary_count += 1;
                }
                self.secondary_match_fractions.push(metric.match_fraction);
            }
            (Role::Secondary, ReadOutcome::Unmapped) => {
                self.diagnostics.unmapped_secondaries += 1;
            }
        }
    }

    /// Count a record that was skipped because it could not be evaluated
    pub fn record_malformed(&mut self, error: &EvalError) {
        self.diagnostics.malformed_records += 1;
        if let EvalError::MalformedRecord { record_index, .. } | EvalError::Json { record_index, .. } =
            error
        {
            let first = self.diagnostics.first_malformed_index.get_or_insert(*record_index);
            *first = (*first).min(*record_index);
        }
        log::debug!("{}: skipping record: {}", self.category, error);
    }

    /// Ingest a whole classified read, including its diagnostics
    pub fn ingest(&mut self, read: &ClassifiedRead) {
        for (outcome, role) in read.outcomes() {
            self.record(outcome, role);
        }
        for error in &read.issues.malformed {
            self.record_malformed(error);
        }
        let d = &mut self.diagnostics;
        d.duplicate_primaries += read.issues.duplicate_primaries;
        d.orphan_secondaries += read.issues.orphan_secondaries;
        d.unmapped_secondaries += read.issues.unmapped_secondaries;
        d.extra_secondaries += read.issues.extra_secondaries;
    }

    pub fn add_runtime_samples<I: IntoIterator<Item = f64>>(&mut self, samples: I) {
        self.runtime_samples.extend(samples);
    }

    pub fn total_primary_count(&self) -> usize {
        self.mapped_count + self.unmapped_count
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Compute fractions and freeze the cell.
    ///
    /// Fails with `MissingCategoryData` when no primary record was seen, since
    /// every fraction is over the number of attempted reads.
    pub fn finalize(self) -> EvalResult<AggregatedCell> {
        let total = self.total_primary_count();
        if total == 0 {
            return Err(EvalError::MissingCategoryData {
                category: self.category,
            });
        }

        let t = total as f64;
        let mut diagnostics = self.diagnostics;
        if self.secondary_count > total {
            diagnostics.excess_secondaries = self.secondary_count - total;
            log::warn!(
                "{}: {} secondaries for {} reads; not-well-multimapped fraction capped at 1",
                self.category,
                self.secondary_count,
                total
            );
        }

        // Reads without a secondary count toward the numerator
        let single_mappers = total.saturating_sub(self.secondary_count);
        let numerator = (self.bad_secondary_count + single_mappers).min(total);
        let not_well_multimapped = numerator as f64 / t;

        Ok(AggregatedCell {
            total_primary_count: total,
            mapped_count: self.mapped_count,
            unmapped_count: self.unmapped_count,
            perfect_count: self.perfect_count,
            well_mapped_count: self.well_mapped_count,
            secondary_count: self.secondary_count,
            bad_secondary_count: self.bad_secondary_count,
            well_mapped_fraction: self.well_mapped_count as f64 / t,
            not_well_multimapped_fraction: not_well_multimapped,
            perfect_fraction: self.perfect_count as f64 / t,
            mapped_fraction: self.mapped_count as f64 / t,
            primary_match_fractions: self.primary_match_fractions,
            secondary_match_fractions: self.secondary_match_fractions,
            runtime_samples: self.runtime_samples,
            diagnostics,
            category: self.category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Mode;
    use crate::metric::PerReadMetric;

    fn aggregator() -> CategoryAggregator {
        CategoryAggregator::new(
            Category::new("brca1", Mode::Real, "cactus"),
            &EvalConfig::default(),
        )
    }

    fn mapped(f: f64) -> ReadOutcome {
        ReadOutcome::Mapped(PerReadMetric::from_fraction(f))
    }

    const TEN_PRIMARIES: [f64; 10] = [1.0, 1.0, 1.0, 0.99, 0.99, 0.97, 0.5, 0.0, 0.0, 0.0];

    #[test]
    fn test_perfect_and_well_mapped_counts() {
        let mut agg = aggregator();
        for f in TEN_PRIMARIES {
            agg.record(mapped(f), Role::Primary);
        }
        let cell = agg.finalize().unwrap();
        assert_eq!(cell.perfect_count, 3);
        assert_eq!(cell.total_primary_count, 10);
        assert_eq!(cell.well_mapped_fraction, 0.5);
    }

    #[test]
    fn test_not_well_multimapped_counts_single_mappers() {
        let mut agg = aggregator();
        for f in TEN_PRIMARIES {
            agg.record(mapped(f), Role::Primary);
        }
        for f in [0.99, 0.5, 0.97, 1.0] {
            agg.record(mapped(f), Role::Secondary);
        }
        let cell = agg.finalize().unwrap();
        assert_eq!(cell.secondary_count, 4);
        assert_eq!(cell.bad_secondary_count, 2);
        assert!((cell.not_well_multimapped_fraction - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_no_secondaries_is_fully_not_multimapped() {
        let mut agg = aggregator();
        agg.record(mapped(1.0), Role::Primary);
        agg.record(mapped(0.2), Role::Primary);
        let cell = agg.finalize().unwrap();
        assert_eq!(cell.not_well_multimapped_fraction, 1.0);
    }

    #[test]
    fn test_unmapped_reads_are_in_denominator_only() {
        let mut agg = aggregator();
        agg.record(mapped(1.0), Role::Primary);
        agg.record(ReadOutcome::Unmapped, Role::Primary);
        agg.record(ReadOutcome::Unmapped, Role::Primary);
        agg.record(mapped(0.99), Role::Primary);
        let cell = agg.finalize().unwrap();

        assert_eq!(cell.total_primary_count, 4);
        assert_eq!(cell.mapped_count, 2);
        assert_eq!(cell.well_mapped_fraction, 0.5);
        assert_eq!(cell.mapped_fraction, 0.5);
        assert_eq!(cell.primary_match_fractions, vec![1.0, 0.99]);
    }

    #[test]
    fn test_excess_secondaries_reported() {
        let mut agg = aggregator();
        agg.record(mapped(1.0), Role::Primary);
        agg.record(mapped(0.1), Role::Secondary);
        agg.record(mapped(0.2), Role::Secondary);
        agg.record(mapped(0.3), Role::Secondary);
        let cell = agg.finalize().unwrap();
        assert_eq!(cell.diagnostics.excess_secondaries, 2);
        assert_eq!(cell.not_well_multimapped_fraction, 1.0);

        let mut agg = aggregator();
        agg.record(mapped(1.0), Role::Primary);
        agg.record(mapped(0.1), Role::Secondary);
        assert_eq!(agg.finalize().unwrap().diagnostics.excess_secondaries, 0);
    }

    #[test]
    fn test_empty_cell_is_missing_data() {
        let err = aggregator().finalize().unwrap_err();
        assert!(matches!(err, EvalError::MissingCategoryData { .. }));
    }

    #[test]
    fn test_malformed_records_tracked() {
        let mut agg = aggregator();
        agg.record_malformed(&EvalError::malformed(12, "zero-length sequence"));
        agg.record_malformed(&EvalError::malformed(3, "zero-length sequence"));
        agg.record(mapped(1.0), Role::Primary);
        let cell = agg.finalize().unwrap();
        assert_eq!(cell.diagnostics.malformed_records, 2);
        assert_eq!(cell.diagnostics.first_malformed_index, Some(3));
        assert_eq!(cell.total_primary_count, 1);
    }

    #[test]
    fn test_threshold_comes_from_config() {
        let config = EvalConfig::default().with_threshold(0.5);
        let mut agg = CategoryAggregator::new(Category::new("r", Mode::Simulated, "m"), &config);
        for f in TEN_PRIMARIES {
            agg.record(mapped(f), Role::Primary);
        }
        assert_eq!(agg.finalize().unwrap().well_mapped_fraction, 0.7);
    }

    #[test]
    fn test_sample_summary() {
        let s = SampleSummary::from_samples(&[3.0, 1.0, 2.0, 10.0]).unwrap();
        assert_eq!(s.count, 4);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 10.0);
        assert_eq!(s.median, 2.5);
        assert_eq!(s.mean, 4.0);
        assert!(SampleSummary::from_samples(&[]).is_none());
    }
}
