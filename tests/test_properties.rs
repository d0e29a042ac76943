/// Property-based tests for the per-read and per-category statistics
///
/// Uses proptest to check invariants that must hold for any input.
use proptest::prelude::*;

use mapeval::aggregate::CategoryAggregator;
use mapeval::category::{CanonicalTable, Category, Mode};
use mapeval::classify::Role;
use mapeval::config::EvalConfig;
use mapeval::dataset::{ComparisonDatasetBuilder, ReportMetric};
use mapeval::metric::{evaluate_record, PerReadMetric, ReadOutcome};
use mapeval::record::{AlignmentRecord, Edit};

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (1i64..50).prop_map(Edit::matched),
        "[ACGT]{1,5}".prop_map(|s| Edit::substitution(&s)),
        "[ACGT]{1,5}".prop_map(|s| Edit::insertion(&s)),
        (1i64..10).prop_map(Edit::deletion),
    ]
}

fn category() -> Category {
    Category::new("brca1", Mode::Real, "cactus")
}

/// Property: match fraction is always within [0, 1] when defined
#[test]
fn prop_match_fraction_bounded() {
    proptest!(|(edits in prop::collection::vec(edit_strategy(), 0..20), extra in 0usize..50)| {
        let consumed: i64 = edits.iter().map(|e| e.to_length).sum();
        let record = AlignmentRecord {
            sequence_length: consumed as usize + extra,
            score: Some(1.0),
            edits,
            ..Default::default()
        };

        match evaluate_record(&record, 1) {
            Ok(ReadOutcome::Mapped(m)) => {
                prop_assert!((0.0..=1.0).contains(&m.match_fraction));
                prop_assert_eq!(m.is_perfect, m.match_fraction == 1.0);
            }
            Ok(ReadOutcome::Unmapped) => prop_assert!(false, "scored record reported unmapped"),
            Err(_) => prop_assert_eq!(record.sequence_length, 0),
        }
    });
}

/// Property: an edit list consuming more bases than the read is always malformed
#[test]
fn prop_overlong_edit_list_rejected() {
    proptest!(|(edits in prop::collection::vec(edit_strategy(), 1..20), short_by in 1i64..20)| {
        let consumed: i64 = edits.iter().map(|e| e.to_length).sum();
        prop_assume!(consumed > short_by);
        let record = AlignmentRecord {
            sequence_length: (consumed - short_by) as usize,
            score: Some(1.0),
            edits,
            ..Default::default()
        };
        prop_assert!(evaluate_record(&record, 1).is_err());
    });
}

/// Property: not-well-multimapped fraction is (B + (T - S)) / T and lies in [0, 1]
#[test]
fn prop_not_well_multimapped_formula() {
    proptest!(|(
        primaries in prop::collection::vec(0.0f64..=1.0, 1..60),
        secondary_fractions in prop::collection::vec(0.0f64..=1.0, 0..60),
        unmapped in 0usize..10
    )| {
        let config = EvalConfig::default();
        let mut agg = CategoryAggregator::new(category(), &config);
        for &f in &primaries {
            agg.record(ReadOutcome::Mapped(PerReadMetric::from_fraction(f)), Role::Primary);
        }
        for _ in 0..unmapped {
            agg.record(ReadOutcome::Unmapped, Role::Primary);
        }
        // At most one secondary per mapped primary
        let secondaries: Vec<f64> = secondary_fractions.into_iter().take(primaries.len()).collect();
        for &f in &secondaries {
            agg.record(ReadOutcome::Mapped(PerReadMetric::from_fraction(f)), Role::Secondary);
        }

        let cell = agg.finalize().unwrap();
        let t = primaries.len() + unmapped;
        let s = secondaries.len();
        let b = secondaries.iter().filter(|&&f| f < config.well_mapped_threshold).count();

        prop_assert_eq!(cell.total_primary_count, t);
        prop_assert_eq!(cell.secondary_count, s);
        prop_assert_eq!(cell.bad_secondary_count, b);

        let expected = (b + (t - s)) as f64 / t as f64;
        prop_assert!((cell.not_well_multimapped_fraction - expected).abs() < 1e-12);
        prop_assert!((0.0..=1.0).contains(&cell.not_well_multimapped_fraction));
        prop_assert!((0.0..=1.0).contains(&cell.well_mapped_fraction));
        if s == 0 {
            prop_assert_eq!(cell.not_well_multimapped_fraction, 1.0);
        }
    });
}

/// Property: aggregating the same outcomes twice gives identical cells
#[test]
fn prop_aggregation_idempotent() {
    proptest!(|(
        outcomes in prop::collection::vec((prop::option::of(0.0f64..=1.0), any::<bool>()), 1..80)
    )| {
        let config = EvalConfig::default();
        let run = || {
            let mut agg = CategoryAggregator::new(category(), &config);
            agg.record(ReadOutcome::Unmapped, Role::Primary);
            for (fraction, secondary) in &outcomes {
                let outcome = match fraction {
                    Some(f) => ReadOutcome::Mapped(PerReadMetric::from_fraction(*f)),
                    None => ReadOutcome::Unmapped,
                };
                let role = if *secondary { Role::Secondary } else { Role::Primary };
                agg.record(outcome, role);
            }
            agg.finalize().unwrap()
        };

        prop_assert_eq!(run(), run());
    });
}

/// Property: datasets keep canonical order and only hold methods with data
#[test]
fn prop_dataset_order_and_filtering() {
    const METHODS: [&str; 6] = ["snp1kg", "cactus", "camel", "prg", "refonly", "trivial"];

    proptest!(|(present in prop::collection::vec(any::<bool>(), 6), shuffle_seed in 0usize..720)| {
        let config = EvalConfig::default();
        let table = CanonicalTable::builtin();

        let mut methods: Vec<&str> = METHODS
            .iter()
            .zip(&present)
            .filter(|(_, p)| **p)
            .map(|(m, _)| *m)
            .collect();
        // Deterministic permutation of input order
        let len = methods.len();
        if len > 1 {
            for i in 0..len {
                methods.swap(i, (shuffle_seed / (i + 1)) % len);
            }
        }

        let cells: Vec<_> = methods
            .iter()
            .map(|m| {
                let mut agg = CategoryAggregator::new(Category::new("brca1", Mode::Real, format!("{m}-brca1")), &config);
                agg.record(ReadOutcome::Mapped(PerReadMetric::from_fraction(1.0)), Role::Primary);
                agg.finalize().unwrap()
            })
            .collect();

        let ds = ComparisonDatasetBuilder::new(&table, &config)
            .build(
                "brca1",
                &cells,
                ReportMetric::WellMappedFraction,
                ReportMetric::WellMappedFraction.display_meta("brca1", Mode::Real, &config),
            )
            .unwrap();

        let positions: Vec<usize> = ds.methods().iter().map(|m| table.position(m).unwrap()).collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(ds.entries.len(), methods.len());
    });
}
