/// Grouping of alignment records into reads and primary/secondary classification
///
/// Each read contributes at most one primary and one secondary record to
/// the statistics. Anything beyond that (duplicate primaries, secondaries
/// with no mapped primary, extra secondaries) is counted but not used.
use indexmap::IndexMap;

use crate::error::{EvalError, EvalResult};
use crate::metric::{evaluate_record, PerReadMetric, ReadOutcome};
use crate::record::AlignmentRecord;

/// Which alignment of a read a metric belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Primary,
    Secondary,
}

/// What the classifier needs from one record: identity, role and the
/// already computed outcome. The edit list is dropped once evaluated.
#[derive(Debug)]
pub struct EvaluatedRecord {
    pub index: usize,
    pub name: Option<String>,
    pub is_secondary: bool,
    pub outcome: EvalResult<ReadOutcome>,
}

impl EvaluatedRecord {
    pub fn new(index: usize, record: AlignmentRecord) -> Self {
        let outcome = evaluate_record(&record, index);
        EvaluatedRecord {
            index,
            name: record.name,
            is_secondary: record.is_secondary,
            outcome,
        }
    }
}

/// All records reported for one read, in input order
#[derive(Debug, Default)]
pub struct ReadGroup {
    pub name: Option<String>,
    pub records: Vec<EvaluatedRecord>,
}

/// Group records by read name, keeping first-seen order.
///
/// Unnamed primaries start a new group; an unnamed secondary joins the
/// closest preceding group. Secondaries may appear anywhere after their
/// primary, so every group stays open until the stream ends: memory grows
/// with the number of records, but only by their evaluated form.
pub fn group_reads<I>(records: I) -> Vec<ReadGroup>
where
    I: IntoIterator<Item = EvaluatedRecord>,
{
    let mut groups: Vec<ReadGroup> = Vec::new();
    let mut by_name: IndexMap<String, usize> = IndexMap::new();

    for record in records {
        match record.name.clone() {
            Some(name) => {
                let slot = *by_name.entry(name.clone()).or_insert_with(|| {
                    groups.push(ReadGroup {
                        name: Some(name),
                        records: Vec::new(),
                    });
                    groups.len() - 1
                });
                groups[slot].records.push(record);
            }
            None => {
                if record.is_secondary {
                    if let Some(last) = groups.last_mut() {
                        last.records.push(record);
                        continue;
                    }
                }
                groups.push(ReadGroup {
                    name: None,
                    records: vec![record],
                });
            }
        }
    }

    groups
}

/// Classification of a whole read
#[derive(Debug, Clone, PartialEq)]
pub enum ReadClass {
    /// Mapped primary, with the best mapped secondary if there is one
    PrimaryMapped {
        primary: PerReadMetric,
        secondary: Option<PerReadMetric>,
    },
    /// No primary record, or a primary without a score
    PrimaryUnmapped,
    /// Primary record is malformed; the read is left out of every count
    Excluded,
}

/// Records of a read that were not used, for diagnostics
#[derive(Debug, Default)]
pub struct ReadIssues {
    pub malformed: Vec<EvalError>,
    pub duplicate_primaries: usize,
    pub orphan_secondaries: usize,
    pub unmapped_secondaries: usize,
    pub extra_secondaries: usize,
}

#[derive(Debug)]
pub struct ClassifiedRead {
    pub name: Option<String>,
    pub class: ReadClass,
    pub issues: ReadIssues,
}

impl ClassifiedRead {
    /// (outcome, role) pairs to feed an aggregator; empty for excluded reads
    pub fn outcomes(&self) -> Vec<(ReadOutcome, Role)> {
        match &self.class {
            ReadClass::PrimaryMapped { primary, secondary } => {
                let mut out = vec![(ReadOutcome::Mapped(*primary), Role::Primary)];
                if let Some(sec) = secondary {
                    out.push((ReadOutcome::Mapped(*sec), Role::Secondary));
                }
                out
            }
            ReadClass::PrimaryUnmapped => vec![(ReadOutcome::Unmapped, Role::Primary)],
            ReadClass::Excluded => Vec::new(),
        }
    }
}

/// Classify one read group
pub fn classify_group(group: ReadGroup) -> ClassifiedRead {
    let mut issues = ReadIssues::default();
    let (secondaries, primaries): (Vec<_>, Vec<_>) =
        group.records.into_iter().partition(|r| r.is_secondary);

    let mut primaries = primaries.into_iter();
    let Some(primary_record) = primaries.next() else {
        issues.orphan_secondaries = secondaries.len();
        return ClassifiedRead {
            name: group.name,
            class: ReadClass::PrimaryUnmapped,
            issues,
        };
    };
    issues.duplicate_primaries = primaries.count();

    let primary = match primary_record.outcome {
        Ok(ReadOutcome::Mapped(metric)) => metric,
        Ok(ReadOutcome::Unmapped) => {
            issues.orphan_secondaries = secondaries.len();
            return ClassifiedRead {
                name: group.name,
                class: ReadClass::PrimaryUnmapped,
                issues,
            };
        }
        Err(e) => {
            issues.malformed.push(e);
            return ClassifiedRead {
                name: group.name,
                class: ReadClass::Excluded,
                issues,
            };
        }
    };

    let mut best: Option<PerReadMetric> = None;
    let mut mapped_secondaries = 0usize;
    for record in secondaries {
        match record.outcome {
            Ok(ReadOutcome::Mapped(metric)) => {
                mapped_secondaries += 1;
                if best.map_or(true, |b| metric.match_fraction > b.match_fraction) {
                    best = Some(metric);
                }
            }
            Ok(ReadOutcome::Unmapped) => issues.unmapped_secondaries += 1,
            Err(e) => issues.malformed.push(e),
        }
    }
    issues.extra_secondaries = mapped_secondaries.saturating_sub(1);

    ClassifiedRead {
        name: group.name,
        class: ReadClass::PrimaryMapped {
            primary,
            secondary: best,
        },
        issues,
    }
}

/// Evaluate, group and classify a record stream
pub fn classify_records<I>(records: I) -> Vec<ClassifiedRead>
where
    I: IntoIterator<Item = (usize, AlignmentRecord)>,
{
    group_reads(
        records
            .into_iter()
            .map(|(index, record)| EvaluatedRecord::new(index, record)),
    )
    .into_iter()
    .map(classify_group)
    .collect()
}
