/// Per-read quality metrics derived from a single alignment record
use crate::error::{EvalError, EvalResult};
use crate::record::{AlignmentRecord, Edit};

/// Derived metric for one mapped record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerReadMetric {
    /// Bases covered by perfect-match edits over read length, in [0, 1]
    pub match_fraction: f64,
    pub is_perfect: bool,
}

impl PerReadMetric {
    pub fn from_fraction(match_fraction: f64) -> Self {
        PerReadMetric {
            match_fraction,
            is_perfect: match_fraction == 1.0,
        }
    }

    pub fn is_well_mapped(&self, threshold: f64) -> bool {
        self.match_fraction >= threshold
    }
}

/// Outcome of evaluating one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadOutcome {
    Mapped(PerReadMetric),
    Unmapped,
}

impl ReadOutcome {
    pub fn metric(&self) -> Option<&PerReadMetric> {
        match self {
            ReadOutcome::Mapped(m) => Some(m),
            ReadOutcome::Unmapped => None,
        }
    }
}

fn checked_length_sum<'a, I>(edits: I) -> Option<i64>
where
    I: IntoIterator<Item = &'a Edit>,
{
    edits
        .into_iter()
        .try_fold(0i64, |acc, e| acc.checked_add(e.to_length))
}

/// Sum of `to_length` over perfect-match edits; `None` if it overflows
pub fn perfect_match_bases(record: &AlignmentRecord) -> Option<i64> {
    checked_length_sum(record.edits.iter().filter(|e| e.is_perfect_match()))
}

/// Read bases consumed by the whole edit list; `None` if it overflows
pub fn consumed_bases(record: &AlignmentRecord) -> Option<i64> {
    checked_length_sum(&record.edits)
}

/// Compute the per-read metric for a record.
///
/// Records without a score are `Unmapped`. Zero-length reads, negative edit
/// lengths and edit lists that consume more bases than the read holds are
/// malformed.
pub fn evaluate_record(record: &AlignmentRecord, record_index: usize) -> EvalResult<ReadOutcome> {
    if record.score.is_none() {
        return Ok(ReadOutcome::Unmapped);
    }

    if record.sequence_length == 0 {
        return Err(EvalError::malformed(record_index, "zero-length sequence"));
    }

    if let Some(bad) = record
        .edits
        .iter()
        .find(|e| e.to_length < 0 || e.from_length < 0)
    {
        return Err(EvalError::malformed(
            record_index,
            format!(
                "negative edit length (from_length={}, to_length={})",
                bad.from_length, bad.to_length
            ),
        ));
    }

    let consumed = consumed_bases(record)
        .ok_or_else(|| EvalError::malformed(record_index, "edit lengths overflow"))?;
    if consumed as u64 > record.sequence_length as u64 {
        return Err(EvalError::malformed(
            record_index,
            format!(
                "edits consume {} bases of a {} bp read",
                consumed, record.sequence_length
            ),
        ));
    }

    let matched = perfect_match_bases(record)
        .ok_or_else(|| EvalError::malformed(record_index, "edit lengths overflow"))?;
    let fraction = matched as f64 / record.sequence_length as f64;
    Ok(ReadOutcome::Mapped(PerReadMetric::from_fraction(fraction)))
}
