/// Alignment record model
///
/// The aligner writes one JSON object per alignment. Only the fields the
/// evaluation needs are kept: read length, score, secondary flag and the
/// flattened edit list of the alignment path.
use serde::Deserialize;

use crate::error::{EvalError, EvalResult};

/// One edit of an alignment path
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Edit {
    #[serde(default)]
    pub from_length: i64,
    #[serde(default)]
    pub to_length: i64,
    /// Substituted or inserted bases, absent for a match
    #[serde(default, rename = "sequence")]
    pub substituted_sequence: Option<String>,
}

impl Edit {
    pub fn matched(length: i64) -> Self {
        Edit {
            from_length: length,
            to_length: length,
            substituted_sequence: None,
        }
    }

    pub fn substitution(bases: &str) -> Self {
        let len = bases.len() as i64;
        Edit {
            from_length: len,
            to_length: len,
            substituted_sequence: Some(bases.to_string()),
        }
    }

    pub fn insertion(bases: &str) -> Self {
        Edit {
            from_length: 0,
            to_length: bases.len() as i64,
            substituted_sequence: Some(bases.to_string()),
        }
    }

    pub fn deletion(length: i64) -> Self {
        Edit {
            from_length: length,
            to_length: 0,
            substituted_sequence: None,
        }
    }

    /// No substitution and no indel
    pub fn is_perfect_match(&self) -> bool {
        self.to_length == self.from_length && self.substituted_sequence.is_none()
    }
}

/// A single reported alignment of a read
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlignmentRecord {
    pub name: Option<String>,
    pub sequence_length: usize,
    /// Absent when the read did not map
    pub score: Option<f64>,
    pub is_secondary: bool,
    pub identity: Option<f64>,
    pub edits: Vec<Edit>,
}

impl AlignmentRecord {
    pub fn is_mapped(&self) -> bool {
        self.score.is_some()
    }

    /// Parse one line of aligner JSON output. `record_index` is only used
    /// to locate the line in error messages.
    pub fn from_json_line(line: &str, record_index: usize) -> EvalResult<Self> {
        let raw: JsonAlignment = serde_json::from_str(line).map_err(|source| EvalError::Json {
            record_index,
            source,
        })?;
        Ok(raw.into())
    }
}

// Wire shape of the aligner's JSON output
#[derive(Debug, Deserialize)]
struct JsonAlignment {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sequence: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    is_secondary: bool,
    #[serde(default)]
    identity: Option<f64>,
    #[serde(default)]
    path: Option<JsonPath>,
}

#[derive(Debug, Default, Deserialize)]
struct JsonPath {
    #[serde(default)]
    mapping: Vec<JsonMapping>,
}

#[derive(Debug, Default, Deserialize)]
struct JsonMapping {
    #[serde(default)]
    edit: Vec<Edit>,
}

impl From<JsonAlignment> for AlignmentRecord {
    fn from(raw: JsonAlignment) -> Self {
        let edits = raw
            .path
            .map(|p| p.mapping.into_iter().flat_map(|m| m.edit).collect())
            .unwrap_or_default();

        AlignmentRecord {
            name: raw.name.filter(|n| !n.is_empty()),
            sequence_length: raw.sequence.len(),
            score: raw.score,
            is_secondary: raw.is_secondary,
            identity: raw.identity,
            edits,
        }
    }
}
