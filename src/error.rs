/// Error taxonomy for metric computation and dataset assembly
///
/// Per-record errors are recovered by the aggregator (record skipped and
/// counted), missing category data is recovered by the dataset builder
/// (category dropped), and configuration errors abort the dataset.
use thiserror::Error;

use crate::category::Category;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Malformed record {record_index}: {reason}")]
    MalformedRecord { record_index: usize, reason: String },

    #[error("No primary records for category {category}")]
    MissingCategoryData { category: Category },

    #[error("Method '{method}' (region {region}) is not in the canonical ordering table")]
    Configuration { method: String, region: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error at record {record_index}: {source}")]
    Json {
        record_index: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl EvalError {
    pub fn malformed(record_index: usize, reason: impl Into<String>) -> Self {
        EvalError::MalformedRecord {
            record_index,
            reason: reason.into(),
        }
    }

    /// True for errors the aggregator recovers from by skipping the record
    pub fn is_record_local(&self) -> bool {
        matches!(
            self,
            EvalError::MalformedRecord { .. } | EvalError::Json { .. }
        )
    }
}

pub type EvalResult<T> = Result<T, EvalError>;
