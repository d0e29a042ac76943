use crate::error::{EvalError, EvalResult};

/// Match fraction at or above which a read counts as well mapped
pub const DEFAULT_WELL_MAPPED_THRESHOLD: f64 = 0.98;

/// Color given to methods missing from the canonical table in permissive mode
pub const DEFAULT_UNKNOWN_COLOR: &str = "#808080";

/// What to do with methods found in data but absent from the canonical table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryPolicy {
    /// Unknown methods abort the dataset with a configuration error
    #[default]
    Strict,
    /// Unknown methods are appended after the canonical ones with default styling
    Permissive,
    /// Unknown methods are dropped with a warning
    Drop,
}

impl std::str::FromStr for CategoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(CategoryPolicy::Strict),
            "permissive" => Ok(CategoryPolicy::Permissive),
            "drop" => Ok(CategoryPolicy::Drop),
            other => Err(format!(
                "Unknown category policy '{other}' (expected strict, permissive or drop)"
            )),
        }
    }
}

/// Evaluation settings, built once and shared read-only by every cell
#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub well_mapped_threshold: f64,
    /// Upper axis bound for count plots of simulated reads
    pub simulated_read_ceiling: Option<u64>,
    pub category_policy: CategoryPolicy,
    pub default_color: String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            well_mapped_threshold: DEFAULT_WELL_MAPPED_THRESHOLD,
            simulated_read_ceiling: None,
            category_policy: CategoryPolicy::default(),
            default_color: DEFAULT_UNKNOWN_COLOR.to_string(),
        }
    }
}

impl EvalConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.well_mapped_threshold = threshold;
        self
    }

    pub fn with_policy(mut self, policy: CategoryPolicy) -> Self {
        self.category_policy = policy;
        self
    }

    pub fn with_simulated_read_ceiling(mut self, ceiling: Option<u64>) -> Self {
        self.simulated_read_ceiling = ceiling;
        self
    }

    pub fn validate(&self) -> EvalResult<()> {
        let t = self.well_mapped_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(EvalError::InvalidConfig(format!(
                "well-mapped threshold {t} must be within [0, 1]"
            )));
        }
        if self.simulated_read_ceiling == Some(0) {
            return Err(EvalError::InvalidConfig(
                "simulated read ceiling must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
