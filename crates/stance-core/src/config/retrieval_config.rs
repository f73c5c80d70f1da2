use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::{StanceError, StanceResult};

/// Retrieval pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Keyword gate: minimum cosine similarity to pass.
    pub keyword_threshold: f32,
    /// Viewpoint gate: minimum cosine similarity to pass.
    pub viewpoint_threshold: f32,
    /// Evidence below this acceptance rate is filtered out.
    pub min_acceptance_rate: f64,
    /// Maximum evidence passages returned per request.
    pub max_evidence: usize,
    /// Synthetic statements requested from the generator tier.
    pub generated_count: usize,
    /// Crawler pacing: sustained queries per second.
    pub crawler_rate: f64,
    /// Crawler pacing: burst capacity.
    pub crawler_burst: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            keyword_threshold: constants::DEFAULT_KEYWORD_THRESHOLD,
            viewpoint_threshold: constants::DEFAULT_VIEWPOINT_THRESHOLD,
            min_acceptance_rate: constants::DEFAULT_MIN_ACCEPTANCE_RATE,
            max_evidence: constants::DEFAULT_MAX_EVIDENCE,
            generated_count: constants::DEFAULT_GENERATED_COUNT,
            crawler_rate: constants::DEFAULT_CRAWLER_RATE,
            crawler_burst: constants::DEFAULT_CRAWLER_BURST,
        }
    }
}

impl RetrievalConfig {
    /// Validate threshold ranges. Surfaced immediately at construction.
    pub fn validate(&self) -> StanceResult<()> {
        if !(0.0..=1.0).contains(&self.keyword_threshold) {
            return Err(StanceError::Configuration {
                reason: format!("keyword_threshold {} outside [0, 1]", self.keyword_threshold),
            });
        }
        if !(0.0..=1.0).contains(&self.viewpoint_threshold) {
            return Err(StanceError::Configuration {
                reason: format!(
                    "viewpoint_threshold {} outside [0, 1]",
                    self.viewpoint_threshold
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.min_acceptance_rate) {
            return Err(StanceError::Configuration {
                reason: format!(
                    "min_acceptance_rate {} outside [0, 1]",
                    self.min_acceptance_rate
                ),
            });
        }
        if self.generated_count == 0 {
            return Err(StanceError::Configuration {
                reason: "generated_count must be at least 1".into(),
            });
        }
        Ok(())
    }
}
