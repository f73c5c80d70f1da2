//! Workspace-wide default values.

/// Minimum keyword cosine similarity for the keyword gate to pass.
pub const DEFAULT_KEYWORD_THRESHOLD: f32 = 0.7;

/// Minimum viewpoint cosine similarity for the viewpoint gate to pass.
pub const DEFAULT_VIEWPOINT_THRESHOLD: f32 = 0.8;

/// Evidence below this acceptance rate is dropped by quality filtering.
pub const DEFAULT_MIN_ACCEPTANCE_RATE: f64 = 0.5;

/// Maximum evidence passages returned per request.
pub const DEFAULT_MAX_EVIDENCE: usize = 5;

/// Number of synthetic statements requested from the generator tier.
pub const DEFAULT_GENERATED_COUNT: usize = 5;

/// Embedding cache is flushed to disk every this many insertions.
pub const DEFAULT_CACHE_PERSIST_INTERVAL: usize = 8;

/// Crawler pacing: sustained queries per second.
pub const DEFAULT_CRAWLER_RATE: f64 = 2.0;

/// Crawler pacing: burst capacity in tokens.
pub const DEFAULT_CRAWLER_BURST: f64 = 4.0;

/// Tolerance used when checking the unit-norm invariant on stored vectors.
pub const NORM_TOLERANCE: f32 = 1e-4;
