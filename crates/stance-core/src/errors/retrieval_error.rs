/// Retrieval-pipeline and fallback-chain errors.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("generator returned {actual} items, expected exactly {expected}")]
    GenerationCountMismatch { expected: usize, actual: usize },

    #[error("generator produced invalid output: {reason}")]
    GenerationInvalid { reason: String },
}
