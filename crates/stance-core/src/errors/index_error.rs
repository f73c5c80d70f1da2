/// Similarity-index and embedding-cache errors.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("index I/O failed on {path}: {message}")]
    Io { path: String, message: String },

    #[error("dimension mismatch: index is {expected}, vector is {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cannot normalize a zero-norm vector")]
    DegenerateVector,

    #[error("persisted index is corrupt: {details}")]
    Corrupt { details: String },
}
