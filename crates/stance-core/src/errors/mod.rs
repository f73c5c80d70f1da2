//! Error types for every subsystem, aggregated into [`StanceError`].

mod index_error;
mod retrieval_error;
mod selector_error;
mod store_error;

pub use index_error::IndexError;
pub use retrieval_error::RetrievalError;
pub use selector_error::SelectorError;
pub use store_error::StoreError;

/// Workspace-wide result alias.
pub type StanceResult<T> = Result<T, StanceError>;

/// Top-level error for the stance workspace.
#[derive(Debug, thiserror::Error)]
pub enum StanceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// An external collaborator (embedder, classifier, scorer, generator,
    /// crawler) failed. Implementations of the collaborator traits produce
    /// this variant.
    #[error("collaborator {collaborator} failed: {reason}")]
    Collaborator {
        collaborator: &'static str,
        reason: String,
    },

    /// Invalid configuration detected at construction time. Fatal.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

impl StanceError {
    /// Shorthand for collaborator failures.
    pub fn collaborator(collaborator: &'static str, reason: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator,
            reason: reason.into(),
        }
    }
}
