/// Evidence-selector errors. Malformed candidates are a caller bug, not a
/// quality signal, so these are hard errors that propagate.
#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    #[error("candidate at position {position} has empty text")]
    MissingText { position: usize },

    #[error("candidate at position {position} has acceptance rate {value}, outside [0, 1]")]
    InvalidRate { position: usize, value: f64 },
}
