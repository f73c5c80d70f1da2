use crate::errors::StanceResult;
use crate::models::Theme;

/// Output of the theme/keyword classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub theme: Theme,
    pub keyword: String,
}

/// Theme classification and keyword extraction collaborator.
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> StanceResult<Classification>;
}
