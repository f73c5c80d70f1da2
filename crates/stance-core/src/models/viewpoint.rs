//! Viewpoints: canonical stance statements in the knowledge base.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed theme taxonomy. The classifier collaborator maps free text into
/// one of these; unknown labels land on `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Economy,
    Technology,
    Environment,
    Education,
    Healthcare,
    Society,
    Culture,
    Politics,
    Other,
}

impl Theme {
    /// Stable string form used in the relational store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Economy => "economy",
            Theme::Technology => "technology",
            Theme::Environment => "environment",
            Theme::Education => "education",
            Theme::Healthcare => "healthcare",
            Theme::Society => "society",
            Theme::Culture => "culture",
            Theme::Politics => "politics",
            Theme::Other => "other",
        }
    }

    /// Parse the stored string form. Unknown labels map to `Other` rather
    /// than failing, so an extended taxonomy in the database stays readable.
    pub fn parse(s: &str) -> Self {
        match s {
            "economy" => Theme::Economy,
            "technology" => Theme::Technology,
            "environment" => Theme::Environment,
            "education" => Theme::Education,
            "healthcare" => Theme::Healthcare,
            "society" => Theme::Society,
            "culture" => Theme::Culture,
            "politics" => Theme::Politics,
            _ => Theme::Other,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical stance statement. Immutable once created; never deleted.
/// `id` is assigned by the store and is monotonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub id: i64,
    pub text: String,
    pub theme: Theme,
    /// The keyword string this viewpoint was filed under.
    pub keywords: String,
    pub created_at: DateTime<Utc>,
}
