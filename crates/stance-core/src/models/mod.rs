//! Domain models shared across the workspace.

mod evidence;
mod outcome;
mod score_update;
mod viewpoint;

pub use evidence::{Evidence, EvidenceCandidate, EvidenceSource, NewEvidence, RankedEvidence};
pub use outcome::{RetrievalOutcome, Trace, TraceStep};
pub use score_update::ScoreUpdateRecord;
pub use viewpoint::{Theme, Viewpoint};
