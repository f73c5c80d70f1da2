//! RetrievalPipeline: the gate state machine.
//!
//! theme gate → keyword gate → viewpoint gate, each failing into its own
//! terminal path. Every collaborator is injected at construction; there is
//! no shared global state between pipeline instances.

use tracing::{debug, info, warn};

use stance_core::config::{IndexConfig, RetrievalConfig};
use stance_core::errors::{StanceError, StanceResult};
use stance_core::models::{
    NewEvidence, RankedEvidence, RetrievalOutcome, Theme, Trace, TraceStep, Viewpoint,
};
use stance_core::traits::{Classifier, Crawler, Embedder, Generator, Scorer, ViewpointStore};
use stance_index::ConsistencyManager;

use crate::fallback::{FallbackChain, FallbackOutcome, Tier};

/// Which gate failed into the viewpoint-creation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NewPath {
    /// Theme or keyword gate failed.
    CompletelyNew,
    /// Keyword gate passed, viewpoint gate failed: reuse the matched
    /// keyword.
    ExistingKeyword,
}

pub struct RetrievalPipeline<'a> {
    store: &'a dyn ViewpointStore,
    classifier: &'a dyn Classifier,
    consistency: ConsistencyManager<'a>,
    chain: FallbackChain<'a>,
    config: RetrievalConfig,
}

impl<'a> RetrievalPipeline<'a> {
    /// Construct a pipeline with explicit collaborator handles.
    ///
    /// Opens (and if necessary repairs) the index layer; invalid
    /// configuration is surfaced immediately.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &'a dyn ViewpointStore,
        embedder: &'a dyn Embedder,
        classifier: &'a dyn Classifier,
        scorer: &'a dyn Scorer,
        generator: &'a dyn Generator,
        crawler: &'a dyn Crawler,
        index_config: IndexConfig,
        config: RetrievalConfig,
    ) -> StanceResult<Self> {
        config.validate()?;
        let consistency = ConsistencyManager::open(store, embedder, index_config)?;
        let chain = FallbackChain::new(store, scorer, generator, crawler, config.clone());
        Ok(Self {
            store,
            classifier,
            consistency,
            chain,
            config,
        })
    }

    /// Access the index layer's health snapshot.
    pub fn index_health(&self) -> stance_index::IndexHealth {
        self.consistency.health()
    }

    /// Process one opinion statement end to end.
    ///
    /// Internal desync is auto-recovered and never surfaces here. The only
    /// hard failures are malformed stored evidence and infrastructure
    /// errors; a total generation failure comes back as the `Failed`
    /// variant, not an `Err`.
    pub fn process(&mut self, opinion_text: &str) -> StanceResult<RetrievalOutcome> {
        let mut trace = Trace::new();

        let classification = self.classifier.classify(opinion_text)?;
        let theme = classification.theme;
        let extracted_keyword = classification.keyword;
        debug!(%theme, keyword = %extracted_keyword, "classified opinion");

        // Desync detected on search is repaired before any gate consults
        // the indices.
        if let Some(kind) = self.consistency.verify()? {
            debug!(?kind, "repaired ID map before retrieval");
            trace.push(TraceStep::IdRepair);
        }

        // Gate 1: theme. A theme with zero prior viewpoints offers no
        // basis for comparison, so vector search is skipped entirely.
        trace.push(TraceStep::ThemeGate);
        if self.store.theme_count(theme)? == 0 {
            debug!(%theme, "no prior viewpoints for theme");
            return self.create_viewpoint(
                opinion_text,
                theme,
                &extracted_keyword,
                NewPath::CompletelyNew,
                trace,
            );
        }

        // Gate 2: keyword similarity.
        trace.push(TraceStep::KeywordGate);
        let keyword_vec = self.consistency.embed(&extracted_keyword)?;
        let keyword_hits = self.consistency.search_keywords(&keyword_vec, 1)?;
        let keyword_hit = keyword_hits
            .first()
            .filter(|(sim, _)| *sim >= self.config.keyword_threshold);
        let Some(&(keyword_sim, keyword_row)) = keyword_hit else {
            debug!("keyword gate failed");
            return self.create_viewpoint(
                opinion_text,
                theme,
                &extracted_keyword,
                NewPath::CompletelyNew,
                trace,
            );
        };

        // Resolve the matched keyword text through row-position parity
        // with the viewpoint table. An empty stored keyword is substituted
        // with the freshly extracted one.
        let matched_keyword = match self.store.viewpoint_at_position(keyword_row)? {
            Some(vp) if !vp.keywords.trim().is_empty() => vp.keywords,
            _ => extracted_keyword.clone(),
        };
        debug!(keyword_sim, %matched_keyword, "keyword gate passed");

        // Gate 3: viewpoint similarity, a global search over all
        // viewpoints.
        trace.push(TraceStep::ViewpointGate);
        let viewpoint_vec = self.consistency.embed(opinion_text)?;
        let viewpoint_hits = self.consistency.search_viewpoints(&viewpoint_vec, 1)?;
        let viewpoint_hit = viewpoint_hits
            .first()
            .filter(|(sim, _)| *sim >= self.config.viewpoint_threshold);
        let Some(&(viewpoint_sim, viewpoint_row)) = viewpoint_hit else {
            debug!("viewpoint gate failed, filing under matched keyword");
            return self.create_viewpoint(
                opinion_text,
                theme,
                &matched_keyword,
                NewPath::ExistingKeyword,
                trace,
            );
        };
        debug!(viewpoint_sim, "viewpoint gate passed");

        // Exact-match path.
        match self.resolve_matched_viewpoint(viewpoint_row, &matched_keyword)? {
            Some(viewpoint) => {
                self.existing_viewpoint_path(theme, matched_keyword, viewpoint, trace)
            }
            None => {
                // All degrade steps failed to find a row: fall through to
                // viewpoint creation rather than erroring.
                warn!(
                    viewpoint_row,
                    "matched row unresolvable in store, creating new viewpoint"
                );
                self.create_viewpoint(
                    opinion_text,
                    theme,
                    &matched_keyword,
                    NewPath::ExistingKeyword,
                    trace,
                )
            }
        }
    }

    /// Map a matched index row back to a store row, degrading through
    /// keyword-substring lookup and then the most recent viewpoint when
    /// the resolved id no longer exists (desync).
    fn resolve_matched_viewpoint(
        &self,
        row: usize,
        matched_keyword: &str,
    ) -> StanceResult<Option<Viewpoint>> {
        if let Some(id) = self.consistency.resolve_viewpoint_id(row) {
            if let Some(vp) = self.store.viewpoint(id)? {
                return Ok(Some(vp));
            }
            warn!(id, row, "mapped viewpoint id missing from store, degrading");
        } else {
            warn!(row, "index row has no mapped id, degrading");
        }

        if let Some(vp) = self.store.find_by_keyword_fragment(matched_keyword)? {
            debug!(id = vp.id, "recovered viewpoint via keyword fragment");
            return Ok(Some(vp));
        }
        Ok(self.store.most_recent_viewpoint()?)
    }

    /// Exact-match terminal path: stored evidence, else ephemeral crawler
    /// refresh, else persisted generator fallback.
    fn existing_viewpoint_path(
        &mut self,
        theme: Theme,
        keyword: String,
        viewpoint: Viewpoint,
        mut trace: Trace,
    ) -> StanceResult<RetrievalOutcome> {
        let fallback = match self.chain.acquire(
            Some(viewpoint.id),
            &viewpoint.text,
            &keyword,
            &mut trace,
        ) {
            Ok(outcome) => outcome,
            Err(StanceError::Retrieval(e)) => {
                warn!(error = %e, "every fallback tier failed");
                return Ok(RetrievalOutcome::Failed {
                    theme: Some(theme),
                    keyword: Some(keyword),
                    reason: e.to_string(),
                    trace,
                });
            }
            Err(e) => return Err(e),
        };

        let FallbackOutcome { candidates, tier } = fallback;
        match tier {
            Tier::Store => {
                info!(viewpoint_id = viewpoint.id, "exact match with stored evidence");
                Ok(RetrievalOutcome::ExactMatch {
                    theme,
                    keyword,
                    viewpoint_id: viewpoint.id,
                    evidence: RankedEvidence::rank_all(&candidates),
                    trace,
                })
            }
            Tier::Crawler => {
                // Refresh for an existing viewpoint is ephemeral.
                info!(viewpoint_id = viewpoint.id, "crawler refresh, not persisted");
                Ok(RetrievalOutcome::CrawlerRefresh {
                    theme,
                    keyword,
                    viewpoint_id: viewpoint.id,
                    evidence: RankedEvidence::rank_all(&candidates),
                    persisted: false,
                    trace,
                })
            }
            Tier::Generator => {
                self.persist_candidates(viewpoint.id, &candidates)?;
                info!(viewpoint_id = viewpoint.id, "generator fallback, persisted");
                Ok(RetrievalOutcome::GeneratorFallback {
                    theme,
                    keyword,
                    viewpoint_id: Some(viewpoint.id),
                    evidence: RankedEvidence::rank_all(&candidates),
                    persisted: true,
                    trace,
                })
            }
        }
    }

    /// Viewpoint-creation terminal path, shared by the completely-new and
    /// new-viewpoint-existing-keyword branches.
    fn create_viewpoint(
        &mut self,
        opinion_text: &str,
        theme: Theme,
        keywords: &str,
        path: NewPath,
        mut trace: Trace,
    ) -> StanceResult<RetrievalOutcome> {
        // Acquire evidence first: if even the generator cannot produce
        // anything, no viewpoint is created at all.
        let fallback = match self.chain.acquire(None, opinion_text, keywords, &mut trace) {
            Ok(outcome) => outcome,
            Err(StanceError::Retrieval(e)) => {
                warn!(error = %e, "fallback exhausted, not creating viewpoint");
                return Ok(RetrievalOutcome::Failed {
                    theme: Some(theme),
                    keyword: Some(keywords.to_string()),
                    reason: e.to_string(),
                    trace,
                });
            }
            Err(e) => return Err(e),
        };

        // Store insert, then index add: two separate non-transactional
        // steps. A crash in between leaves an orphan store row invisible
        // to search until the next full rebuild.
        let id = self.store.insert_viewpoint(opinion_text, theme, keywords)?;
        let viewpoint = self.store.viewpoint(id)?.ok_or_else(|| {
            StanceError::from(stance_core::errors::StoreError::NotFound {
                entity: "viewpoint",
                id,
            })
        })?;
        self.consistency.add_viewpoint(&viewpoint)?;
        self.persist_candidates(id, &fallback.candidates)?;

        info!(viewpoint_id = id, ?path, tier = ?fallback.tier, "created viewpoint");

        let evidence = RankedEvidence::rank_all(&fallback.candidates);
        let keyword = keywords.to_string();
        let outcome = match (path, fallback.tier) {
            (_, Tier::Generator) => RetrievalOutcome::GeneratorFallback {
                theme,
                keyword,
                viewpoint_id: Some(id),
                evidence,
                persisted: true,
                trace,
            },
            (NewPath::CompletelyNew, _) => RetrievalOutcome::CompletelyNew {
                theme,
                keyword,
                viewpoint_id: id,
                evidence,
                persisted: true,
                trace,
            },
            (NewPath::ExistingKeyword, _) => RetrievalOutcome::NewViewpointExistingKeyword {
                theme,
                keyword,
                viewpoint_id: id,
                evidence,
                persisted: true,
                trace,
            },
        };
        Ok(outcome)
    }

    fn persist_candidates(
        &self,
        viewpoint_id: i64,
        candidates: &[stance_core::models::EvidenceCandidate],
    ) -> StanceResult<()> {
        let rows: Vec<NewEvidence> = candidates
            .iter()
            .map(|c| NewEvidence {
                text: c.text.clone(),
                acceptance_rate: c.acceptance_rate,
                source: c.source,
            })
            .collect();
        self.store.insert_evidence(viewpoint_id, &rows)?;
        Ok(())
    }
}
