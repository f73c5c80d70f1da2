//! Escalating evidence-acquisition chain: store → crawler → generator.
//!
//! Each tier runs only if the previous yielded nothing after quality
//! filtering. Collaborator failures inside a tier downgrade to the next
//! tier; only a hard generation failure escapes this module.

use std::sync::Mutex;

use tracing::{debug, warn};

use stance_core::config::RetrievalConfig;
use stance_core::errors::{RetrievalError, StanceResult};
use stance_core::models::{EvidenceCandidate, EvidenceSource, Trace, TraceStep};
use stance_core::traits::{Crawler, Generator, Scorer, ViewpointStore};

use crate::pacing::TokenBucket;
use crate::selector::select_top;

/// Which tier produced the evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Store,
    Crawler,
    Generator,
}

#[derive(Debug)]
pub struct FallbackOutcome {
    pub candidates: Vec<EvidenceCandidate>,
    pub tier: Tier,
}

pub struct FallbackChain<'a> {
    store: &'a dyn ViewpointStore,
    scorer: &'a dyn Scorer,
    generator: &'a dyn Generator,
    crawler: &'a dyn Crawler,
    pacer: Mutex<TokenBucket>,
    config: RetrievalConfig,
}

impl<'a> FallbackChain<'a> {
    pub fn new(
        store: &'a dyn ViewpointStore,
        scorer: &'a dyn Scorer,
        generator: &'a dyn Generator,
        crawler: &'a dyn Crawler,
        config: RetrievalConfig,
    ) -> Self {
        let pacer = Mutex::new(TokenBucket::new(config.crawler_rate, config.crawler_burst));
        Self {
            store,
            scorer,
            generator,
            crawler,
            pacer,
            config,
        }
    }

    /// Escalate through the tiers until one yields evidence.
    ///
    /// The store tier applies only when an existing viewpoint is in hand.
    /// The generator tier cannot yield nothing: it either returns exactly
    /// `generated_count` candidates (below-threshold ones flagged
    /// `low_confidence`) or fails hard.
    pub fn acquire(
        &self,
        viewpoint_id: Option<i64>,
        viewpoint_text: &str,
        keyword: &str,
        trace: &mut Trace,
    ) -> StanceResult<FallbackOutcome> {
        // Tier A: stored evidence.
        if let Some(id) = viewpoint_id {
            trace.push(TraceStep::StoreTier);
            let stored = self.store.evidence_for(id)?;
            let candidates: Vec<EvidenceCandidate> =
                stored.iter().map(EvidenceCandidate::from_stored).collect();
            let selected = select_top(
                &candidates,
                self.config.min_acceptance_rate,
                self.config.max_evidence,
            )?;
            if !selected.is_empty() {
                return Ok(FallbackOutcome {
                    candidates: selected,
                    tier: Tier::Store,
                });
            }
            debug!(viewpoint_id = id, "no stored evidence cleared the filter");
        }

        // Tier B: crawler.
        trace.push(TraceStep::CrawlerTier);
        let (selected, best_raw) = self.crawler_tier(viewpoint_text, keyword)?;
        if !selected.is_empty() {
            return Ok(FallbackOutcome {
                candidates: selected,
                tier: Tier::Crawler,
            });
        }

        // Tier C: generator, seeded with the best crawler candidate if any.
        trace.push(TraceStep::GeneratorTier);
        let candidates = self.generator_tier(viewpoint_text, best_raw.as_deref())?;
        Ok(FallbackOutcome {
            candidates,
            tier: Tier::Generator,
        })
    }

    /// Issue query-term variants to the crawler, score every returned
    /// passage, and quality-filter. Also reports the single highest-scored
    /// candidate text (filter or not) for seeding the generator tier.
    fn crawler_tier(
        &self,
        viewpoint_text: &str,
        keyword: &str,
    ) -> StanceResult<(Vec<EvidenceCandidate>, Option<String>)> {
        let with_suffix = format!("{keyword} evidence");
        let mut variants: Vec<&str> = Vec::with_capacity(3);
        for candidate in [keyword, with_suffix.as_str(), viewpoint_text] {
            if !variants.contains(&candidate) {
                variants.push(candidate);
            }
        }

        let mut passages: Vec<String> = Vec::new();
        for variant in variants {
            if variant.trim().is_empty() {
                continue;
            }
            if !self.acquire_token() {
                debug!(variant, "pacing denied crawler query, skipping variant");
                continue;
            }
            match self.crawler.search(variant) {
                Ok(found) => passages.extend(found),
                Err(e) => {
                    warn!(variant, error = %e, "crawler query failed, continuing");
                }
            }
        }

        let mut scored = Vec::with_capacity(passages.len());
        for passage in &passages {
            if passage.trim().is_empty() {
                continue;
            }
            scored.push(self.score_candidate(viewpoint_text, passage, EvidenceSource::Crawler));
        }

        let best_raw = scored
            .iter()
            .max_by(|a, b| {
                a.acceptance_rate
                    .partial_cmp(&b.acceptance_rate)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|c| c.text.clone());

        let selected = select_top(
            &scored,
            self.config.min_acceptance_rate,
            self.config.max_evidence,
        )?;
        Ok((selected, best_raw))
    }

    /// Ask the generator for exactly `generated_count` statements and keep
    /// all of them regardless of threshold, flagging the weak ones. A
    /// degraded answer is recorded as degraded, not discarded.
    fn generator_tier(
        &self,
        viewpoint_text: &str,
        seed: Option<&str>,
    ) -> StanceResult<Vec<EvidenceCandidate>> {
        let count = self.config.generated_count;
        let items = self
            .generator
            .generate(viewpoint_text, seed, count)
            .map_err(|e| RetrievalError::GenerationInvalid {
                reason: e.to_string(),
            })?;

        if items.len() != count {
            return Err(RetrievalError::GenerationCountMismatch {
                expected: count,
                actual: items.len(),
            }
            .into());
        }
        if let Some(bad) = items.iter().position(|item| item.trim().is_empty()) {
            return Err(RetrievalError::GenerationInvalid {
                reason: format!("item {bad} is empty"),
            }
            .into());
        }

        let mut candidates: Vec<EvidenceCandidate> = items
            .iter()
            .map(|item| {
                let mut c =
                    self.score_candidate(viewpoint_text, item, EvidenceSource::Generated);
                c.low_confidence = c.acceptance_rate < self.config.min_acceptance_rate;
                c
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.acceptance_rate
                .partial_cmp(&a.acceptance_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(candidates)
    }

    /// Score one passage. Per-item scoring failure is soft: the item is
    /// kept at 0.0 with the error attached as a note.
    fn score_candidate(
        &self,
        viewpoint_text: &str,
        passage: &str,
        source: EvidenceSource,
    ) -> EvidenceCandidate {
        let mut candidate = EvidenceCandidate::new(passage, 0.0, source);
        match self.scorer.score(viewpoint_text, passage) {
            Ok(judgment) => {
                candidate.acceptance_rate = judgment.value.clamp(0.0, 1.0);
                candidate.note = judgment.note;
            }
            Err(e) => {
                warn!(error = %e, "scoring failed, keeping item at 0.0");
                candidate.note = Some(e.to_string());
            }
        }
        candidate
    }

    fn acquire_token(&self) -> bool {
        match self.pacer.lock() {
            Ok(mut bucket) => bucket.try_acquire(),
            Err(_) => false,
        }
    }
}
