//! End-to-end pipeline scenarios with scripted collaborators.
//!
//! The embedder maps known texts to hand-picked 4-dimensional unit vectors
//! so every gate's cosine similarity is exact and the decision taken at
//! each threshold is fully controlled.

use std::collections::HashMap;

use tempfile::TempDir;

use stance_core::config::{IndexConfig, RetrievalConfig};
use stance_core::errors::{StanceError, StanceResult};
use stance_core::models::{EvidenceSource, NewEvidence, RetrievalOutcome, Theme, TraceStep};
use stance_core::traits::{
    Classification, Classifier, Crawler, Embedder, Generator, ScoreJudgment, Scorer,
    ViewpointStore,
};
use stance_retrieval::RetrievalPipeline;
use stance_store::EvidenceStore;

// Base vectors. NEAR_E1 has cosine 0.9 against E1, clearing the keyword
// gate (0.7) and the viewpoint gate (0.8); E2 and E3 are orthogonal to E1.
const E1: [f32; 4] = [1.0, 0.0, 0.0, 0.0];
const E2: [f32; 4] = [0.0, 1.0, 0.0, 0.0];
const E3: [f32; 4] = [0.0, 0.0, 1.0, 0.0];
const NEAR_E1: [f32; 4] = [0.9, 0.435_889_9, 0.0, 0.0];

struct MapEmbedder {
    map: HashMap<String, Vec<f32>>,
}

impl MapEmbedder {
    fn new(entries: &[(&str, [f32; 4])]) -> Self {
        let map = entries
            .iter()
            .map(|(text, v)| (text.to_string(), v.to_vec()))
            .collect();
        Self { map }
    }
}

impl Embedder for MapEmbedder {
    fn embed(&self, text: &str) -> StanceResult<Vec<f32>> {
        // Unmapped texts (the dimension sentinel among them) get a fixed
        // vector far from every base vector used by the scenarios.
        Ok(self
            .map
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0, 0.0, 0.0, 1.0]))
    }
}

struct MapClassifier {
    map: HashMap<String, (Theme, String)>,
}

impl MapClassifier {
    fn new(entries: &[(&str, Theme, &str)]) -> Self {
        let map = entries
            .iter()
            .map(|(text, theme, kw)| (text.to_string(), (*theme, kw.to_string())))
            .collect();
        Self { map }
    }
}

impl Classifier for MapClassifier {
    fn classify(&self, text: &str) -> StanceResult<Classification> {
        let (theme, keyword) = self
            .map
            .get(text)
            .cloned()
            .ok_or_else(|| StanceError::collaborator("classifier", format!("unmapped: {text}")))?;
        Ok(Classification { theme, keyword })
    }
}

struct MapScorer {
    map: HashMap<String, f64>,
}

impl MapScorer {
    fn new(entries: &[(&str, f64)]) -> Self {
        let map = entries
            .iter()
            .map(|(text, v)| (text.to_string(), *v))
            .collect();
        Self { map }
    }
}

impl Scorer for MapScorer {
    fn score(&self, _viewpoint: &str, evidence: &str) -> StanceResult<ScoreJudgment> {
        Ok(ScoreJudgment::clean(
            self.map.get(evidence).copied().unwrap_or(0.0),
        ))
    }
}

struct ScriptedCrawler {
    map: HashMap<String, Vec<String>>,
}

impl ScriptedCrawler {
    fn new(entries: &[(&str, &[&str])]) -> Self {
        let map = entries
            .iter()
            .map(|(query, passages)| {
                (
                    query.to_string(),
                    passages.iter().map(|p| p.to_string()).collect(),
                )
            })
            .collect();
        Self { map }
    }

    fn empty() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl Crawler for ScriptedCrawler {
    fn search(&self, query: &str) -> StanceResult<Vec<String>> {
        Ok(self.map.get(query).cloned().unwrap_or_default())
    }
}

struct ListGenerator {
    items: Vec<String>,
}

impl ListGenerator {
    fn new(items: &[&str]) -> Self {
        Self {
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Generator for ListGenerator {
    fn generate(
        &self,
        _viewpoint: &str,
        _seed: Option<&str>,
        _count: usize,
    ) -> StanceResult<Vec<String>> {
        Ok(self.items.clone())
    }
}

struct FailingGenerator;

impl Generator for FailingGenerator {
    fn generate(
        &self,
        _viewpoint: &str,
        _seed: Option<&str>,
        _count: usize,
    ) -> StanceResult<Vec<String>> {
        Err(StanceError::collaborator("generator", "backend offline"))
    }
}

const SEED_TEXT: &str = "Free trade agreements raise living standards";
const SEED_KEYWORD: &str = "free trade";
const SEED_PASSAGE: &str = "Tariff cuts lifted household income in member states";

fn seed_embedder() -> MapEmbedder {
    MapEmbedder::new(&[(SEED_TEXT, E1), (SEED_KEYWORD, E1)])
}

fn seed_crawler() -> ScriptedCrawler {
    ScriptedCrawler::new(&[(SEED_KEYWORD, &[SEED_PASSAGE])])
}

/// Plant the seed viewpoint through the pipeline itself and return its id.
fn seed(pipeline: &mut RetrievalPipeline<'_>) -> i64 {
    let outcome = pipeline.process(SEED_TEXT).unwrap();
    match outcome {
        RetrievalOutcome::CompletelyNew { viewpoint_id, .. } => viewpoint_id,
        other => panic!("seeding produced {other:?}"),
    }
}

#[test]
fn completely_new_theme_skips_vector_gates() {
    let dir = TempDir::new().unwrap();
    let store = EvidenceStore::open(&dir.path().join("kb.sqlite")).unwrap();
    let embedder = seed_embedder();
    let classifier = MapClassifier::new(&[(SEED_TEXT, Theme::Economy, SEED_KEYWORD)]);
    let scorer = MapScorer::new(&[(SEED_PASSAGE, 0.8)]);
    let generator = ListGenerator::new(&["a", "b", "c", "d", "e"]);
    let crawler = seed_crawler();
    let mut pipeline = RetrievalPipeline::new(
        &store,
        &embedder,
        &classifier,
        &scorer,
        &generator,
        &crawler,
        IndexConfig::new(dir.path()),
        RetrievalConfig::default(),
    )
    .unwrap();

    let outcome = pipeline.process(SEED_TEXT).unwrap();
    let RetrievalOutcome::CompletelyNew {
        theme,
        keyword,
        viewpoint_id,
        evidence,
        persisted,
        trace,
    } = outcome
    else {
        panic!("expected completely_new, got {outcome:?}");
    };
    assert_eq!(theme, Theme::Economy);
    assert_eq!(keyword, SEED_KEYWORD);
    assert!(persisted);
    assert_eq!(evidence.len(), 1);
    assert_eq!(evidence[0].rank, 1);
    assert_eq!(evidence[0].text, SEED_PASSAGE);
    assert_eq!(evidence[0].source, EvidenceSource::Crawler);
    // An empty theme means no similarity search at all.
    assert_eq!(trace.steps(), &[TraceStep::ThemeGate, TraceStep::CrawlerTier]);

    assert_eq!(store.viewpoint_count().unwrap(), 1);
    assert_eq!(store.evidence_for(viewpoint_id).unwrap().len(), 1);
    let health = pipeline.index_health();
    assert_eq!(health.keyword_rows, 1);
    assert_eq!(health.viewpoint_rows, 1);
    assert_eq!(health.id_map_len, 1);
}

#[test]
fn exact_match_serves_stored_evidence() {
    let query = "Lowering trade barriers raises living standards";
    let dir = TempDir::new().unwrap();
    let store = EvidenceStore::open(&dir.path().join("kb.sqlite")).unwrap();
    let embedder = MapEmbedder::new(&[
        (SEED_TEXT, E1),
        (SEED_KEYWORD, E1),
        (query, NEAR_E1),
        ("trade deals", NEAR_E1),
    ]);
    let classifier = MapClassifier::new(&[
        (SEED_TEXT, Theme::Economy, SEED_KEYWORD),
        (query, Theme::Economy, "trade deals"),
    ]);
    let scorer = MapScorer::new(&[(SEED_PASSAGE, 0.8)]);
    let generator = ListGenerator::new(&["a", "b", "c", "d", "e"]);
    let crawler = seed_crawler();
    let mut pipeline = RetrievalPipeline::new(
        &store,
        &embedder,
        &classifier,
        &scorer,
        &generator,
        &crawler,
        IndexConfig::new(dir.path()),
        RetrievalConfig::default(),
    )
    .unwrap();
    let seed_id = seed(&mut pipeline);

    let outcome = pipeline.process(query).unwrap();
    let RetrievalOutcome::ExactMatch {
        keyword,
        viewpoint_id,
        evidence,
        trace,
        ..
    } = outcome
    else {
        panic!("expected exact_match, got {outcome:?}");
    };
    assert_eq!(viewpoint_id, seed_id);
    // The keyword reported is the matched stored one, not the freshly
    // extracted "trade deals".
    assert_eq!(keyword, SEED_KEYWORD);
    assert_eq!(evidence.len(), 1);
    assert_eq!(evidence[0].text, SEED_PASSAGE);
    assert!(trace.steps().contains(&TraceStep::ViewpointGate));
    assert!(trace.steps().contains(&TraceStep::StoreTier));
    // No new viewpoint was filed.
    assert_eq!(store.viewpoint_count().unwrap(), 1);
}

#[test]
fn crawler_refresh_is_never_persisted() {
    let query = "Lowering trade barriers raises living standards";
    let dir = TempDir::new().unwrap();
    let store = EvidenceStore::open(&dir.path().join("kb.sqlite")).unwrap();
    let embedder = MapEmbedder::new(&[
        (SEED_TEXT, E1),
        (SEED_KEYWORD, E1),
        (query, NEAR_E1),
        ("trade deals", NEAR_E1),
    ]);
    let classifier = MapClassifier::new(&[
        (SEED_TEXT, Theme::Economy, SEED_KEYWORD),
        (query, Theme::Economy, "trade deals"),
    ]);
    let scorer = MapScorer::new(&[(SEED_PASSAGE, 0.8)]);
    let generator = ListGenerator::new(&["a", "b", "c", "d", "e"]);
    let crawler = seed_crawler();
    let mut pipeline = RetrievalPipeline::new(
        &store,
        &embedder,
        &classifier,
        &scorer,
        &generator,
        &crawler,
        IndexConfig::new(dir.path()),
        RetrievalConfig::default(),
    )
    .unwrap();
    let seed_id = seed(&mut pipeline);

    // Negative feedback pushes the stored row below the acceptance floor.
    let rows = store.evidence_for(seed_id).unwrap();
    store
        .record_feedback(rows[0].id, 0.2, "rejected", -1.0)
        .unwrap();

    let outcome = pipeline.process(query).unwrap();
    let RetrievalOutcome::CrawlerRefresh {
        viewpoint_id,
        evidence,
        persisted,
        trace,
        ..
    } = outcome
    else {
        panic!("expected crawler_refresh, got {outcome:?}");
    };
    assert_eq!(viewpoint_id, seed_id);
    assert!(!persisted);
    assert_eq!(evidence[0].text, SEED_PASSAGE);
    assert!(trace.steps().contains(&TraceStep::StoreTier));
    assert!(trace.steps().contains(&TraceStep::CrawlerTier));

    // The store still holds exactly the demoted row.
    let rows = store.evidence_for(seed_id).unwrap();
    assert_eq!(rows.len(), 1);
    assert!((rows[0].acceptance_rate - 0.2).abs() < 1e-9);
}

#[test]
fn viewpoint_gate_miss_files_under_matched_keyword() {
    let query = "Trade policy is ruining domestic manufacturing";
    let fresh = "Import competition closed three plants in a decade";
    let dir = TempDir::new().unwrap();
    let store = EvidenceStore::open(&dir.path().join("kb.sqlite")).unwrap();
    let embedder = MapEmbedder::new(&[
        (SEED_TEXT, E1),
        (SEED_KEYWORD, E1),
        (query, E2),
        ("trade policy", NEAR_E1),
    ]);
    let classifier = MapClassifier::new(&[
        (SEED_TEXT, Theme::Economy, SEED_KEYWORD),
        (query, Theme::Economy, "trade policy"),
    ]);
    let scorer = MapScorer::new(&[(SEED_PASSAGE, 0.8), (fresh, 0.7)]);
    let generator = ListGenerator::new(&["a", "b", "c", "d", "e"]);
    let crawler = ScriptedCrawler::new(&[(SEED_KEYWORD, &[SEED_PASSAGE]), (query, &[fresh])]);
    let mut pipeline = RetrievalPipeline::new(
        &store,
        &embedder,
        &classifier,
        &scorer,
        &generator,
        &crawler,
        IndexConfig::new(dir.path()),
        RetrievalConfig::default(),
    )
    .unwrap();
    let seed_id = seed(&mut pipeline);

    let outcome = pipeline.process(query).unwrap();
    let RetrievalOutcome::NewViewpointExistingKeyword {
        keyword,
        viewpoint_id,
        persisted,
        trace,
        ..
    } = outcome
    else {
        panic!("expected new_viewpoint_existing_keyword, got {outcome:?}");
    };
    assert_ne!(viewpoint_id, seed_id);
    assert!(persisted);
    // The new viewpoint is filed under the existing keyword, not the
    // freshly extracted one.
    assert_eq!(keyword, SEED_KEYWORD);
    let filed = store.viewpoint(viewpoint_id).unwrap().unwrap();
    assert_eq!(filed.keywords, SEED_KEYWORD);
    assert_eq!(filed.text, query);
    assert!(trace.steps().contains(&TraceStep::ViewpointGate));

    assert_eq!(store.viewpoint_count().unwrap(), 2);
    assert_eq!(pipeline.index_health().keyword_rows, 2);
}

#[test]
fn generator_fallback_flags_low_confidence_and_persists() {
    let query = "Naval power deters regional aggression";
    let g = [
        "Generated point one",
        "Generated point two",
        "Generated point three",
        "Generated point four",
        "Generated point five",
    ];
    let dir = TempDir::new().unwrap();
    let store = EvidenceStore::open(&dir.path().join("kb.sqlite")).unwrap();
    let embedder = MapEmbedder::new(&[
        (SEED_TEXT, E1),
        (SEED_KEYWORD, E1),
        (query, E3),
        ("naval power", E3),
    ]);
    let classifier = MapClassifier::new(&[
        (SEED_TEXT, Theme::Economy, SEED_KEYWORD),
        (query, Theme::Economy, "naval power"),
    ]);
    let scorer = MapScorer::new(&[
        (SEED_PASSAGE, 0.8),
        (g[0], 0.1),
        (g[1], 0.3),
        (g[2], 0.2),
        (g[3], 0.05),
        (g[4], 0.4),
    ]);
    let generator = ListGenerator::new(&g);
    let crawler = seed_crawler();
    let mut pipeline = RetrievalPipeline::new(
        &store,
        &embedder,
        &classifier,
        &scorer,
        &generator,
        &crawler,
        IndexConfig::new(dir.path()),
        RetrievalConfig::default(),
    )
    .unwrap();
    seed(&mut pipeline);

    let outcome = pipeline.process(query).unwrap();
    let RetrievalOutcome::GeneratorFallback {
        viewpoint_id,
        evidence,
        persisted,
        trace,
        ..
    } = outcome
    else {
        panic!("expected generator_fallback, got {outcome:?}");
    };
    let id = viewpoint_id.unwrap();
    assert!(persisted);
    // All five came back, sorted by score, every one flagged.
    assert_eq!(evidence.len(), 5);
    let rates: Vec<f64> = evidence.iter().map(|e| e.acceptance_rate).collect();
    assert_eq!(rates, vec![0.4, 0.3, 0.2, 0.1, 0.05]);
    assert!(evidence.iter().all(|e| e.low_confidence));
    assert!(evidence.iter().all(|e| e.source == EvidenceSource::Generated));
    // Keyword gate failed, so the viewpoint gate never ran.
    assert!(trace.steps().contains(&TraceStep::KeywordGate));
    assert!(!trace.steps().contains(&TraceStep::ViewpointGate));
    assert!(trace.steps().contains(&TraceStep::GeneratorTier));

    let rows = store.evidence_for(id).unwrap();
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.source == EvidenceSource::Generated));
}

#[test]
fn exact_match_generator_fallback_appends_to_existing_viewpoint() {
    let query = "Lowering trade barriers raises living standards";
    let g = [
        "Generated point one",
        "Generated point two",
        "Generated point three",
        "Generated point four",
        "Generated point five",
    ];
    let dir = TempDir::new().unwrap();
    let store = EvidenceStore::open(&dir.path().join("kb.sqlite")).unwrap();
    let embedder = MapEmbedder::new(&[
        (SEED_TEXT, E1),
        (SEED_KEYWORD, E1),
        (query, NEAR_E1),
        ("trade deals", NEAR_E1),
    ]);
    let classifier = MapClassifier::new(&[
        (SEED_TEXT, Theme::Economy, SEED_KEYWORD),
        (query, Theme::Economy, "trade deals"),
    ]);
    let scorer = MapScorer::new(&[
        (g[0], 0.1),
        (g[1], 0.3),
        (g[2], 0.2),
        (g[3], 0.05),
        (g[4], 0.4),
    ]);
    let generator = ListGenerator::new(&g);
    // The crawler never yields, so both the seed and the later match
    // land on the generator tier.
    let crawler = ScriptedCrawler::empty();
    let mut pipeline = RetrievalPipeline::new(
        &store,
        &embedder,
        &classifier,
        &scorer,
        &generator,
        &crawler,
        IndexConfig::new(dir.path()),
        RetrievalConfig::default(),
    )
    .unwrap();

    let seed_id = match pipeline.process(SEED_TEXT).unwrap() {
        RetrievalOutcome::GeneratorFallback { viewpoint_id, .. } => viewpoint_id.unwrap(),
        other => panic!("seeding produced {other:?}"),
    };

    // Exact match on the seed viewpoint; its stored rows are all below
    // the acceptance floor, so the chain escalates past the store and the
    // empty crawler to the generator, persisting onto the matched row.
    let outcome = pipeline.process(query).unwrap();
    let RetrievalOutcome::GeneratorFallback {
        viewpoint_id,
        evidence,
        persisted,
        trace,
        ..
    } = outcome
    else {
        panic!("expected generator_fallback, got {outcome:?}");
    };
    assert_eq!(viewpoint_id, Some(seed_id));
    assert!(persisted);
    let rates: Vec<f64> = evidence.iter().map(|e| e.acceptance_rate).collect();
    assert_eq!(rates, vec![0.4, 0.3, 0.2, 0.1, 0.05]);
    assert!(evidence.iter().all(|e| e.low_confidence));
    assert!(trace.steps().contains(&TraceStep::ViewpointGate));
    assert!(trace.steps().contains(&TraceStep::StoreTier));
    assert!(trace.steps().contains(&TraceStep::CrawlerTier));
    assert!(trace.steps().contains(&TraceStep::GeneratorTier));

    // No new viewpoint: the rows were appended to the matched one.
    assert_eq!(store.viewpoint_count().unwrap(), 1);
    assert_eq!(store.evidence_for(seed_id).unwrap().len(), 10);
}

#[test]
fn generation_failure_reports_failed_and_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let store = EvidenceStore::open(&dir.path().join("kb.sqlite")).unwrap();
    let embedder = seed_embedder();
    let classifier = MapClassifier::new(&[(SEED_TEXT, Theme::Economy, SEED_KEYWORD)]);
    let scorer = MapScorer::new(&[]);
    let generator = FailingGenerator;
    let crawler = ScriptedCrawler::empty();
    let mut pipeline = RetrievalPipeline::new(
        &store,
        &embedder,
        &classifier,
        &scorer,
        &generator,
        &crawler,
        IndexConfig::new(dir.path()),
        RetrievalConfig::default(),
    )
    .unwrap();

    let outcome = pipeline.process(SEED_TEXT).unwrap();
    let RetrievalOutcome::Failed {
        theme,
        keyword,
        reason,
        ..
    } = outcome
    else {
        panic!("expected failed, got {outcome:?}");
    };
    assert_eq!(theme, Some(Theme::Economy));
    assert_eq!(keyword, Some(SEED_KEYWORD.to_string()));
    assert!(reason.contains("backend offline"));
    // No half-created viewpoint.
    assert_eq!(store.viewpoint_count().unwrap(), 0);
    assert_eq!(pipeline.index_health().viewpoint_rows, 0);
}

#[test]
fn malformed_stored_rate_is_a_hard_error() {
    let query = "Lowering trade barriers raises living standards";
    let dir = TempDir::new().unwrap();
    let store = EvidenceStore::open(&dir.path().join("kb.sqlite")).unwrap();
    let embedder = MapEmbedder::new(&[
        (SEED_TEXT, E1),
        (SEED_KEYWORD, E1),
        (query, NEAR_E1),
        ("trade deals", NEAR_E1),
    ]);
    let classifier = MapClassifier::new(&[
        (SEED_TEXT, Theme::Economy, SEED_KEYWORD),
        (query, Theme::Economy, "trade deals"),
    ]);
    let scorer = MapScorer::new(&[(SEED_PASSAGE, 0.8)]);
    let generator = ListGenerator::new(&["a", "b", "c", "d", "e"]);
    let crawler = seed_crawler();
    let mut pipeline = RetrievalPipeline::new(
        &store,
        &embedder,
        &classifier,
        &scorer,
        &generator,
        &crawler,
        IndexConfig::new(dir.path()),
        RetrievalConfig::default(),
    )
    .unwrap();
    let seed_id = seed(&mut pipeline);

    // An out-of-range score written behind the pipeline's back.
    store
        .insert_evidence(
            seed_id,
            &[NewEvidence {
                text: "corrupted row".into(),
                acceptance_rate: 1.5,
                source: EvidenceSource::Store,
            }],
        )
        .unwrap();

    let err = pipeline.process(query).unwrap_err();
    assert!(matches!(err, StanceError::Selector(_)), "got {err:?}");
}

#[test]
fn restart_reloads_indices_and_cache() {
    let query = "Lowering trade barriers raises living standards";
    let dir = TempDir::new().unwrap();
    let store = EvidenceStore::open(&dir.path().join("kb.sqlite")).unwrap();
    let embedder = MapEmbedder::new(&[
        (SEED_TEXT, E1),
        (SEED_KEYWORD, E1),
        (query, NEAR_E1),
        ("trade deals", NEAR_E1),
    ]);
    let classifier = MapClassifier::new(&[
        (SEED_TEXT, Theme::Economy, SEED_KEYWORD),
        (query, Theme::Economy, "trade deals"),
    ]);
    let scorer = MapScorer::new(&[(SEED_PASSAGE, 0.8)]);
    let generator = ListGenerator::new(&["a", "b", "c", "d", "e"]);
    let crawler = seed_crawler();

    let seed_id = {
        let mut pipeline = RetrievalPipeline::new(
            &store,
            &embedder,
            &classifier,
            &scorer,
            &generator,
            &crawler,
            IndexConfig::new(dir.path()),
            RetrievalConfig::default(),
        )
        .unwrap();
        seed(&mut pipeline)
    };

    let mut pipeline = RetrievalPipeline::new(
        &store,
        &embedder,
        &classifier,
        &scorer,
        &generator,
        &crawler,
        IndexConfig::new(dir.path()),
        RetrievalConfig::default(),
    )
    .unwrap();
    let health = pipeline.index_health();
    assert_eq!(health.dimension, 4);
    assert_eq!(health.keyword_rows, 1);
    assert_eq!(health.viewpoint_rows, 1);
    assert_eq!(health.id_map_len, 1);
    // The viewpoint text and its keyword basis were cached during seeding.
    assert_eq!(health.cached_embeddings, 2);
    assert!(health.last_repair.is_none());

    let outcome = pipeline.process(query).unwrap();
    match outcome {
        RetrievalOutcome::ExactMatch { viewpoint_id, .. } => assert_eq!(viewpoint_id, seed_id),
        other => panic!("expected exact_match after restart, got {other:?}"),
    }
}
