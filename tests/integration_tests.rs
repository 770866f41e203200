//! Integration tests for the skill-gap pipeline

use skill_gap::config::Config;
use skill_gap::error::{Result, SkillGapError};
use skill_gap::processing::aggregator::PostingRawInput;
use skill_gap::processing::analyzer::{AnalysisContext, AnalysisEngine, AnalysisRequest};
use skill_gap::processing::deadline::Deadline;
use skill_gap::processing::embeddings::EmbeddingProvider;
use skill_gap::processing::extractor::{CandidateRawInput, CandidateSkillMention};
use skill_gap::processing::gap_scorer::{GapKind, GapPriority};
use skill_gap::processing::validator::Proficiency;
use skill_gap::taxonomy::{SkillCategory, TaxonomyEntry, TaxonomySpec};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Maps known strings (case-insensitive) to fixed vectors. Anything else
/// lands on the last axis, which no taxonomy term uses.
struct FixtureProvider {
    vectors: HashMap<String, Vec<f32>>,
    dimensions: usize,
    calls: AtomicUsize,
    failures_left: AtomicUsize,
    delay: Duration,
}

impl FixtureProvider {
    fn new(dimensions: usize) -> Self {
        Self {
            vectors: HashMap::new(),
            dimensions,
            calls: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), self.dimensions);
        self.vectors.insert(text.to_lowercase(), vector);
        self
    }

    fn failing(self, failures: usize) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn noise(&self) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];
        vector[self.dimensions - 1] = 1.0;
        vector
    }
}

impl EmbeddingProvider for FixtureProvider {
    fn embed(&self, texts: &[String], _timeout: Duration) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SkillGapError::EmbeddingProvider("service unavailable".to_string()));
        }

        Ok(texts
            .iter()
            .map(|text| {
                self.vectors
                    .get(&text.trim().to_lowercase())
                    .cloned()
                    .unwrap_or_else(|| self.noise())
            })
            .collect())
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

fn axis(dimensions: usize, index: usize) -> Vec<f32> {
    let mut vector = vec![0.0; dimensions];
    vector[index] = 1.0;
    vector
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.embedding.retry.initial_delay_ms = 0;
    config.embedding.retry.max_delay_ms = 0;
    config
}

/// Engine over a taxonomy whose vectors come from the provider itself
fn engine_for(
    skills: &[(&str, SkillCategory)],
    provider: Arc<FixtureProvider>,
) -> Result<AnalysisEngine> {
    let entries = skills
        .iter()
        .map(|(name, category)| TaxonomyEntry::new(name, *category, &[]))
        .collect();
    let spec = TaxonomySpec::from_entries(entries, "fixture")?;
    let context = AnalysisContext::initialize(fast_config(), provider, &spec)?;
    Ok(AnalysisEngine::new(Arc::new(context)))
}

/// Python, Docker and Kubernetes on their own axes, noise on axis 3
fn backend_provider() -> FixtureProvider {
    FixtureProvider::new(4)
        .with("python", axis(4, 0))
        .with("docker", axis(4, 1))
        .with("kubernetes", axis(4, 2))
        .with("container orchestration", vec![0.0, 0.0, 0.5, 0.866])
}

fn backend_engine(provider: Arc<FixtureProvider>) -> AnalysisEngine {
    engine_for(
        &[
            ("Python", SkillCategory::Language),
            ("Docker", SkillCategory::Platform),
            ("Kubernetes", SkillCategory::Platform),
        ],
        provider,
    )
    .unwrap()
}

const FILLER: &str = "The reporting layer handled nightly settlement files for several regional banks and card networks across multiple time zones.";

fn scenario_a_resume() -> String {
    format!(
        "I built data pipelines in Python for a payments company. Later I built internal tooling in Python as well. {filler} Nightly jobs ran Python scripts on a schedule. {filler} Occasionally touched docker for local setups.",
        filler = FILLER
    )
}

fn postings(count: usize, text: &str) -> Vec<PostingRawInput> {
    (0..count)
        .map(|i| PostingRawInput::new(text).with_id(format!("{}-{}", text.to_lowercase().replace(' ', "-"), i)))
        .collect()
}

#[test]
fn test_scenario_a_profile_from_free_text() {
    let engine = backend_engine(Arc::new(backend_provider()));
    let profile = engine
        .validate_profile(&CandidateRawInput::from_text(scenario_a_resume()), &Deadline::none())
        .unwrap();

    assert_eq!(profile.names(), vec!["docker", "python"]);

    let python = profile.get("python").unwrap();
    let docker = profile.get("docker").unwrap();
    assert_eq!(python.mention_count, 3);
    assert_eq!(docker.mention_count, 1);
    assert_eq!(python.proficiency, Proficiency::Expert);
    assert_eq!(docker.proficiency, Proficiency::Beginner);
    assert!(python.proficiency_score > docker.proficiency_score);
    assert!(python.confidence >= 0.99);
}

#[test]
fn test_scenario_b_clamped_severity_and_exclusion() {
    let engine = backend_engine(Arc::new(backend_provider()));
    let mut market = postings(90, "Backend role using Python");
    market.extend(postings(10, "Ops role using Docker"));

    let without_python = AnalysisRequest {
        candidate: CandidateRawInput::from_text("Maintained docker images for the team."),
        postings: market.clone(),
        prior_postings: None,
        window_label: Some("2026-10".to_string()),
    };
    let report = engine.analyze(&without_python, None).unwrap();

    assert_eq!(report.gaps.total_postings, 100);
    assert_eq!(report.gaps.window.label, "2026-10");
    let python = report.gaps.get("python").unwrap();
    assert_eq!(python.frequency, 90);
    assert!((python.frequency_ratio - 0.9).abs() < 1e-6);
    assert_eq!(python.demand_velocity, 1.0);
    assert_eq!(python.severity, 1.0);
    assert_eq!(python.kind, GapKind::Missing);
    assert_eq!(python.priority, GapPriority::Critical);
    assert!(python.confidence > 0.8 && python.confidence < 0.9);
    assert!(report.gaps.matched.contains(&"docker".to_string()));

    let with_python = AnalysisRequest {
        candidate: CandidateRawInput::from_text(scenario_a_resume()),
        ..without_python
    };
    let report = engine.analyze(&with_python, None).unwrap();
    assert!(report.gaps.get("python").is_none());
    assert!(report.gaps.matched.contains(&"python".to_string()));
    assert!(report.gaps.is_empty());
}

#[test]
fn test_scenario_c_no_postings_is_empty_report() {
    let engine = backend_engine(Arc::new(backend_provider()));
    let request = AnalysisRequest {
        candidate: CandidateRawInput::from_text(scenario_a_resume()),
        postings: Vec::new(),
        prior_postings: None,
        window_label: None,
    };

    let report = engine.analyze(&request, None).unwrap();
    assert_eq!(report.gaps.total_postings, 0);
    assert!(report.gaps.is_empty());
    assert!(report.roadmap.is_empty());
    assert_eq!(report.profile.len(), 2);
}

#[test]
fn test_scenario_d_transfer_anchor_and_estimate() {
    let vue_y = (1.0f32 - 0.82 * 0.82).sqrt();
    let provider = Arc::new(
        FixtureProvider::new(3)
            .with("react", vec![1.0, 0.0, 0.0])
            .with("vue", vec![0.82, vue_y, 0.0]),
    );
    let engine = engine_for(
        &[("React", SkillCategory::Framework), ("Vue", SkillCategory::Framework)],
        provider,
    )
    .unwrap();

    let request = AnalysisRequest {
        candidate: CandidateRawInput::from_text("Shipped customer dashboards in React."),
        postings: postings(5, "Frontend role using Vue"),
        prior_postings: None,
        window_label: None,
    };
    let report = engine.analyze(&request, None).unwrap();

    assert_eq!(report.roadmap.len(), 1);
    let item = &report.roadmap.items[0];
    assert_eq!(item.gap.term.name, "vue");
    assert_eq!(item.anchors.len(), 1);
    assert_eq!(item.anchors[0].skill.name, "react");
    assert!((item.anchors[0].similarity - 0.82).abs() < 1e-3);
    assert_eq!(item.estimate.label, "1–2 weeks");
}

#[test]
fn test_partial_gap_from_pre_extracted_mentions() {
    let engine = backend_engine(Arc::new(backend_provider()));
    let candidate = CandidateRawInput {
        text: "Ran container orchestration for a small cluster.".to_string(),
        mentions: Some(vec![CandidateSkillMention {
            text: "container orchestration".to_string(),
            context: "Ran container orchestration for a small cluster.".to_string(),
            position: 4,
        }]),
    };
    let request = AnalysisRequest {
        candidate,
        postings: postings(10, "Platform role using Kubernetes"),
        prior_postings: None,
        window_label: None,
    };

    let report = engine.analyze(&request, None).unwrap();
    let kubernetes = report.gaps.get("kubernetes").unwrap();
    assert_eq!(kubernetes.kind, GapKind::Partial);
    assert!((kubernetes.candidate_confidence.unwrap() - 0.5).abs() < 1e-3);

    let corpus = engine
        .build_corpus(&request.postings, None, "now", &Deadline::none())
        .unwrap()
        .corpus;
    let without_skill = engine.score_gaps(&Default::default(), &corpus);
    let missing = without_skill.get("kubernetes").unwrap();
    assert!(kubernetes.severity < missing.severity);
}

#[test]
fn test_prior_window_sets_demand_velocity() {
    let engine = backend_engine(Arc::new(backend_provider()));
    let mut current = postings(8, "Backend role using Python");
    current.extend(postings(2, "Ops role using Docker"));
    let mut prior = postings(2, "Old backend role using Python");
    prior.extend(postings(8, "Old ops role using Docker"));

    let request = AnalysisRequest {
        candidate: CandidateRawInput::from_text("Wrote COBOL reports."),
        postings: current,
        prior_postings: Some(prior),
        window_label: None,
    };
    let report = engine.analyze(&request, None).unwrap();

    assert!((report.gaps.get("python").unwrap().demand_velocity - 4.0).abs() < 1e-6);
    assert!((report.gaps.get("docker").unwrap().demand_velocity - 0.25).abs() < 1e-6);
    assert!(report.gaps.window.has_prior());
}

#[test]
fn test_malformed_posting_is_skipped() {
    let engine = backend_engine(Arc::new(backend_provider()));
    let request = AnalysisRequest {
        candidate: CandidateRawInput::from_text("Maintained docker images."),
        postings: vec![
            PostingRawInput::new("Backend role using Python").with_id("ok"),
            PostingRawInput::new("   ").with_id("blank"),
        ],
        prior_postings: None,
        window_label: None,
    };

    let report = engine.analyze(&request, None).unwrap();
    assert_eq!(report.gaps.total_postings, 1);
    assert_eq!(report.skipped_postings.len(), 1);
    assert_eq!(report.skipped_postings[0].id, "blank");
    assert_eq!(report.postings.len(), 1);
    assert_eq!(report.postings[0].skills, vec!["python"]);
}

#[test]
fn test_transient_provider_failures_are_retried() {
    let provider = Arc::new(backend_provider().failing(2));
    let engine = backend_engine(Arc::clone(&provider));
    assert_eq!(provider.calls(), 3);
    assert_eq!(engine.context().taxonomy().len(), 3);
}

#[test]
fn test_persistent_provider_failure_fails_initialization() {
    let provider = Arc::new(backend_provider().failing(usize::MAX));
    let error = engine_for(&[("Python", SkillCategory::Language)], Arc::clone(&provider))
        .err()
        .unwrap();

    assert!(matches!(error, SkillGapError::TaxonomyLoad(_)));
    assert!(error.is_infrastructure());
    assert_eq!(provider.calls(), Config::default().embedding.retry.max_attempts as usize);
}

/// Taxonomy vectors are precomputed, so only analysis calls hit the slow provider
/// Engine over a taxonomy that carries its own vectors, so building it
/// never calls the provider
fn precomputed_engine(provider: Arc<FixtureProvider>) -> AnalysisEngine {
    let entries = vec![TaxonomyEntry {
        name: "Python".to_string(),
        category: Some("language".to_string()),
        aliases: Vec::new(),
        embedding: Some(vec![1.0, 0.0]),
    }];
    let spec = TaxonomySpec::from_entries(entries, "precomputed").unwrap();
    let context = AnalysisContext::initialize(fast_config(), Arc::clone(&provider) as Arc<dyn EmbeddingProvider>, &spec).unwrap();
    assert_eq!(provider.calls(), 0);
    AnalysisEngine::new(Arc::new(context))
}

fn slow_engine(delay: Duration) -> AnalysisEngine {
    precomputed_engine(Arc::new(FixtureProvider::new(2).with("python", vec![1.0, 0.0]).slow(delay)))
}

#[test]
fn test_provider_failure_during_analysis_is_not_an_empty_report() {
    let provider = Arc::new(FixtureProvider::new(2).with("python", vec![1.0, 0.0]).failing(usize::MAX));
    let engine = precomputed_engine(Arc::clone(&provider));
    let request = AnalysisRequest {
        candidate: CandidateRawInput::from_text("Built services in Python"),
        postings: postings(3, "Backend role using Python"),
        prior_postings: None,
        window_label: None,
    };

    let error = engine.analyze(&request, None).unwrap_err();
    assert!(matches!(error, SkillGapError::EmbeddingProvider(_)));
    assert!(error.is_infrastructure());
    assert_eq!(provider.calls(), fast_config().embedding.retry.max_attempts as usize);

    let profile_error = engine
        .validate_profile(&request.candidate, &Deadline::none())
        .unwrap_err();
    assert!(matches!(profile_error, SkillGapError::EmbeddingProvider(_)));
}

#[test]
fn test_deadline_expiry_returns_timeout() {
    let engine = slow_engine(Duration::from_millis(50));
    let request = AnalysisRequest {
        candidate: CandidateRawInput::from_text("Python"),
        postings: postings(3, "Backend role using Python"),
        prior_postings: None,
        window_label: None,
    };

    let error = engine.analyze(&request, Some(Duration::from_millis(10))).unwrap_err();
    assert!(matches!(error, SkillGapError::Timeout { .. }));
}

#[tokio::test]
async fn test_async_timeout_returns_timeout() {
    let engine = slow_engine(Duration::from_millis(300));
    let request = AnalysisRequest {
        candidate: CandidateRawInput::from_text("Python"),
        postings: postings(3, "Backend role using Python"),
        prior_postings: None,
        window_label: None,
    };

    let result = engine.analyze_with_timeout(request, Duration::from_millis(50)).await;
    assert!(matches!(result, Err(SkillGapError::Timeout { .. })));
}

#[tokio::test]
async fn test_async_analysis_completes_within_timeout() {
    let engine = backend_engine(Arc::new(backend_provider()));
    let request = AnalysisRequest {
        candidate: CandidateRawInput::from_text(scenario_a_resume()),
        postings: postings(4, "Platform role using Kubernetes"),
        prior_postings: None,
        window_label: None,
    };

    let report = engine
        .analyze_with_timeout(request, Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(report.gaps.len(), 1);
    assert_eq!(report.embedding_model, "fixture");
    assert_eq!(report.taxonomy_size, 3);
}

#[test]
fn test_concurrent_analyses_share_one_context() {
    let engine = backend_engine(Arc::new(backend_provider()));
    let mut market = postings(6, "Backend role using Python");
    market.extend(postings(3, "Platform role using Kubernetes"));
    let request = AnalysisRequest {
        candidate: CandidateRawInput::from_text("Maintained docker images."),
        postings: market,
        prior_postings: None,
        window_label: None,
    };

    let baseline = engine.analyze(&request, None).unwrap();
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                let request = &request;
                scope.spawn(move || engine.analyze(request, None).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for report in results {
        assert_eq!(report.gaps.records, baseline.gaps.records);
        assert_eq!(report.roadmap, baseline.roadmap);
    }
}

#[test]
fn test_validation_is_idempotent() {
    let engine = backend_engine(Arc::new(backend_provider()));
    let input = CandidateRawInput::from_text(scenario_a_resume());

    let first = engine.validate_profile(&input, &Deadline::none()).unwrap();
    let second = engine.validate_profile(&input, &Deadline::none()).unwrap();
    assert_eq!(first, second);

    let names: std::collections::HashSet<_> = first.iter().map(|s| s.name().to_string()).collect();
    assert_eq!(names.len(), first.len());
}
