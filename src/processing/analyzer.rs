//! Analysis engine: runs extraction, validation, aggregation, scoring and
//! roadmap prioritization as one pipeline over a shared context

use crate::config::Config;
use crate::error::{Result, SkillGapError};
use crate::processing::aggregator::{MarketCorpus, PostingRawInput, SkippedPosting, ValidatedPosting};
use crate::processing::deadline::Deadline;
use crate::processing::embeddings::{BatchEmbedder, EmbeddingProvider};
use crate::processing::extractor::{CandidateRawInput, SkillCandidate, SkillExtractor};
use crate::processing::gap_scorer::{GapReport, GapScorer};
use crate::processing::roadmap::{RoadmapPrioritizer, RoadmapReport};
use crate::processing::validator::{CandidateProfile, SkillValidator};
use crate::taxonomy::{Taxonomy, TaxonomySpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_WINDOW: &str = "current";
const PRIOR_WINDOW: &str = "prior";

/// Process-scoped state shared by every analysis: configuration, the
/// embedded taxonomy and the embedding provider. Read-only once built.
pub struct AnalysisContext {
    config: Config,
    taxonomy: Taxonomy,
    provider: Arc<dyn EmbeddingProvider>,
    extractor: SkillExtractor,
}

impl AnalysisContext {
    /// Validate configuration and embed the taxonomy.
    ///
    /// Fails with `TaxonomyLoad` if the taxonomy cannot be embedded.
    pub fn initialize(config: Config, provider: Arc<dyn EmbeddingProvider>, spec: &TaxonomySpec) -> Result<Self> {
        config.validate()?;
        let start_time = Instant::now();
        log::info!(
            "Initializing analysis context: {} skills from {} via {}",
            spec.len(),
            spec.source(),
            provider.name()
        );

        let taxonomy = {
            let embedder = BatchEmbedder::new(provider.as_ref(), &config.embedding.retry, config.embedding_timeout());
            Taxonomy::build(spec, &embedder, &Deadline::none())?
        };

        let context = Self::with_taxonomy(config, provider, taxonomy)?;
        log::info!("Analysis context ready in {:.2?}", start_time.elapsed());
        Ok(context)
    }

    /// Use a taxonomy that already carries vectors
    pub fn with_taxonomy(config: Config, provider: Arc<dyn EmbeddingProvider>, taxonomy: Taxonomy) -> Result<Self> {
        config.validate()?;

        let vocabulary: Vec<String> = taxonomy
            .terms()
            .iter()
            .flat_map(|term| std::iter::once(term.name.clone()).chain(term.aliases.iter().cloned()))
            .collect();
        let extractor = SkillExtractor::new(&config.extraction)?.with_vocabulary(vocabulary)?;

        Ok(Self {
            config,
            taxonomy,
            provider,
            extractor,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn extractor(&self) -> &SkillExtractor {
        &self.extractor
    }

    /// Similarity a candidate needs to resolve to a taxonomy term
    pub fn validation_threshold(&self) -> f32 {
        if self.provider.is_semantic() {
            self.config.validation.threshold
        } else {
            self.config.validation.lexical_threshold
        }
    }

    fn validator(&self) -> Result<SkillValidator<'_>> {
        Ok(SkillValidator::new(&self.taxonomy, &self.config.validation)?.with_threshold(self.validation_threshold()))
    }

    fn embedder(&self) -> BatchEmbedder<'_> {
        BatchEmbedder::new(
            self.provider.as_ref(),
            &self.config.embedding.retry,
            self.config.embedding_timeout(),
        )
    }

    /// Release the provider and taxonomy
    pub fn shutdown(self) {
        log::info!("Shutting down analysis context ({})", self.provider.name());
    }
}

/// Everything one analysis needs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub candidate: CandidateRawInput,
    pub postings: Vec<PostingRawInput>,
    #[serde(default)]
    pub prior_postings: Option<Vec<PostingRawInput>>,
    #[serde(default)]
    pub window_label: Option<String>,
}

/// How far a candidate is from one posting, banded by the share of its
/// skills the candidate lacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostingFit {
    /// The posting names no skill from the taxonomy
    NoRequirements,
    Perfect,
    Minor,
    Moderate,
    Significant,
    Critical,
}

impl PostingFit {
    pub fn from_missing(missing: usize, required: usize) -> Self {
        if required == 0 {
            return PostingFit::NoRequirements;
        }
        let ratio = missing as f32 / required as f32;
        if missing == 0 {
            PostingFit::Perfect
        } else if ratio <= 0.2 {
            PostingFit::Minor
        } else if ratio <= 0.4 {
            PostingFit::Moderate
        } else if ratio <= 0.6 {
            PostingFit::Significant
        } else {
            PostingFit::Critical
        }
    }
}

impl fmt::Display for PostingFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostingFit::NoRequirements => write!(f, "No requirements"),
            PostingFit::Perfect => write!(f, "Perfect match"),
            PostingFit::Minor => write!(f, "Minor gaps"),
            PostingFit::Moderate => write!(f, "Moderate gaps"),
            PostingFit::Significant => write!(f, "Significant gaps"),
            PostingFit::Critical => write!(f, "Critical gaps"),
        }
    }
}

/// A posting as it entered the corpus, scored against the candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingSummary {
    pub id: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub skills: Vec<String>,
    /// Posting skills the candidate holds at or above the match threshold
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    /// `matched / skills`, or 1.0 for a posting with no recognised skills
    pub coverage: f32,
    pub fit: PostingFit,
}

impl PostingSummary {
    pub fn assess(posting: &ValidatedPosting, profile: &CandidateProfile, match_threshold: f32) -> Self {
        let skills = posting.skills.names();
        let (matched, missing): (Vec<String>, Vec<String>) = skills.iter().cloned().partition(|name| {
            profile
                .get(name)
                .is_some_and(|skill| skill.confidence >= match_threshold)
        });

        let coverage = if skills.is_empty() {
            1.0
        } else {
            matched.len() as f32 / skills.len() as f32
        };

        Self {
            id: posting.id.clone(),
            metadata: posting.metadata.clone(),
            fit: PostingFit::from_missing(missing.len(), skills.len()),
            skills,
            matched,
            missing,
            coverage,
        }
    }
}

/// Result of building a corpus from raw postings
#[derive(Debug, Clone)]
pub struct CorpusBuild {
    pub corpus: MarketCorpus,
    pub postings: Vec<ValidatedPosting>,
    pub skipped: Vec<SkippedPosting>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub profile: CandidateProfile,
    pub gaps: GapReport,
    pub roadmap: RoadmapReport,
    pub postings: Vec<PostingSummary>,
    pub skipped_postings: Vec<SkippedPosting>,
    pub taxonomy_size: usize,
    pub embedding_model: String,
    pub processing_time_ms: u64,
}

impl AnalysisReport {
    /// Postings by coverage, best first; ties keep input order
    pub fn best_fits(&self) -> Vec<&PostingSummary> {
        let mut postings: Vec<&PostingSummary> = self.postings.iter().collect();
        postings.sort_by(|a, b| b.coverage.total_cmp(&a.coverage));
        postings
    }
}

/// Runs analyses against a shared context. Cheap to clone; clones may run
/// concurrently.
#[derive(Clone)]
pub struct AnalysisEngine {
    context: Arc<AnalysisContext>,
}

impl AnalysisEngine {
    pub fn new(context: Arc<AnalysisContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AnalysisContext {
        &self.context
    }

    /// Extract and validate the candidate's skills
    pub fn validate_profile(&self, input: &CandidateRawInput, deadline: &Deadline) -> Result<CandidateProfile> {
        deadline.check("extract candidate skills")?;
        let candidates = self.context.extractor.prepare(input);

        let validator = self.context.validator()?;
        let profile = validator.validate(&candidates, &self.context.embedder(), deadline)?;

        log::info!(
            "Candidate profile: {} skills from {} candidates",
            profile.len(),
            candidates.len()
        );
        Ok(profile)
    }

    /// Validate raw postings and aggregate them.
    ///
    /// Malformed postings are skipped with a warning and do not count
    /// towards the corpus total. All postings share one embedding call.
    pub fn build_corpus(
        &self,
        postings: &[PostingRawInput],
        prior: Option<&MarketCorpus>,
        label: &str,
        deadline: &Deadline,
    ) -> Result<CorpusBuild> {
        deadline.check("extract posting skills")?;

        let mut accepted: Vec<(usize, &PostingRawInput)> = Vec::with_capacity(postings.len());
        let mut skipped = Vec::new();
        for (index, posting) in postings.iter().enumerate() {
            match posting.check(index) {
                Ok(()) => accepted.push((index, posting)),
                Err(e) => {
                    log::warn!("Skipping posting: {}", e);
                    skipped.push(SkippedPosting::from_error(posting.display_id(index), &e));
                }
            }
        }

        let candidate_sets: Vec<Vec<SkillCandidate>> = accepted
            .iter()
            .map(|(_, posting)| self.context.extractor.extract(&posting.text))
            .collect();
        let set_refs: Vec<&[SkillCandidate]> = candidate_sets.iter().map(Vec::as_slice).collect();

        let validator = self.context.validator()?;
        let profiles = validator.validate_batch(&set_refs, &self.context.embedder(), deadline)?;

        let validated: Vec<ValidatedPosting> = accepted
            .iter()
            .zip(profiles)
            .map(|((index, posting), skills)| ValidatedPosting {
                id: posting.display_id(*index),
                metadata: posting.metadata.clone(),
                skills,
            })
            .collect();

        deadline.check("aggregate market")?;
        let corpus = MarketCorpus::aggregate(&validated, validated.len(), prior, label)?;

        Ok(CorpusBuild {
            corpus,
            postings: validated,
            skipped,
        })
    }

    pub fn score_gaps(&self, profile: &CandidateProfile, corpus: &MarketCorpus) -> GapReport {
        GapScorer::new(&self.context.config.scoring).score(profile, corpus)
    }

    pub fn prioritize(&self, gaps: &GapReport, profile: &CandidateProfile) -> RoadmapReport {
        RoadmapPrioritizer::new(&self.context.config.roadmap).prioritize(gaps, profile)
    }

    /// Run the whole pipeline.
    ///
    /// With a timeout, every stage checks the shared deadline and the run
    /// fails with `Timeout` instead of returning partial rankings.
    pub fn analyze(&self, request: &AnalysisRequest, timeout: Option<Duration>) -> Result<AnalysisReport> {
        let deadline = Deadline::from_option(timeout);

        let profile = self.validate_profile(&request.candidate, &deadline)?;

        let prior = match &request.prior_postings {
            Some(prior_postings) => Some(self.build_corpus(prior_postings, None, PRIOR_WINDOW, &deadline)?),
            None => None,
        };

        let label = request.window_label.as_deref().unwrap_or(DEFAULT_WINDOW);
        let current = self.build_corpus(&request.postings, prior.as_ref().map(|p| &p.corpus), label, &deadline)?;

        deadline.check("score gaps")?;
        let gaps = self.score_gaps(&profile, &current.corpus);

        deadline.check("prioritize roadmap")?;
        let roadmap = self.prioritize(&gaps, &profile);

        deadline.check("finalize report")?;

        let mut skipped_postings = current.skipped;
        if let Some(prior) = prior {
            skipped_postings.extend(prior.skipped.into_iter().map(|mut s| {
                s.id = format!("{} ({})", s.id, PRIOR_WINDOW);
                s
            }));
        }

        Ok(AnalysisReport {
            postings: current
                .postings
                .iter()
                .map(|posting| PostingSummary::assess(posting, &profile, self.context.config.scoring.match_threshold))
                .collect(),
            profile,
            gaps,
            roadmap,
            skipped_postings,
            taxonomy_size: self.context.taxonomy.len(),
            embedding_model: self.context.provider_name().to_string(),
            processing_time_ms: deadline.elapsed_ms(),
        })
    }

    /// Run `analyze` on the blocking pool, bounded by `timeout`
    pub async fn analyze_with_timeout(&self, request: AnalysisRequest, timeout: Duration) -> Result<AnalysisReport> {
        let engine = self.clone();
        let started = Instant::now();
        let task = tokio::task::spawn_blocking(move || engine.analyze(&request, Some(timeout)));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(SkillGapError::InvalidInput(format!(
                "analysis task failed: {}",
                join_error
            ))),
            Err(_) => Err(SkillGapError::Timeout {
                stage: "analysis".to_string(),
                elapsed_ms: started.elapsed().as_millis() as u64,
            }),
        }
    }
}
