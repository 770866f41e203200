//! Configuration management for the skill-gap engine

use crate::error::{Result, SkillGapError};
use crate::taxonomy::SkillCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub extraction: ExtractionConfig,
    pub validation: ValidationConfig,
    pub scoring: ScoringConfig,
    pub roadmap: RoadmapConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Local model directory or Hugging Face repo id for the Model2Vec backend
    pub model: String,
    pub hash_dimensions: usize,
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Model2Vec,
    Hash,
}

/// Retry behaviour for embedding calls, exponential backoff with a cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Characters captured on each side of a mention
    pub context_window: usize,
    pub max_candidate_words: usize,
    pub max_candidate_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Minimum cosine similarity for a candidate to be accepted
    pub threshold: f32,
    /// Acceptance threshold when the provider is lexical (`backend = "hash"`).
    /// Trigram overlap is not meaning, so "Straße" and "strategy" score too
    /// close under the semantic threshold.
    pub lexical_threshold: f32,
    pub proficiency: ProficiencyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProficiencyConfig {
    pub cue_weight: f32,
    pub mention_weight: f32,
    pub verb_weight: f32,
    /// Mention count at which the mention signal saturates to 1.0
    pub mention_saturation: usize,
    pub expert_threshold: f32,
    pub intermediate_threshold: f32,
    pub expert_cue_strength: f32,
    pub intermediate_cue_strength: f32,
    pub neutral_cue_strength: f32,
    pub basic_cue_strength: f32,
    pub expert_years: u32,
    pub intermediate_years: u32,
    pub expert_cues: Vec<String>,
    pub intermediate_cues: Vec<String>,
    pub basic_cues: Vec<String>,
    pub action_verbs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Profile confidence at or above which a market skill counts as fully matched
    pub match_threshold: f32,
    pub partial_multiplier: f32,
    pub wilson_z: f64,
    pub critical_penetration: f32,
    pub critical_severity: f32,
    /// Category name -> weight; missing categories weigh 1.0
    pub domain_weights: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadmapConfig {
    pub top_k: usize,
    pub min_anchor_similarity: f32,
    pub fallback_min_weeks: u32,
    pub fallback_max_weeks: u32,
    /// Bands checked in descending `min_similarity` order
    pub duration_curve: Vec<DurationBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationBand {
    pub min_similarity: f32,
    pub min_weeks: u32,
    pub max_weeks: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub detailed: bool,
    pub color_output: bool,
    /// Rows shown per table in console output
    pub max_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Console,
    Json,
    Markdown,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Model2Vec,
            model: "minishlab/potion-base-8M".to_string(),
            hash_dimensions: 256,
            batch_size: 64,
            timeout_secs: 30,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before retrying after the given (0-indexed) failed attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            context_window: 100,
            max_candidate_words: 4,
            max_candidate_chars: 50,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            threshold: 0.40,
            lexical_threshold: 0.60,
            proficiency: ProficiencyConfig::default(),
        }
    }
}

impl Default for ProficiencyConfig {
    fn default() -> Self {
        let words = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            cue_weight: 0.3,
            mention_weight: 0.4,
            verb_weight: 0.3,
            mention_saturation: 3,
            expert_threshold: 0.85,
            intermediate_threshold: 0.65,
            expert_cue_strength: 1.0,
            intermediate_cue_strength: 0.7,
            neutral_cue_strength: 0.5,
            basic_cue_strength: 0.2,
            expert_years: 5,
            intermediate_years: 2,
            expert_cues: words(&[
                "expert", "advanced", "proficient", "mastery", "extensive", "deep", "specialist",
            ]),
            intermediate_cues: words(&[
                "experience", "familiar", "working knowledge", "solid", "competent", "practical",
            ]),
            basic_cues: words(&[
                "basic", "beginner", "learning", "exposure", "understanding", "awareness",
            ]),
            action_verbs: words(&[
                "built", "led", "shipped", "designed", "developed", "implemented", "architected",
                "launched", "deployed", "delivered", "created", "optimized", "migrated", "scaled",
            ]),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let domain_weights = [
            (SkillCategory::Language, 3.0),
            (SkillCategory::Framework, 2.5),
            (SkillCategory::Database, 2.2),
            (SkillCategory::Platform, 2.0),
            (SkillCategory::SoftSkill, 1.5),
            (SkillCategory::Domain, 2.8),
        ]
        .into_iter()
        .map(|(category, weight)| (category.as_str().to_string(), weight))
        .collect();

        Self {
            match_threshold: 0.65,
            partial_multiplier: 0.5,
            domain_weights,
            wilson_z: 1.96,
            critical_penetration: 0.4,
            critical_severity: 0.75,
        }
    }
}

impl ScoringConfig {
    pub fn domain_weight(&self, category: SkillCategory) -> f32 {
        self.domain_weights
            .get(category.as_str())
            .copied()
            .unwrap_or(1.0)
    }
}

impl Default for RoadmapConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_anchor_similarity: 0.3,
            duration_curve: vec![
                DurationBand { min_similarity: 0.8, min_weeks: 1, max_weeks: 2 },
                DurationBand { min_similarity: 0.5, min_weeks: 3, max_weeks: 4 },
            ],
            fallback_min_weeks: 6,
            fallback_max_weeks: 10,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Console,
            detailed: false,
            color_output: true,
            max_rows: 15,
        }
    }
}

impl Config {
    /// Load from the default location, writing defaults on first use
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| SkillGapError::Configuration(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| SkillGapError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("skill-gap")
            .join("config.toml")
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding.timeout_secs)
    }

    /// Reject values that would break the scoring invariants
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f32| -> Result<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(SkillGapError::Configuration(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )))
            }
        };

        unit("validation.threshold", self.validation.threshold)?;
        unit("validation.lexical_threshold", self.validation.lexical_threshold)?;
        unit("scoring.match_threshold", self.scoring.match_threshold)?;
        unit("scoring.partial_multiplier", self.scoring.partial_multiplier)?;
        unit("roadmap.min_anchor_similarity", self.roadmap.min_anchor_similarity)?;

        let proficiency = &self.validation.proficiency;
        if proficiency.cue_weight < 0.0 || proficiency.mention_weight < 0.0 || proficiency.verb_weight < 0.0 {
            return Err(SkillGapError::Configuration(
                "proficiency weights must be non-negative".to_string(),
            ));
        }
        if proficiency.intermediate_threshold > proficiency.expert_threshold {
            return Err(SkillGapError::Configuration(
                "proficiency intermediate_threshold must not exceed expert_threshold".to_string(),
            ));
        }

        if let Some((category, weight)) = self.scoring.domain_weights.iter().find(|(_, w)| **w < 0.0) {
            return Err(SkillGapError::Configuration(format!(
                "domain weight for '{}' is negative: {}",
                category, weight
            )));
        }

        if self.roadmap.top_k == 0 {
            return Err(SkillGapError::Configuration("roadmap.top_k must be at least 1".to_string()));
        }
        let ordered = self
            .roadmap
            .duration_curve
            .windows(2)
            .all(|pair| pair[0].min_similarity > pair[1].min_similarity);
        if !ordered {
            return Err(SkillGapError::Configuration(
                "roadmap.duration_curve must be sorted by descending min_similarity".to_string(),
            ));
        }

        if self.embedding.retry.max_attempts == 0 {
            return Err(SkillGapError::Configuration(
                "embedding.retry.max_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
