//! Semantic validation of extracted candidates against the taxonomy

use crate::config::{ProficiencyConfig, ValidationConfig};
use crate::error::{Result, SkillGapError};
use crate::processing::deadline::Deadline;
use crate::processing::embeddings::BatchEmbedder;
use crate::processing::extractor::{CandidateSkillMention, SkillCandidate};
use crate::taxonomy::{SkillTerm, Taxonomy};
use aho_corasick::{AhoCorasick, MatchKind};
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

// Guards the band edges against f32 rounding in the weighted sum
const BAND_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Proficiency {
    Beginner,
    Intermediate,
    Expert,
}

impl fmt::Display for Proficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Proficiency::Beginner => write!(f, "Beginner"),
            Proficiency::Intermediate => write!(f, "Intermediate"),
            Proficiency::Expert => write!(f, "Expert"),
        }
    }
}

/// A candidate resolved to exactly one taxonomy term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedSkill {
    pub term: Arc<SkillTerm>,
    /// Best cosine similarity over the merged mentions
    pub confidence: f32,
    pub proficiency: Proficiency,
    pub proficiency_score: f32,
    pub mention_count: usize,
    /// Surface forms that resolved to this term
    pub matched_forms: Vec<String>,
}

impl ValidatedSkill {
    pub fn name(&self) -> &str {
        &self.term.name
    }
}

/// Validated skills, unique by term and ordered by canonical name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    skills: Vec<ValidatedSkill>,
}

impl CandidateProfile {
    /// Build a profile, merging any records that share a term
    pub fn from_skills(mut skills: Vec<ValidatedSkill>) -> Self {
        skills.sort_by(|a, b| a.term.name.cmp(&b.term.name));

        let mut merged: Vec<ValidatedSkill> = Vec::with_capacity(skills.len());
        for skill in skills {
            match merged.last_mut() {
                Some(last) if last.term.name == skill.term.name => {
                    last.confidence = last.confidence.max(skill.confidence);
                    last.mention_count += skill.mention_count;
                    if skill.proficiency_score > last.proficiency_score {
                        last.proficiency = skill.proficiency;
                        last.proficiency_score = skill.proficiency_score;
                    }
                    for form in skill.matched_forms {
                        if !last.matched_forms.contains(&form) {
                            last.matched_forms.push(form);
                        }
                    }
                }
                _ => merged.push(skill),
            }
        }

        Self { skills: merged }
    }

    pub fn get(&self, name: &str) -> Option<&ValidatedSkill> {
        self.skills
            .binary_search_by(|s| s.term.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.skills[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidatedSkill> {
        self.skills.iter()
    }

    pub fn skills(&self) -> &[ValidatedSkill] {
        &self.skills
    }

    pub fn names(&self) -> Vec<String> {
        self.skills.iter().map(|s| s.term.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CueLevel {
    None,
    Basic,
    Intermediate,
    Expert,
}

/// Scores proficiency from mention contexts.
///
/// composite = cue_weight * cue + mention_weight * min(count / saturation, 1)
///           + verb_weight * (any action verb)
pub struct ProficiencyEstimator {
    config: ProficiencyConfig,
    matcher: Option<AhoCorasick>,
    kinds: Vec<PhraseKind>,
    years: Regex,
}

#[derive(Debug, Clone, Copy)]
enum PhraseKind {
    Cue(CueLevel),
    Verb,
}

impl ProficiencyEstimator {
    pub fn new(config: &ProficiencyConfig) -> Result<Self> {
        let mut phrases: Vec<String> = Vec::new();
        let mut kinds = Vec::new();
        let groups = [
            (&config.expert_cues, PhraseKind::Cue(CueLevel::Expert)),
            (&config.intermediate_cues, PhraseKind::Cue(CueLevel::Intermediate)),
            (&config.basic_cues, PhraseKind::Cue(CueLevel::Basic)),
            (&config.action_verbs, PhraseKind::Verb),
        ];
        for (list, kind) in groups {
            for phrase in list {
                let phrase = phrase.trim().to_lowercase();
                if !phrase.is_empty() {
                    phrases.push(phrase);
                    kinds.push(kind);
                }
            }
        }

        let matcher = if phrases.is_empty() {
            None
        } else {
            Some(
                AhoCorasick::builder()
                    .ascii_case_insensitive(true)
                    .match_kind(MatchKind::Standard)
                    .build(&phrases)
                    .map_err(|e| SkillGapError::Configuration(format!("Failed to build cue matcher: {}", e)))?,
            )
        };

        let years = Regex::new(r"(?i)\b(\d{1,2})\s*\+?\s*(?:years?|yrs?)\b")
            .map_err(|e| SkillGapError::Configuration(format!("Invalid years pattern: {}", e)))?;

        Ok(Self {
            config: config.clone(),
            matcher,
            kinds,
            years,
        })
    }

    pub fn estimate<'m, I>(&self, contexts: I, mention_count: usize) -> (Proficiency, f32)
    where
        I: IntoIterator<Item = &'m str>,
    {
        let mut cue = CueLevel::None;
        let mut verb = false;

        for context in contexts {
            let (level, has_verb) = self.scan(context);
            cue = cue.max(level);
            verb |= has_verb;
        }

        let config = &self.config;
        let cue_strength = match cue {
            CueLevel::Expert => config.expert_cue_strength,
            CueLevel::Intermediate => config.intermediate_cue_strength,
            CueLevel::Basic => config.basic_cue_strength,
            CueLevel::None => config.neutral_cue_strength,
        };
        let saturation = config.mention_saturation.max(1) as f32;
        let mentions = (mention_count as f32 / saturation).min(1.0);
        let verb_signal = if verb { 1.0 } else { 0.0 };

        let score = (config.cue_weight * cue_strength + config.mention_weight * mentions + config.verb_weight * verb_signal)
            .clamp(0.0, 1.0);

        let band = if score + BAND_EPSILON >= config.expert_threshold {
            Proficiency::Expert
        } else if score + BAND_EPSILON >= config.intermediate_threshold {
            Proficiency::Intermediate
        } else {
            Proficiency::Beginner
        };

        (band, score)
    }

    fn scan(&self, context: &str) -> (CueLevel, bool) {
        let mut level = CueLevel::None;
        let mut verb = false;

        if let Some(matcher) = &self.matcher {
            for found in matcher.find_overlapping_iter(context) {
                if !is_whole_word(context, found.start(), found.end()) {
                    continue;
                }
                match self.kinds[found.pattern().as_usize()] {
                    PhraseKind::Cue(cue) => level = level.max(cue),
                    PhraseKind::Verb => verb = true,
                }
            }
        }

        for captures in self.years.captures_iter(context) {
            let years: u32 = captures
                .get(1)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            if years >= self.config.expert_years {
                level = level.max(CueLevel::Expert);
            } else if years >= self.config.intermediate_years {
                level = level.max(CueLevel::Intermediate);
            }
        }

        (level, verb)
    }
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// Resolves candidates to taxonomy terms by embedding similarity
pub struct SkillValidator<'a> {
    taxonomy: &'a Taxonomy,
    threshold: f32,
    proficiency: ProficiencyEstimator,
}

struct MergedSkill<'c> {
    term: Arc<SkillTerm>,
    confidence: f32,
    mentions: Vec<&'c CandidateSkillMention>,
    forms: BTreeSet<String>,
}

impl<'a> SkillValidator<'a> {
    pub fn new(taxonomy: &'a Taxonomy, config: &ValidationConfig) -> Result<Self> {
        Ok(Self {
            taxonomy,
            threshold: config.threshold,
            proficiency: ProficiencyEstimator::new(&config.proficiency)?,
        })
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Validate one candidate set
    pub fn validate(
        &self,
        candidates: &[SkillCandidate],
        embedder: &BatchEmbedder<'_>,
        deadline: &Deadline,
    ) -> Result<CandidateProfile> {
        let mut profiles = self.validate_batch(&[candidates], embedder, deadline)?;
        Ok(profiles.pop().unwrap_or_default())
    }

    /// Validate several candidate sets with a single embedding call over
    /// the distinct strings they contain. Returns one profile per set.
    pub fn validate_batch(
        &self,
        sets: &[&[SkillCandidate]],
        embedder: &BatchEmbedder<'_>,
        deadline: &Deadline,
    ) -> Result<Vec<CandidateProfile>> {
        let mut slot_of: HashMap<String, usize> = HashMap::new();
        let mut texts: Vec<String> = Vec::new();
        for candidate in sets.iter().flat_map(|set| set.iter()) {
            let key = candidate.text.trim().to_lowercase();
            if key.is_empty() || slot_of.contains_key(&key) {
                continue;
            }
            slot_of.insert(key, texts.len());
            texts.push(candidate.text.trim().to_string());
        }

        if texts.is_empty() {
            return Ok(vec![CandidateProfile::default(); sets.len()]);
        }

        deadline.check("validate skills")?;
        let vectors = embedder.embed(&texts, Some(self.taxonomy.dimension()), deadline)?;
        deadline.check("validate skills")?;

        let threshold = self.threshold;
        let resolved: Vec<Option<(Arc<SkillTerm>, f32)>> = vectors
            .par_iter()
            .map(|vector| {
                self.taxonomy
                    .best_match(vector)
                    .filter(|(_, similarity)| *similarity >= threshold)
                    .map(|(term, similarity)| (Arc::clone(term), similarity.clamp(0.0, 1.0)))
            })
            .collect();

        let accepted = resolved.iter().filter(|r| r.is_some()).count();
        log::debug!(
            "Validated {} of {} distinct candidates (threshold {:.2})",
            accepted,
            texts.len(),
            threshold
        );

        let profiles = sets
            .iter()
            .map(|set| {
                let mut merged: BTreeMap<String, MergedSkill<'_>> = BTreeMap::new();
                for candidate in set.iter() {
                    let key = candidate.text.trim().to_lowercase();
                    let Some(&slot) = slot_of.get(&key) else { continue };
                    let Some((term, similarity)) = &resolved[slot] else {
                        log::debug!("Rejected candidate '{}'", candidate.text);
                        continue;
                    };

                    let entry = merged.entry(term.name.clone()).or_insert_with(|| MergedSkill {
                        term: Arc::clone(term),
                        confidence: 0.0,
                        mentions: Vec::new(),
                        forms: BTreeSet::new(),
                    });
                    entry.confidence = entry.confidence.max(*similarity);
                    entry.mentions.extend(candidate.mentions.iter());
                    entry.forms.insert(candidate.text.trim().to_string());
                }

                let skills = merged
                    .into_values()
                    .map(|skill| self.finish(skill))
                    .collect();
                CandidateProfile::from_skills(skills)
            })
            .collect();

        Ok(profiles)
    }

    fn finish(&self, skill: MergedSkill<'_>) -> ValidatedSkill {
        let mentions = distinct_occurrences(skill.mentions);
        let mention_count = mentions.len().max(1);
        let (proficiency, proficiency_score) = self
            .proficiency
            .estimate(mentions.iter().map(|m| m.context.as_str()), mention_count);

        ValidatedSkill {
            term: skill.term,
            confidence: skill.confidence,
            proficiency,
            proficiency_score,
            mention_count,
            matched_forms: skill.forms.into_iter().collect(),
        }
    }
}

/// Collapse mentions whose byte spans overlap into one occurrence.
///
/// Overlapping n-grams such as "Google Cloud Platform" and "Cloud" resolve to
/// the same term from one place in the text. The longest span at each start
/// position wins.
fn distinct_occurrences(mut mentions: Vec<&CandidateSkillMention>) -> Vec<&CandidateSkillMention> {
    mentions.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| b.text.len().cmp(&a.text.len())));

    let mut kept: Vec<&CandidateSkillMention> = Vec::with_capacity(mentions.len());
    let mut covered_until = 0;
    for mention in mentions {
        if !kept.is_empty() && mention.position < covered_until {
            continue;
        }
        covered_until = mention.position + mention.text.len().max(1);
        kept.push(mention);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::processing::embeddings::EmbeddingProvider;
    use crate::taxonomy::SkillCategory;
    use std::time::Duration;

    /// Maps known strings to fixed vectors; anything else goes to the last axis
    struct TableProvider;

    impl EmbeddingProvider for TableProvider {
        fn embed(&self, texts: &[String], _timeout: Duration) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| match t.to_lowercase().as_str() {
                    "python" | "python3" => vec![1.0, 0.0, 0.0, 0.0],
                    "py" => vec![0.9, 0.0, 0.0, 0.436],
                    "docker" => vec![0.0, 1.0, 0.0, 0.0],
                    "docker compose" => vec![0.0, 0.95, 0.0, 0.312],
                    "containers" => vec![0.0, 0.5, 0.0, 0.866],
                    _ => vec![0.0, 0.0, 0.0, 1.0],
                })
                .collect())
        }

        fn name(&self) -> &str {
            "table"
        }
    }

    fn taxonomy() -> Taxonomy {
        Taxonomy::from_terms(vec![
            SkillTerm::new("Python", SkillCategory::Language, vec![1.0, 0.0, 0.0, 0.0]),
            SkillTerm::new("Docker", SkillCategory::Platform, vec![0.0, 1.0, 0.0, 0.0]),
            SkillTerm::new("Rust", SkillCategory::Language, vec![0.0, 0.0, 1.0, 0.0]),
        ])
        .unwrap()
    }

    fn candidate(text: &str, contexts: &[&str]) -> SkillCandidate {
        candidate_at(text, 0, contexts)
    }

    /// Mentions start at `offset` and sit 100 bytes apart
    fn candidate_at(text: &str, offset: usize, contexts: &[&str]) -> SkillCandidate {
        SkillCandidate {
            text: text.to_string(),
            mentions: contexts
                .iter()
                .enumerate()
                .map(|(i, c)| CandidateSkillMention {
                    text: text.to_string(),
                    context: c.to_string(),
                    position: offset + i * 100,
                })
                .collect(),
        }
    }

    fn validate(candidates: &[SkillCandidate]) -> CandidateProfile {
        let taxonomy = taxonomy();
        let validator = SkillValidator::new(&taxonomy, &ValidationConfig::default()).unwrap();
        let retry = RetryConfig::default();
        let embedder = BatchEmbedder::new(&TableProvider, &retry, Duration::from_secs(5));
        validator.validate(candidates, &embedder, &Deadline::none()).unwrap()
    }

    #[test]
    fn test_merges_synonyms_and_rejects_noise() {
        let profile = validate(&[
            candidate("Python", &["built a service in Python"]),
            candidate_at("py", 500, &["py scripts"]),
            candidate("Synergy", &["synergy"]),
            candidate("containers", &["containers"]),
        ]);

        assert_eq!(profile.names(), vec!["docker", "python"]);
        let python = profile.get("python").unwrap();
        assert_eq!(python.mention_count, 2);
        assert!((python.confidence - 1.0).abs() < 1e-5);
        assert_eq!(python.matched_forms, vec!["Python", "py"]);
        assert!((profile.get("docker").unwrap().confidence - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_overlapping_forms_count_as_one_mention() {
        let context = "Deployed with Docker Compose at work.";
        let mention = |text: &str| CandidateSkillMention {
            text: text.to_string(),
            context: context.to_string(),
            position: 14,
        };
        let profile = validate(&[
            SkillCandidate {
                text: "Docker".to_string(),
                mentions: vec![mention("Docker")],
            },
            SkillCandidate {
                text: "Docker Compose".to_string(),
                mentions: vec![mention("Docker Compose")],
            },
        ]);

        let docker = profile.get("docker").unwrap();
        assert_eq!(docker.mention_count, 1);
        assert_eq!(docker.matched_forms, vec!["Docker", "Docker Compose"]);
        assert_ne!(docker.proficiency, Proficiency::Expert);
    }

    #[test]
    fn test_extracted_ngrams_do_not_inflate_mentions() {
        use crate::config::ExtractionConfig;
        use crate::processing::extractor::SkillExtractor;

        let extractor = SkillExtractor::new(&ExtractionConfig::default())
            .unwrap()
            .with_vocabulary(["docker", "docker compose"])
            .unwrap();
        let text = "Deployed with Docker Compose at work. Later moved the Docker images to a registry.";
        let profile = validate(&extractor.extract(text));

        assert_eq!(profile.get("docker").unwrap().mention_count, 2);
    }

    #[test]
    fn test_distinct_occurrences_keeps_the_longest_span() {
        let long = CandidateSkillMention {
            text: "Google Cloud Platform".to_string(),
            context: String::new(),
            position: 10,
        };
        let inner = CandidateSkillMention {
            text: "Cloud".to_string(),
            context: String::new(),
            position: 17,
        };
        let head = CandidateSkillMention {
            text: "Google".to_string(),
            context: String::new(),
            position: 10,
        };
        let later = CandidateSkillMention {
            text: "Google".to_string(),
            context: String::new(),
            position: 80,
        };

        let kept = distinct_occurrences(vec![&inner, &head, &later, &long]);
        assert_eq!(kept, vec![&long, &later]);
    }

    #[test]
    fn test_proficiency_bands() {
        let profile = validate(&[
            candidate(
                "Python",
                &["built data pipelines in Python", "Python tooling", "Python scripts"],
            ),
            candidate("docker", &["some docker"]),
        ]);

        let python = profile.get("python").unwrap();
        assert_eq!(python.proficiency, Proficiency::Expert);
        let docker = profile.get("docker").unwrap();
        assert_eq!(docker.proficiency, Proficiency::Beginner);
        assert!(docker.proficiency_score < python.proficiency_score);
    }

    #[test]
    fn test_years_and_basic_cues() {
        let estimator = ProficiencyEstimator::new(&ProficiencyConfig::default()).unwrap();
        let (_, seasoned) = estimator.estimate(["7+ years of Rust"], 1);
        let (_, learning) = estimator.estimate(["currently learning Rust"], 1);
        let (_, neutral) = estimator.estimate(["Rust"], 1);
        assert!(seasoned > neutral);
        assert!(learning < neutral);

        let (_, unrelated) = estimator.estimate(["rebuilt nothing"], 1);
        assert!((unrelated - neutral).abs() < 1e-6, "'built' must match whole words");
    }

    #[test]
    fn test_custom_threshold_rejects_weak_matches() {
        let taxonomy = taxonomy();
        let validator = SkillValidator::new(&taxonomy, &ValidationConfig::default())
            .unwrap()
            .with_threshold(0.6);
        let retry = RetryConfig::default();
        let embedder = BatchEmbedder::new(&TableProvider, &retry, Duration::from_secs(5));

        let candidates = vec![candidate("containers", &["containers"]), candidate("Python", &["Python"])];
        let profile = validator.validate(&candidates, &embedder, &Deadline::none()).unwrap();
        assert_eq!(profile.names(), vec!["python"]);
    }

    #[test]
    fn test_empty_candidates_make_empty_profile() {
        let profile = validate(&[]);
        assert!(profile.is_empty());
    }

    #[test]
    fn test_validation_is_idempotent() {
        let candidates = vec![candidate("Python", &["Python"]), candidate("docker", &["docker"])];
        assert_eq!(validate(&candidates), validate(&candidates));
    }

    #[test]
    fn test_batch_keeps_sets_separate() {
        let taxonomy = taxonomy();
        let validator = SkillValidator::new(&taxonomy, &ValidationConfig::default()).unwrap();
        let retry = RetryConfig::default();
        let embedder = BatchEmbedder::new(&TableProvider, &retry, Duration::from_secs(5));

        let first = vec![candidate("Python", &["Python"])];
        let second = vec![candidate("docker", &["docker"]), candidate("python3", &["python3"])];
        let profiles = validator
            .validate_batch(&[first.as_slice(), second.as_slice()], &embedder, &Deadline::none())
            .unwrap();

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].names(), vec!["python"]);
        assert_eq!(profiles[1].names(), vec!["docker", "python"]);
    }

    #[test]
    fn test_from_skills_merges_duplicates() {
        let term = Arc::new(SkillTerm::new("Go", SkillCategory::Language, vec![1.0]));
        let skill = |confidence: f32, count: usize| ValidatedSkill {
            term: Arc::clone(&term),
            confidence,
            proficiency: Proficiency::Beginner,
            proficiency_score: 0.3,
            mention_count: count,
            matched_forms: vec!["Go".to_string()],
        };
        let profile = CandidateProfile::from_skills(vec![skill(0.6, 1), skill(0.9, 2)]);
        assert_eq!(profile.len(), 1);
        assert_eq!(profile.skills()[0].confidence, 0.9);
        assert_eq!(profile.skills()[0].mention_count, 3);
    }
}
