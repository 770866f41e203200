//! Gap severity scoring
//!
//! Compares a validated profile with a market corpus and ranks what is
//! missing. Severity combines how often the market asks for a skill, how
//! much its category matters, and whether demand is growing.

use crate::config::ScoringConfig;
use crate::processing::aggregator::{CorpusWindow, MarketCorpus};
use crate::processing::validator::CandidateProfile;
use crate::taxonomy::SkillTerm;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapKind {
    /// Not in the profile at all
    Missing,
    /// In the profile, but below the match threshold
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GapPriority {
    Critical,
    High,
    NiceToHave,
}

impl fmt::Display for GapPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapPriority::Critical => write!(f, "Critical"),
            GapPriority::High => write!(f, "High"),
            GapPriority::NiceToHave => write!(f, "Nice-to-Have"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapRecord {
    pub term: Arc<SkillTerm>,
    pub frequency: usize,
    pub frequency_ratio: f32,
    pub domain_weight: f32,
    pub demand_velocity: f32,
    /// In [0, 1]; already reduced for partial gaps
    pub severity: f32,
    /// Wilson lower bound of the frequency ratio
    pub confidence: f32,
    pub kind: GapKind,
    pub priority: GapPriority,
    /// The profile's confidence for partial gaps
    pub candidate_confidence: Option<f32>,
}

impl GapRecord {
    pub fn name(&self) -> &str {
        &self.term.name
    }
}

/// Gaps ordered by descending severity, ties by ascending canonical name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapReport {
    pub records: Vec<GapRecord>,
    pub total_postings: usize,
    pub window: CorpusWindow,
    /// Market skills the profile fully covers
    pub matched: Vec<String>,
    /// Gap count per category
    pub domain_breakdown: BTreeMap<String, usize>,
}

impl GapReport {
    pub fn empty(window: CorpusWindow) -> Self {
        Self {
            records: Vec::new(),
            total_postings: 0,
            window,
            matched: Vec::new(),
            domain_breakdown: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&GapRecord> {
        self.records.iter().find(|r| r.term.name == name)
    }

    pub fn with_priority(&self, priority: GapPriority) -> impl Iterator<Item = &GapRecord> {
        self.records.iter().filter(move |r| r.priority == priority)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The ranking order shared by gap reports and roadmaps
pub fn compare_gaps(a: &GapRecord, b: &GapRecord) -> Ordering {
    b.severity
        .total_cmp(&a.severity)
        .then_with(|| a.term.name.cmp(&b.term.name))
}

/// clamp(ratio * weight * velocity, 0, 1)
pub fn severity(frequency_ratio: f32, domain_weight: f32, demand_velocity: f32) -> f32 {
    let raw = frequency_ratio * domain_weight * demand_velocity;
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, 1.0)
}

/// Current frequency over prior frequency, neutral without a prior window
pub fn demand_velocity(frequency: usize, prior_frequency: Option<usize>) -> f32 {
    match prior_frequency {
        Some(prior) => frequency as f32 / prior.max(1) as f32,
        None => 1.0,
    }
}

/// Lower bound of the Wilson score interval for `successes / total`
pub fn wilson_lower_bound(successes: usize, total: usize, z: f64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    let p = (successes as f64 / n).min(1.0);
    let z2 = z * z;

    let centre = p + z2 / (2.0 * n);
    let margin = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt();
    ((centre - margin) / (1.0 + z2 / n)).clamp(0.0, 1.0)
}

pub struct GapScorer<'a> {
    config: &'a ScoringConfig,
}

impl<'a> GapScorer<'a> {
    pub fn new(config: &'a ScoringConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, profile: &CandidateProfile, corpus: &MarketCorpus) -> GapReport {
        let total = corpus.total_postings();
        if total == 0 {
            log::info!("No market data; gap report is empty");
            return GapReport::empty(corpus.window().clone());
        }

        let mut records = Vec::new();
        let mut matched = Vec::new();

        for entry in corpus.entries() {
            let owned = profile.get(&entry.term.name);
            let (kind, candidate_confidence) = match owned {
                Some(skill) if skill.confidence >= self.config.match_threshold => {
                    matched.push(entry.term.name.clone());
                    continue;
                }
                Some(skill) => (GapKind::Partial, Some(skill.confidence)),
                None => (GapKind::Missing, None),
            };

            let frequency_ratio = entry.frequency as f32 / total as f32;
            let domain_weight = self.config.domain_weight(entry.term.category);
            let velocity = demand_velocity(entry.frequency, entry.prior_frequency);

            let mut score = severity(frequency_ratio, domain_weight, velocity);
            if kind == GapKind::Partial {
                score = (score * self.config.partial_multiplier).clamp(0.0, 1.0);
            }

            let confidence = wilson_lower_bound(entry.frequency, total, self.config.wilson_z) as f32;
            let priority = self.priority(frequency_ratio, score, entry.frequency);

            records.push(GapRecord {
                term: Arc::clone(&entry.term),
                frequency: entry.frequency,
                frequency_ratio,
                domain_weight,
                demand_velocity: velocity,
                severity: score,
                confidence,
                kind,
                priority,
                candidate_confidence,
            });
        }

        records.sort_by(compare_gaps);

        let mut domain_breakdown = BTreeMap::new();
        for record in &records {
            *domain_breakdown
                .entry(record.term.category.as_str().to_string())
                .or_insert(0) += 1;
        }

        log::info!(
            "Scored {} gaps against {} postings ({} skills fully matched)",
            records.len(),
            total,
            matched.len()
        );

        GapReport {
            records,
            total_postings: total,
            window: corpus.window().clone(),
            matched,
            domain_breakdown,
        }
    }

    fn priority(&self, frequency_ratio: f32, severity: f32, frequency: usize) -> GapPriority {
        if frequency_ratio > self.config.critical_penetration || severity >= self.config.critical_severity {
            GapPriority::Critical
        } else if frequency > 1 {
            GapPriority::High
        } else {
            GapPriority::NiceToHave
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::aggregator::CorpusEntry;
    use crate::processing::validator::{Proficiency, ValidatedSkill};
    use crate::taxonomy::SkillCategory;

    fn term(name: &str, category: SkillCategory) -> Arc<SkillTerm> {
        Arc::new(SkillTerm::new(name, category, vec![1.0]))
    }

    fn entry(term: &Arc<SkillTerm>, frequency: usize, prior: Option<usize>) -> CorpusEntry {
        CorpusEntry {
            term: Arc::clone(term),
            frequency,
            prior_frequency: prior,
        }
    }

    fn owned(term: &Arc<SkillTerm>, confidence: f32) -> ValidatedSkill {
        ValidatedSkill {
            term: Arc::clone(term),
            confidence,
            proficiency: Proficiency::Intermediate,
            proficiency_score: 0.7,
            mention_count: 2,
            matched_forms: vec![term.display_name.clone()],
        }
    }

    #[test]
    fn test_python_severity_is_clamped() {
        let python = term("Python", SkillCategory::Language);
        let corpus =
            MarketCorpus::from_entries(vec![entry(&python, 90, None)], 100, CorpusWindow::new("now")).unwrap();
        let config = ScoringConfig::default();
        let report = GapScorer::new(&config).score(&CandidateProfile::default(), &corpus);

        assert_eq!(report.len(), 1);
        let record = &report.records[0];
        assert_eq!(record.severity, 1.0);
        assert_eq!(record.demand_velocity, 1.0);
        assert_eq!(record.kind, GapKind::Missing);
        assert_eq!(record.priority, GapPriority::Critical);
        assert!(record.confidence > 0.8 && record.confidence < 0.9);

        let profile = CandidateProfile::from_skills(vec![owned(&python, 0.92)]);
        let report = GapScorer::new(&config).score(&profile, &corpus);
        assert!(report.is_empty());
        assert_eq!(report.matched, vec!["python"]);
    }

    #[test]
    fn test_partial_gap_is_reduced() {
        let sql = term("SQL", SkillCategory::Language);
        let corpus = MarketCorpus::from_entries(vec![entry(&sql, 10, None)], 100, CorpusWindow::new("now")).unwrap();
        let config = ScoringConfig::default();

        let missing = GapScorer::new(&config).score(&CandidateProfile::default(), &corpus);
        let profile = CandidateProfile::from_skills(vec![owned(&sql, 0.5)]);
        let partial = GapScorer::new(&config).score(&profile, &corpus);

        assert!((missing.records[0].severity - 0.3).abs() < 1e-6);
        assert!((partial.records[0].severity - 0.15).abs() < 1e-6);
        assert_eq!(partial.records[0].kind, GapKind::Partial);
        assert_eq!(partial.records[0].candidate_confidence, Some(0.5));
    }

    #[test]
    fn test_empty_market_gives_empty_report() {
        let config = ScoringConfig::default();
        let report = GapScorer::new(&config).score(&CandidateProfile::default(), &MarketCorpus::empty("none"));
        assert!(report.is_empty());
        assert_eq!(report.total_postings, 0);
    }

    #[test]
    fn test_ordering_and_unknown_category_weight() {
        let go = term("Go", SkillCategory::Language);
        let jira = term("Jira", SkillCategory::Tool);
        let rust = term("Rust", SkillCategory::Language);
        let corpus = MarketCorpus::from_entries(
            vec![entry(&rust, 10, None), entry(&jira, 40, None), entry(&go, 10, None)],
            100,
            CorpusWindow::new("now"),
        )
        .unwrap();
        let config = ScoringConfig::default();
        let report = GapScorer::new(&config).score(&CandidateProfile::default(), &corpus);

        let names: Vec<_> = report.records.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["jira", "go", "rust"]);
        assert_eq!(report.get("jira").unwrap().domain_weight, 1.0);
        assert_eq!(report.domain_breakdown["language"], 2);
        assert_eq!(report.domain_breakdown["tool"], 1);
    }

    #[test]
    fn test_velocity_from_prior_window() {
        assert_eq!(demand_velocity(8, None), 1.0);
        assert_eq!(demand_velocity(8, Some(4)), 2.0);
        assert_eq!(demand_velocity(3, Some(0)), 3.0);
        assert_eq!(demand_velocity(2, Some(4)), 0.5);
    }

    #[test]
    fn test_priority_labels() {
        let config = ScoringConfig::default();
        let scorer = GapScorer::new(&config);
        assert_eq!(scorer.priority(0.5, 0.2, 50), GapPriority::Critical);
        assert_eq!(scorer.priority(0.1, 0.8, 10), GapPriority::Critical);
        assert_eq!(scorer.priority(0.1, 0.3, 10), GapPriority::High);
        assert_eq!(scorer.priority(0.01, 0.03, 1), GapPriority::NiceToHave);
    }

    #[test]
    fn test_wilson_lower_bound() {
        assert_eq!(wilson_lower_bound(0, 0, 1.96), 0.0);
        let small = wilson_lower_bound(1, 1, 1.96);
        let large = wilson_lower_bound(100, 100, 1.96);
        assert!(small < 0.25);
        assert!(large > 0.95 && large <= 1.0);
        assert!(wilson_lower_bound(90, 100, 1.96) < 0.9);
    }
}
