//! Learning roadmap prioritization
//!
//! Orders gaps by severity, then by how quickly they can be learned given
//! what the candidate already knows. Learnability comes from transfer
//! anchors: known skills close to the gap in embedding space.

use crate::config::{DurationBand, RoadmapConfig};
use crate::processing::embeddings::cosine;
use crate::processing::gap_scorer::{GapRecord, GapReport};
use crate::processing::validator::CandidateProfile;
use crate::taxonomy::SkillTerm;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferAnchor {
    pub skill: Arc<SkillTerm>,
    pub similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningEstimate {
    pub min_weeks: u32,
    pub max_weeks: u32,
    pub label: String,
}

impl LearningEstimate {
    pub fn new(min_weeks: u32, max_weeks: u32) -> Self {
        let label = if min_weeks == max_weeks {
            format!("{} week{}", min_weeks, if min_weeks == 1 { "" } else { "s" })
        } else {
            format!("{}–{} weeks", min_weeks, max_weeks)
        };
        Self {
            min_weeks,
            max_weeks,
            label,
        }
    }

    fn from_band(band: &DurationBand) -> Self {
        Self::new(band.min_weeks, band.max_weeks)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapItem {
    pub gap: GapRecord,
    /// Best first, at most `top_k`
    pub anchors: Vec<TransferAnchor>,
    pub estimate: LearningEstimate,
    /// 1-based
    pub rank: usize,
}

impl RoadmapItem {
    pub fn best_anchor(&self) -> Option<&TransferAnchor> {
        self.anchors.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadmapReport {
    pub items: Vec<RoadmapItem>,
}

impl RoadmapReport {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quick wins: items whose upper estimate fits in `weeks`
    pub fn within_weeks(&self, weeks: u32) -> impl Iterator<Item = &RoadmapItem> {
        self.items.iter().filter(move |item| item.estimate.max_weeks <= weeks)
    }
}

pub struct RoadmapPrioritizer<'a> {
    config: &'a RoadmapConfig,
}

impl<'a> RoadmapPrioritizer<'a> {
    pub fn new(config: &'a RoadmapConfig) -> Self {
        Self { config }
    }

    pub fn prioritize(&self, gaps: &GapReport, profile: &CandidateProfile) -> RoadmapReport {
        let mut items: Vec<RoadmapItem> = gaps
            .records
            .iter()
            .map(|gap| {
                let anchors = self.anchors_for(&gap.term, profile);
                let estimate = self.estimate(anchors.first().map(|a| a.similarity));
                RoadmapItem {
                    gap: gap.clone(),
                    anchors,
                    estimate,
                    rank: 0,
                }
            })
            .collect();

        items.sort_by(|a, b| {
            b.gap
                .severity
                .total_cmp(&a.gap.severity)
                .then_with(|| a.estimate.max_weeks.cmp(&b.estimate.max_weeks))
                .then_with(|| a.estimate.min_weeks.cmp(&b.estimate.min_weeks))
                .then_with(|| a.gap.term.name.cmp(&b.gap.term.name))
        });

        for (i, item) in items.iter_mut().enumerate() {
            item.rank = i + 1;
        }

        log::info!("Roadmap prioritized {} items", items.len());
        RoadmapReport { items }
    }

    /// Known skills closest to `target`, above the relevance floor
    pub fn anchors_for(&self, target: &SkillTerm, profile: &CandidateProfile) -> Vec<TransferAnchor> {
        let mut anchors: Vec<TransferAnchor> = profile
            .iter()
            .filter(|known| known.term.name != target.name)
            .map(|known| TransferAnchor {
                skill: Arc::clone(&known.term),
                similarity: cosine(&target.embedding, &known.term.embedding),
            })
            .filter(|anchor| anchor.similarity >= self.config.min_anchor_similarity)
            .collect();

        anchors.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.skill.name.cmp(&b.skill.name))
        });
        anchors.truncate(self.config.top_k);
        anchors
    }

    /// Look up the duration band for the best anchor similarity
    pub fn estimate(&self, best_similarity: Option<f32>) -> LearningEstimate {
        best_similarity
            .and_then(|similarity| {
                self.config
                    .duration_curve
                    .iter()
                    .find(|band| similarity >= band.min_similarity)
            })
            .map(LearningEstimate::from_band)
            .unwrap_or_else(|| LearningEstimate::new(self.config.fallback_min_weeks, self.config.fallback_max_weeks))
    }
}
