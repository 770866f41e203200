//! Report model handed to the formatters

use crate::processing::analyzer::AnalysisReport;
use crate::processing::gap_scorer::{GapKind, GapPriority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An analysis plus the summary and metadata shown around it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillGapReport {
    pub summary: AnalysisSummary,
    pub analysis: AnalysisReport,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub validated_skills: usize,
    pub total_gaps: usize,
    pub critical_gaps: usize,
    pub high_gaps: usize,
    pub nice_to_have_gaps: usize,
    pub partial_gaps: usize,
    pub matched_skills: usize,
    /// Share of market skills the candidate fully covers, 0-100
    pub market_coverage_percentage: u8,
    pub total_postings: usize,
    pub skipped_postings: usize,
    pub verdict: String,
    /// Names of the highest-ranked roadmap items
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub embedding_model: String,
    pub taxonomy_size: usize,
    pub corpus_window: String,
    pub resume_file: String,
    pub postings_file: String,
    pub version: String,
}

impl SkillGapReport {
    pub fn from_analysis(analysis: AnalysisReport, resume_file: &str, postings_file: &str) -> Self {
        let summary = AnalysisSummary::from_analysis(&analysis);
        let metadata = ReportMetadata {
            generated_at: Utc::now(),
            processing_time_ms: analysis.processing_time_ms,
            embedding_model: analysis.embedding_model.clone(),
            taxonomy_size: analysis.taxonomy_size,
            corpus_window: analysis.gaps.window.label.clone(),
            resume_file: resume_file.to_string(),
            postings_file: postings_file.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        Self {
            summary,
            analysis,
            metadata,
        }
    }
}

impl AnalysisSummary {
    pub fn from_analysis(analysis: &AnalysisReport) -> Self {
        let gaps = &analysis.gaps;
        let count = |priority: GapPriority| gaps.with_priority(priority).count();
        let matched = gaps.matched.len();
        let market_skills = matched + gaps.len();

        let coverage = if market_skills == 0 {
            0.0
        } else {
            matched as f32 / market_skills as f32
        };
        let critical = count(GapPriority::Critical);

        Self {
            validated_skills: analysis.profile.len(),
            total_gaps: gaps.len(),
            critical_gaps: critical,
            high_gaps: count(GapPriority::High),
            nice_to_have_gaps: count(GapPriority::NiceToHave),
            partial_gaps: gaps.records.iter().filter(|r| r.kind == GapKind::Partial).count(),
            matched_skills: matched,
            market_coverage_percentage: (coverage * 100.0).round().clamp(0.0, 100.0) as u8,
            total_postings: gaps.total_postings,
            skipped_postings: analysis.skipped_postings.len(),
            verdict: verdict(gaps.total_postings, coverage, critical),
            next_steps: analysis
                .roadmap
                .items
                .iter()
                .take(3)
                .map(|item| item.gap.term.display_name.clone())
                .collect(),
        }
    }
}

fn verdict(total_postings: usize, coverage: f32, critical: usize) -> String {
    if total_postings == 0 {
        return "No market data: add postings to measure gaps".to_string();
    }
    let text = match (coverage, critical) {
        (c, 0) if c >= 0.8 => "Strong market fit",
        (c, _) if c >= 0.8 => "Strong fit with a few critical gaps",
        (c, 0) if c >= 0.5 => "Good fit, gaps are secondary",
        (c, _) if c >= 0.5 => "Moderate fit, close the critical gaps first",
        _ => "Significant gaps against current demand",
    };
    text.to_string()
}
