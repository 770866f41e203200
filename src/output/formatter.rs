//! Output formatters for skill-gap reports

use crate::config::OutputFormat;
use crate::error::{Result, SkillGapError};
use crate::output::report::SkillGapReport;
use crate::processing::gap_scorer::{GapKind, GapPriority, GapRecord};
use crate::processing::roadmap::RoadmapItem;
use colored::{Color, Colorize};
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

/// Trait for formatting skill-gap reports
pub trait OutputFormatter {
    fn format_report(&self, report: &SkillGapReport) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Console formatter with colors and aligned tables
pub struct ConsoleFormatter {
    use_colors: bool,
    detailed: bool,
    max_rows: usize,
}

/// JSON formatter for machine consumers
pub struct JsonFormatter {
    pretty: bool,
}

/// Markdown formatter for documentation and sharing
pub struct MarkdownFormatter {
    include_metadata: bool,
}

/// Report generator that coordinates different formatters
pub struct ReportGenerator {
    console_formatter: ConsoleFormatter,
    json_formatter: JsonFormatter,
    markdown_formatter: MarkdownFormatter,
}

const DEFAULT_MAX_ROWS: usize = 15;

impl ConsoleFormatter {
    pub fn new(use_colors: bool, detailed: bool) -> Self {
        Self {
            use_colors,
            detailed,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.max(1);
        self
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str, level: u8) -> String {
        let prefix = match level {
            1 => "█",
            2 => "▓",
            3 => "▒",
            _ => "░",
        };

        let color = match level {
            1 => Color::Blue,
            2 => Color::Green,
            3 => Color::Yellow,
            _ => Color::White,
        };

        if self.use_colors {
            format!("\n{} {}\n", prefix.color(color).bold(), title.color(color).bold())
        } else {
            format!("\n{} {}\n", prefix, title)
        }
    }

    fn priority_color(priority: GapPriority) -> Color {
        match priority {
            GapPriority::Critical => Color::Red,
            GapPriority::High => Color::Yellow,
            GapPriority::NiceToHave => Color::Cyan,
        }
    }

    fn format_priority_icon(priority: GapPriority) -> &'static str {
        match priority {
            GapPriority::Critical => "🔴 ",
            GapPriority::High => "🟡 ",
            GapPriority::NiceToHave => "🟢 ",
        }
    }

    fn severity_bar(&self, severity: f32) -> String {
        let filled = (severity.clamp(0.0, 1.0) * 10.0).round() as usize;
        let bar = format!("{}{}", "■".repeat(filled), "□".repeat(10 - filled));
        let color = match severity {
            s if s >= 0.75 => Color::Red,
            s if s >= 0.4 => Color::Yellow,
            _ => Color::Green,
        };
        self.colorize(&bar, color)
    }

    fn format_gap_row(&self, gap: &GapRecord) -> String {
        let kind = match gap.kind {
            GapKind::Missing => String::new(),
            GapKind::Partial => format!(
                " (partial, {:.0}% match)",
                gap.candidate_confidence.unwrap_or(0.0) * 100.0
            ),
        };
        format!(
            "  {}{} {} {:>5.2} | in {:>3.0}% of postings | velocity {:.2}x | confidence {:.2}{}\n",
            Self::format_priority_icon(gap.priority),
            self.colorize(&pad(&gap.term.display_name, 22), Self::priority_color(gap.priority)),
            self.severity_bar(gap.severity),
            gap.severity,
            gap.frequency_ratio * 100.0,
            gap.demand_velocity,
            gap.confidence,
            self.colorize(&kind, Color::BrightBlack)
        )
    }

    fn format_roadmap_item(&self, item: &RoadmapItem) -> String {
        let anchors = if item.anchors.is_empty() {
            self.colorize("no related skills in profile", Color::BrightBlack)
        } else {
            item.anchors
                .iter()
                .map(|a| format!("{} ({:.2})", a.skill.display_name, a.similarity))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "  {:>2}. {} {} | builds on: {}\n",
            item.rank,
            pad(&item.gap.term.display_name, 22),
            self.colorize(&pad(&item.estimate.label, 12), Color::Cyan),
            anchors
        )
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_report(&self, report: &SkillGapReport) -> Result<String> {
        let mut output = String::new();
        let summary = &report.summary;
        let analysis = &report.analysis;

        output.push_str(&self.format_header("📊 SKILL GAP ANALYSIS", 1));
        output.push_str(&format!(
            "{}\n",
            self.colorize(&"═".repeat(60), Color::Blue)
        ));
        output.push_str(&format!(
            "Market coverage: {}% | {}\n",
            summary.market_coverage_percentage,
            self.colorize(&summary.verdict, Color::White)
        ));
        output.push_str(&format!(
            "Postings analysed: {} ({} skipped) | Window: {}\n",
            summary.total_postings, summary.skipped_postings, report.metadata.corpus_window
        ));
        output.push_str(&format!(
            "Gaps: {} {} | {} {} | {} {}\n",
            summary.critical_gaps,
            self.colorize("critical", Color::Red),
            summary.high_gaps,
            self.colorize("high", Color::Yellow),
            summary.nice_to_have_gaps,
            self.colorize("nice-to-have", Color::Cyan)
        ));

        // Profile
        output.push_str(&self.format_header(
            &format!("✅ Validated Skills ({})", summary.validated_skills),
            2,
        ));
        if analysis.profile.is_empty() {
            output.push_str(&self.colorize("  No skills recognized in the resume\n", Color::BrightBlack));
        }
        for skill in analysis.profile.iter().take(self.max_rows) {
            output.push_str(&format!(
                "  • {} {} {:.2} | {} mention{}\n",
                pad(&skill.term.display_name, 22),
                self.colorize(&pad(&skill.proficiency.to_string(), 12), Color::Green),
                skill.confidence,
                skill.mention_count,
                if skill.mention_count == 1 { "" } else { "s" }
            ));
        }
        push_overflow(&mut output, analysis.profile.len(), self.max_rows);

        // Gaps
        output.push_str(&self.format_header("🎯 Skill Gaps", 2));
        if analysis.gaps.is_empty() {
            output.push_str(&self.colorize("  No gaps against current demand\n", Color::Green));
        }
        for gap in analysis.gaps.records.iter().take(self.max_rows) {
            output.push_str(&self.format_gap_row(gap));
        }
        push_overflow(&mut output, analysis.gaps.len(), self.max_rows);

        // Roadmap
        if !analysis.roadmap.is_empty() {
            output.push_str(&self.format_header("🚀 Learning Roadmap", 2));
            for item in analysis.roadmap.items.iter().take(self.max_rows) {
                output.push_str(&self.format_roadmap_item(item));
            }
            push_overflow(&mut output, analysis.roadmap.len(), self.max_rows);

            let quick_wins: Vec<_> = analysis
                .roadmap
                .within_weeks(2)
                .map(|item| item.gap.term.display_name.as_str())
                .collect();
            if !quick_wins.is_empty() {
                output.push_str(&format!(
                    "\n  {} {}\n",
                    self.colorize("Quick wins (≤ 2 weeks):", Color::Green),
                    quick_wins.join(", ")
                ));
            }
        }

        if !analysis.skipped_postings.is_empty() {
            output.push_str(&self.format_header("⚠️  Skipped Postings", 3));
            for skipped in &analysis.skipped_postings {
                output.push_str(&format!(
                    "  • {} {}\n",
                    skipped.id,
                    self.colorize(&format!("({})", skipped.reason), Color::BrightBlack)
                ));
            }
        }

        if self.detailed {
            output.push_str(&self.format_header("📋 Detailed Analysis", 2));

            if !analysis.gaps.matched.is_empty() {
                output.push_str(&self.format_header("Matched Market Skills", 3));
                output.push_str(&format!("  {}\n", analysis.gaps.matched.join(", ")));
            }

            if !analysis.gaps.domain_breakdown.is_empty() {
                output.push_str(&self.format_header("Gaps by Domain", 3));
                for (domain, count) in &analysis.gaps.domain_breakdown {
                    output.push_str(&format!("  {} {}\n", pad(domain, 16), count));
                }
            }

            output.push_str(&self.format_header("Posting Fit", 3));
            for posting in analysis.best_fits().into_iter().take(self.max_rows) {
                let color = if posting.coverage >= 0.8 {
                    Color::Green
                } else if posting.coverage >= 0.5 {
                    Color::Yellow
                } else {
                    Color::Red
                };
                output.push_str(&format!(
                    "  {} {} {}",
                    pad(&posting.id, 16),
                    self.colorize(&format!("{:>3.0}%", posting.coverage * 100.0), color),
                    pad(&posting.fit.to_string(), 16)
                ));
                if !posting.missing.is_empty() {
                    output.push_str(&self.colorize(
                        &format!(" missing: {}", posting.missing.join(", ")),
                        Color::BrightBlack,
                    ));
                }
                output.push('\n');
            }
            push_overflow(&mut output, analysis.postings.len(), self.max_rows);
        }

        output.push_str(&format!(
            "\n{} Generated by skill-gap v{} | Model: {} | Taxonomy: {} skills | {}ms\n",
            self.colorize("ℹ️", Color::Blue),
            report.metadata.version,
            report.metadata.embedding_model,
            report.metadata.taxonomy_size,
            report.metadata.processing_time_ms
        ));

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Console
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &SkillGapReport) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        };
        json.map_err(|e| SkillGapError::OutputFormatting(format!("JSON serialization failed: {}", e)))
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

impl MarkdownFormatter {
    pub fn new(include_metadata: bool) -> Self {
        Self { include_metadata }
    }

    fn escape(text: &str) -> String {
        text.replace('|', "\\|")
    }
}

impl OutputFormatter for MarkdownFormatter {
    fn format_report(&self, report: &SkillGapReport) -> Result<String> {
        let mut output = String::new();
        let summary = &report.summary;
        let analysis = &report.analysis;

        output.push_str("# 📊 Skill Gap Analysis Report\n\n");

        if self.include_metadata {
            output.push_str(&format!(
                "**Generated:** {} | **Processing Time:** {}ms\n",
                report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
                report.metadata.processing_time_ms
            ));
            output.push_str(&format!(
                "**Resume:** `{}` | **Postings:** `{}` | **Model:** `{}`\n\n",
                file_name(&report.metadata.resume_file),
                file_name(&report.metadata.postings_file),
                report.metadata.embedding_model
            ));
        }

        output.push_str("## Summary\n\n");
        output.push_str(&format!(
            "**Market Coverage:** {}%\n\n**Verdict:** {}\n\n",
            summary.market_coverage_percentage, summary.verdict
        ));
        output.push_str("| Metric | Value |\n|--------|-------|\n");
        output.push_str(&format!("| Validated skills | {} |\n", summary.validated_skills));
        output.push_str(&format!("| Postings analysed | {} |\n", summary.total_postings));
        output.push_str(&format!("| Postings skipped | {} |\n", summary.skipped_postings));
        output.push_str(&format!("| Critical gaps | {} |\n", summary.critical_gaps));
        output.push_str(&format!("| High gaps | {} |\n", summary.high_gaps));
        output.push_str(&format!("| Nice-to-have gaps | {} |\n\n", summary.nice_to_have_gaps));

        output.push_str("## ✅ Validated Skills\n\n");
        if analysis.profile.is_empty() {
            output.push_str("_No skills recognized._\n\n");
        } else {
            output.push_str("| Skill | Category | Proficiency | Confidence | Mentions |\n");
            output.push_str("|-------|----------|-------------|------------|----------|\n");
            for skill in analysis.profile.iter() {
                output.push_str(&format!(
                    "| {} | {} | {} | {:.2} | {} |\n",
                    Self::escape(&skill.term.display_name),
                    skill.term.category,
                    skill.proficiency,
                    skill.confidence,
                    skill.mention_count
                ));
            }
            output.push('\n');
        }

        output.push_str("## 🎯 Skill Gaps\n\n");
        if analysis.gaps.is_empty() {
            output.push_str("_No gaps against current demand._\n\n");
        } else {
            output.push_str("| Skill | Priority | Severity | Frequency | Velocity | Confidence | Kind |\n");
            output.push_str("|-------|----------|----------|-----------|----------|------------|------|\n");
            for gap in &analysis.gaps.records {
                output.push_str(&format!(
                    "| {} | {} | {:.2} | {}/{} | {:.2}x | {:.2} | {} |\n",
                    Self::escape(&gap.term.display_name),
                    gap.priority,
                    gap.severity,
                    gap.frequency,
                    analysis.gaps.total_postings,
                    gap.demand_velocity,
                    gap.confidence,
                    match gap.kind {
                        GapKind::Missing => "missing",
                        GapKind::Partial => "partial",
                    }
                ));
            }
            output.push('\n');
        }

        if !analysis.roadmap.is_empty() {
            output.push_str("## 🚀 Learning Roadmap\n\n");
            for item in &analysis.roadmap.items {
                output.push_str(&format!(
                    "{}. **{}** ({}, severity {:.2})",
                    item.rank, item.gap.term.display_name, item.estimate.label, item.gap.severity
                ));
                if !item.anchors.is_empty() {
                    let anchors: Vec<String> = item
                        .anchors
                        .iter()
                        .map(|a| format!("{} ({:.2})", a.skill.display_name, a.similarity))
                        .collect();
                    output.push_str(&format!(": builds on {}", anchors.join(", ")));
                }
                output.push('\n');
            }
            output.push('\n');
        }

        if !analysis.postings.is_empty() {
            output.push_str("## 💼 Posting Fit\n\n");
            output.push_str("| Posting | Coverage | Fit | Missing |\n");
            output.push_str("|---------|----------|-----|---------|\n");
            for posting in analysis.best_fits() {
                output.push_str(&format!(
                    "| {} | {:.0}% | {} | {} |\n",
                    Self::escape(&posting.id),
                    posting.coverage * 100.0,
                    posting.fit,
                    Self::escape(&posting.missing.join(", "))
                ));
            }
            output.push('\n');
        }

        if !analysis.gaps.domain_breakdown.is_empty() {
            output.push_str("## Gaps by Domain\n\n| Domain | Gaps |\n|--------|------|\n");
            for (domain, count) in &analysis.gaps.domain_breakdown {
                output.push_str(&format!("| {} | {} |\n", domain, count));
            }
            output.push('\n');
        }

        if !analysis.skipped_postings.is_empty() {
            output.push_str("## ⚠️ Skipped Postings\n\n");
            for skipped in &analysis.skipped_postings {
                output.push_str(&format!("- `{}`: {}\n", skipped.id, skipped.reason));
            }
            output.push('\n');
        }

        output.push_str(&format!(
            "---\n*Generated by skill-gap v{}*\n",
            report.metadata.version
        ));
        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(true, false),
            json_formatter: JsonFormatter::new(true),
            markdown_formatter: MarkdownFormatter::new(true),
        }
    }

    pub fn with_options(
        use_colors: bool,
        detailed: bool,
        max_rows: usize,
        pretty_json: bool,
        include_metadata: bool,
    ) -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(use_colors, detailed).with_max_rows(max_rows),
            json_formatter: JsonFormatter::new(pretty_json),
            markdown_formatter: MarkdownFormatter::new(include_metadata),
        }
    }

    pub fn generate_report(&self, report: &SkillGapReport, format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Console => self.console_formatter.format_report(report),
            OutputFormat::Json => self.json_formatter.format_report(report),
            OutputFormat::Markdown => self.markdown_formatter.format_report(report),
        }
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn save_report_to_file(content: &str, file_path: &Path) -> Result<()> {
    use std::fs;
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(file_path, content)?;
    Ok(())
}

pub fn suggest_filename(format: &OutputFormat, resume_name: &str, timestamp: bool) -> String {
    let base_name = Path::new(resume_name)
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();

    let timestamp_suffix = if timestamp {
        format!("_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"))
    } else {
        String::new()
    };

    match format {
        OutputFormat::Console => format!("{}_skill_gaps{}.txt", base_name, timestamp_suffix),
        OutputFormat::Json => format!("{}_skill_gaps{}.json", base_name, timestamp_suffix),
        OutputFormat::Markdown => format!("{}_skill_gaps{}.md", base_name, timestamp_suffix),
    }
}

/// Pad or cut to `width` graphemes so table columns line up
fn pad(text: &str, width: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() > width {
        let mut cut: String = graphemes[..width.saturating_sub(1)].concat();
        cut.push('…');
        cut
    } else {
        format!("{}{}", text, " ".repeat(width - graphemes.len()))
    }
}

fn push_overflow(output: &mut String, total: usize, shown: usize) {
    if total > shown {
        output.push_str(&format!("  … and {} more\n", total - shown));
    }
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
