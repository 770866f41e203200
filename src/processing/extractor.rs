//! Lexical skill candidate extraction
//!
//! Turns free text into candidate skill strings plus the places they were
//! mentioned. Nothing here is semantic: recall matters more than precision,
//! the validator filters the noise.

use crate::config::ExtractionConfig;
use crate::error::{Result, SkillGapError};
use aho_corasick::{AhoCorasick, MatchKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One place a candidate string occurs in the source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSkillMention {
    pub text: String,
    /// Surrounding text, used for proficiency cues
    #[serde(default)]
    pub context: String,
    /// Byte offset into the source text
    #[serde(default)]
    pub position: usize,
}

/// A deduplicated candidate and every mention of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillCandidate {
    pub text: String,
    pub mentions: Vec<CandidateSkillMention>,
}

impl SkillCandidate {
    pub fn mention_count(&self) -> usize {
        self.mentions.len()
    }
}

/// Candidate text, optionally with mentions a caller extracted itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRawInput {
    pub text: String,
    #[serde(default)]
    pub mentions: Option<Vec<CandidateSkillMention>>,
}

impl CandidateRawInput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mentions: None,
        }
    }
}

const STOP_WORDS: &[&str] = &[
    "a", "about", "ability", "also", "an", "and", "apr", "april", "are", "as", "at", "aug", "august",
    "be", "been", "bonus", "built", "but", "by", "can", "company", "contact", "dec", "december",
    "developed", "education", "email", "engineer", "engineering", "excellent", "experience",
    "feb", "february", "for", "from", "good", "had", "has", "have", "he", "her", "his", "i",
    "in", "inc", "including", "is", "it", "its", "jan", "january", "job", "jul", "july", "jun",
    "june", "junior", "knowledge", "lead", "led", "llc", "ltd", "manager", "mar", "march", "may",
    "me", "must", "my", "nice", "nov", "november", "oct", "october", "of", "on", "or", "our",
    "phone", "plus", "preferred", "present", "qualifications", "required", "requirements",
    "responsibilities", "role", "sep", "sept", "september", "senior", "she", "should", "skills",
    "strong", "summary", "team", "that", "the", "their", "these", "they", "this", "those", "to",
    "university", "us", "used", "using", "was", "we", "were", "will", "with", "work", "working",
    "year", "years", "you", "your",
];

const EDGE_PUNCTUATION: &[char] = &[
    '"', '\'', '`', '(', ')', '[', ']', '{', '}', '<', '>', ',', ';', ':', '!', '?', '*', '-', '•', '–', '—', '|',
];

pub struct SkillExtractor {
    config: ExtractionConfig,
    trigger_pattern: Regex,
    trigger_split: Regex,
    list_label: Regex,
    list_split: Regex,
    token_pattern: Regex,
    stop_words: HashSet<&'static str>,
    vocabulary: Option<Vocabulary>,
}

struct Vocabulary {
    matcher: AhoCorasick,
    terms: Vec<String>,
}

impl SkillExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let build = |pattern: &str| {
            Regex::new(pattern).map_err(|e| SkillGapError::Configuration(format!("Invalid extraction pattern: {}", e)))
        };

        Ok(Self {
            config: config.clone(),
            trigger_pattern: build(
                r"(?i)\b(?:experience (?:with|in)|proficient (?:in|with)|proficiency (?:in|with)|expertise (?:in|with)|knowledge of|familiar(?:ity)? with|skilled in|worked with|using)\s+((?:[^;:\n()!?.]|\.\S)+)",
            )?,
            trigger_split: build(r"(?i)\s*(?:,|/|&|\band\b|\bor\b)\s*")?,
            list_label: build(r"^\s*[-*•]?\s*(?:[^:,;|•/\n]{1,40}:)?\s*")?,
            list_split: build(r"\s*[,;|•/]\s*")?,
            token_pattern: build(r"[A-Za-z0-9][A-Za-z0-9+#.\-]*")?,
            stop_words: STOP_WORDS.iter().copied().collect(),
            vocabulary: None,
        })
    }

    /// Also match known skill names and aliases verbatim.
    ///
    /// Terms of one or two characters ("go", "r", "js") only match when the
    /// occurrence starts with an uppercase letter, to keep everyday words out.
    pub fn with_vocabulary<I, S>(mut self, terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let terms: Vec<String> = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect();

        if terms.is_empty() {
            self.vocabulary = None;
            return Ok(self);
        }

        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(&terms)
            .map_err(|e| SkillGapError::Configuration(format!("Failed to build vocabulary matcher: {}", e)))?;

        self.vocabulary = Some(Vocabulary { matcher, terms });
        Ok(self)
    }

    /// Candidates for one input, honouring pre-extracted mentions
    pub fn prepare(&self, input: &CandidateRawInput) -> Vec<SkillCandidate> {
        match &input.mentions {
            Some(mentions) => Self::group_mentions(mentions),
            None => self.extract(&input.text),
        }
    }

    /// Group caller-supplied mentions by case-insensitive text
    pub fn group_mentions(mentions: &[CandidateSkillMention]) -> Vec<SkillCandidate> {
        let mut order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, SkillCandidate> = HashMap::new();

        for mention in mentions {
            let text = collapse_whitespace(&mention.text);
            if text.is_empty() {
                continue;
            }
            let key = text.to_lowercase();
            grouped
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    SkillCandidate {
                        text: text.clone(),
                        mentions: Vec::new(),
                    }
                })
                .mentions
                .push(mention.clone());
        }

        order.into_iter().filter_map(|key| grouped.remove(&key)).collect()
    }

    /// Extract deduplicated candidates, ordered by first appearance
    pub fn extract(&self, text: &str) -> Vec<SkillCandidate> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut raw = Vec::new();
        self.collect_trigger_phrases(text, &mut raw);
        self.collect_delimited_lists(text, &mut raw);
        self.collect_capitalized(text, &mut raw);
        self.collect_vocabulary(text, &mut raw);

        raw.sort_by_key(|(position, _)| *position);

        let mut seen = HashSet::new();
        let mut candidates: Vec<(String, usize)> = Vec::new();
        for (position, candidate) in raw {
            if seen.insert(candidate.to_lowercase()) {
                candidates.push((candidate, position));
            }
        }

        log::debug!("Extracted {} candidate strings", candidates.len());
        self.attach_mentions(text, candidates)
    }

    fn collect_trigger_phrases(&self, text: &str, out: &mut Vec<(usize, String)>) {
        for captures in self.trigger_pattern.captures_iter(text) {
            let Some(phrase) = captures.get(1) else { continue };
            for (offset, piece) in split_with_offsets(&self.trigger_split, phrase.as_str()) {
                self.push_candidate(phrase.start() + offset, piece, 2, out);
            }
        }
    }

    fn collect_delimited_lists(&self, text: &str, out: &mut Vec<(usize, String)>) {
        let mut line_start = 0;
        for line in text.split_inclusive('\n') {
            let body_offset = self.list_label.find(line).map_or(0, |m| m.end());
            let body = &line[body_offset..];
            let parts = split_with_offsets(&self.list_split, body);

            let short_parts = parts
                .iter()
                .filter(|(_, part)| {
                    let words = part.split_whitespace().count();
                    words > 0 && words <= self.config.max_candidate_words
                })
                .count();

            if short_parts >= 3 {
                for (offset, part) in parts {
                    self.push_candidate(line_start + body_offset + offset, part, 2, out);
                }
            }
            line_start += line.len();
        }
    }

    fn collect_capitalized(&self, text: &str, out: &mut Vec<(usize, String)>) {
        let mut run: Vec<(usize, &str)> = Vec::new();
        let mut last_end = 0;

        for token in self.token_pattern.find_iter(text) {
            let word = token.as_str().trim_end_matches(['.', '-']);
            let gap = &text[last_end..token.start()];
            let contiguous = !run.is_empty() && !gap.is_empty() && gap.chars().all(|c| c == ' ' || c == '\t');

            if !contiguous {
                self.flush_capitalized_run(&run, text, out);
                run.clear();
            }

            if is_capitalized(word) {
                run.push((token.start(), word));
                last_end = token.start() + word.len();
                // sentence punctuation ends the run
                if word.len() < token.as_str().len() {
                    self.flush_capitalized_run(&run, text, out);
                    run.clear();
                }
            } else {
                self.flush_capitalized_run(&run, text, out);
                run.clear();
                last_end = token.end();
            }
        }
        self.flush_capitalized_run(&run, text, out);
    }

    fn flush_capitalized_run(&self, run: &[(usize, &str)], text: &str, out: &mut Vec<(usize, String)>) {
        if run.is_empty() {
            return;
        }

        for (position, word) in run {
            if !self.is_stop_word(word) {
                self.push_candidate(*position, word, 2, out);
            }
        }

        let first = run.iter().position(|(_, w)| !self.is_stop_word(w));
        let last = run.iter().rposition(|(_, w)| !self.is_stop_word(w));
        if let (Some(first), Some(last)) = (first, last) {
            let span = &run[first..=last];
            if span.len() > 1 && span.len() <= 3 {
                let start = span[0].0;
                let end = span[span.len() - 1].0 + span[span.len() - 1].1.len();
                self.push_candidate(start, &text[start..end], 2, out);
            }
        }
    }

    fn collect_vocabulary(&self, text: &str, out: &mut Vec<(usize, String)>) {
        let Some(vocabulary) = &self.vocabulary else { return };

        for found in vocabulary.matcher.find_iter(text) {
            if !is_word_boundary(text, found.start(), found.end()) {
                continue;
            }
            let term = &vocabulary.terms[found.pattern().as_usize()];
            let surface = &text[found.start()..found.end()];
            if term.chars().count() <= 2 && !surface.starts_with(|c: char| c.is_uppercase()) {
                continue;
            }
            self.push_candidate(found.start(), surface, 1, out);
        }
    }

    fn push_candidate(&self, position: usize, raw: &str, min_chars: usize, out: &mut Vec<(usize, String)>) {
        let leading = raw.len() - raw.trim_start().len();
        if let Some(candidate) = self.clean_candidate(raw, min_chars) {
            out.push((position + leading, candidate));
        }
    }

    fn clean_candidate(&self, raw: &str, min_chars: usize) -> Option<String> {
        let trimmed = raw
            .trim_matches(|c: char| c.is_whitespace() || EDGE_PUNCTUATION.contains(&c))
            .trim_end_matches('.');
        let mut candidate = collapse_whitespace(trimmed);

        for article in ["the ", "a ", "an "] {
            if candidate.len() > article.len() && candidate.to_lowercase().starts_with(article) {
                candidate = candidate[article.len()..].to_string();
                break;
            }
        }

        let chars = candidate.chars().count();
        let words = candidate.split_whitespace().count();
        if chars < min_chars
            || chars > self.config.max_candidate_chars
            || words > self.config.max_candidate_words
            || candidate.chars().all(|c| c.is_ascii_digit() || c.is_ascii_punctuation())
            || self.is_stop_word(&candidate)
        {
            return None;
        }

        Some(candidate)
    }

    fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word.to_lowercase().as_str())
    }

    /// Find every whole-word occurrence of each candidate
    fn attach_mentions(&self, text: &str, candidates: Vec<(String, usize)>) -> Vec<SkillCandidate> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let patterns: Vec<String> = candidates.iter().map(|(c, _)| c.to_lowercase()).collect();
        let mut occurrences: Vec<Vec<usize>> = vec![Vec::new(); candidates.len()];

        match AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::Standard)
            .build(&patterns)
        {
            Ok(matcher) => {
                for found in matcher.find_overlapping_iter(text) {
                    if is_word_boundary(text, found.start(), found.end()) {
                        occurrences[found.pattern().as_usize()].push(found.start());
                    }
                }
            }
            Err(e) => log::warn!("Mention matcher unavailable, using first positions only: {}", e),
        }

        candidates
            .into_iter()
            .zip(occurrences)
            .map(|((candidate, first_position), mut positions)| {
                if positions.is_empty() {
                    positions.push(first_position);
                }
                positions.sort_unstable();
                positions.dedup();

                let mentions = positions
                    .into_iter()
                    .map(|start| {
                        let end = (start + candidate.len()).min(text.len());
                        CandidateSkillMention {
                            text: candidate.clone(),
                            context: context_window(text, start, end, self.config.context_window),
                            position: start,
                        }
                    })
                    .collect();

                SkillCandidate {
                    text: candidate,
                    mentions,
                }
            })
            .collect()
    }
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(|c| c.is_uppercase())
}

fn is_skill_char(c: char) -> bool {
    c.is_alphanumeric() || c == '+' || c == '#'
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_skill_char) && !after.is_some_and(is_skill_char)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn split_with_offsets<'t>(separator: &Regex, text: &'t str) -> Vec<(usize, &'t str)> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for found in separator.find_iter(text) {
        pieces.push((last, &text[last..found.start()]));
        last = found.end();
    }
    pieces.push((last, &text[last..]));
    pieces
}

/// Up to `radius` characters on each side of `start..end`
pub fn context_window(text: &str, start: usize, end: usize, radius: usize) -> String {
    let start = floor_char_boundary(text, start);
    let end = floor_char_boundary(text, end.max(start));

    let from = text[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map_or(start, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map_or(text.len(), |(i, _)| end + i);

    collapse_whitespace(&text[from..to])
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> SkillExtractor {
        SkillExtractor::new(&ExtractionConfig::default()).unwrap()
    }

    fn texts(candidates: &[SkillCandidate]) -> Vec<String> {
        candidates.iter().map(|c| c.text.to_lowercase()).collect()
    }

    #[test]
    fn test_trigger_phrases() {
        let found = extractor().extract("5 years of experience with kafka and stream processing. Proficient in terraform/ansible.");
        let found = texts(&found);
        assert!(found.contains(&"kafka".to_string()));
        assert!(found.contains(&"stream processing".to_string()));
        assert!(found.contains(&"terraform".to_string()));
        assert!(found.contains(&"ansible".to_string()));
    }

    #[test]
    fn test_delimited_list_with_label() {
        let found = extractor().extract("Skills: rust, go, postgresql, redis | grpc\n");
        let found = texts(&found);
        for skill in ["rust", "go", "postgresql", "redis", "grpc"] {
            assert!(found.contains(&skill.to_string()), "missing {}", skill);
        }
    }

    #[test]
    fn test_capitalized_sequences_skip_stop_words() {
        let found = extractor().extract("We deployed services on Google Cloud Platform with the Senior Team.");
        let found = texts(&found);
        assert!(found.contains(&"google cloud platform".to_string()));
        assert!(found.contains(&"google".to_string()));
        assert!(!found.contains(&"we".to_string()));
        assert!(!found.contains(&"senior team".to_string()));
    }

    #[test]
    fn test_dedup_is_case_insensitive_and_counts_mentions() {
        let text = "Built APIs in Python. Python scripts. Skills: python, SQL, Docker";
        let found = extractor().extract(text);
        let python: Vec<_> = found.iter().filter(|c| c.text.eq_ignore_ascii_case("python")).collect();
        assert_eq!(python.len(), 1);
        assert_eq!(python[0].text, "Python");
        assert_eq!(python[0].mention_count(), 3);
        assert!(python[0].mentions[0].context.contains("Built APIs"));
    }

    #[test]
    fn test_mentions_respect_word_boundaries() {
        let found = extractor().extract("Skills: C, C++, C#, Java\nJavaScript is not Java");
        let java = found.iter().find(|c| c.text == "Java").unwrap();
        assert_eq!(java.mention_count(), 2);
        let c = found.iter().find(|c| c.text == "C").map(|c| c.mention_count());
        assert_eq!(c, None, "single letters need the vocabulary");
    }

    #[test]
    fn test_vocabulary_matches_lowercase_and_short_terms() {
        let extractor = extractor().with_vocabulary(["docker", "go", "r"]).unwrap();
        let found = texts(&extractor.extract("we ship docker images and go fast; analysis in R"));
        assert!(found.contains(&"docker".to_string()));
        assert!(found.contains(&"r".to_string()));
        assert!(!found.contains(&"go".to_string()));
    }

    #[test]
    fn test_empty_text_and_pre_extracted_mentions() {
        assert!(extractor().extract("   ").is_empty());

        let input = CandidateRawInput {
            text: String::new(),
            mentions: Some(vec![
                CandidateSkillMention { text: "Rust".into(), context: "built in Rust".into(), position: 0 },
                CandidateSkillMention { text: "rust ".into(), context: "rust daily".into(), position: 40 },
                CandidateSkillMention { text: "Go".into(), context: String::new(), position: 80 },
            ]),
        };
        let candidates = extractor().prepare(&input);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].text, "Rust");
        assert_eq!(candidates[0].mention_count(), 2);
    }

    #[test]
    fn test_candidate_limits() {
        let config = ExtractionConfig {
            max_candidate_words: 2,
            ..ExtractionConfig::default()
        };
        let extractor = SkillExtractor::new(&config).unwrap();
        let found = texts(&extractor.extract("Experience with distributed stream processing engines"));
        assert!(found.is_empty());
    }

    #[test]
    fn test_context_window_respects_char_boundaries() {
        let text = "café — Rust — naïve";
        let start = text.find("Rust").unwrap();
        let context = context_window(text, start, start + 4, 3);
        assert!(context.contains("Rust"));
        assert_eq!(context_window(text, 0, 0, 100), text);
    }
}
