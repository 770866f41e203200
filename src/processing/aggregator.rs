//! Market corpus aggregation over validated postings

use crate::error::{Result, SkillGapError};
use crate::processing::validator::CandidateProfile;
use crate::taxonomy::SkillTerm;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One job posting as handed to the engine.
///
/// Fields other than `id` and `text` (location, source, ...) are kept in
/// `metadata` and passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingRawInput {
    #[serde(default, deserialize_with = "posting_id")]
    pub id: Option<String>,
    #[serde(default, alias = "description")]
    pub text: String,
    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl PostingRawInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Stable identifier, falling back to the 1-based position
    pub fn display_id(&self, index: usize) -> String {
        match &self.id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => format!("posting-{}", index + 1),
        }
    }

    /// Reject postings that cannot contribute to a corpus
    pub fn check(&self, index: usize) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(SkillGapError::MalformedPosting {
                posting: self.display_id(index),
                reason: "posting has no text".to_string(),
            });
        }
        Ok(())
    }
}

/// Job boards hand out both `"id": "abc"` and `"id": 42`; keep either as text
fn posting_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|id| match id {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    }))
}

/// A posting left out of the corpus, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPosting {
    pub id: String,
    pub reason: String,
}

impl SkippedPosting {
    pub fn from_error(id: String, error: &SkillGapError) -> Self {
        let reason = match error {
            SkillGapError::MalformedPosting { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        Self { id, reason }
    }
}

/// A posting whose requirement text has been validated
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPosting {
    pub id: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub skills: CandidateProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub term: Arc<SkillTerm>,
    /// Postings requiring the skill, counted once per posting
    pub frequency: usize,
    /// Frequency in the prior window; `None` when there is no prior window
    pub prior_frequency: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusWindow {
    pub label: String,
    pub built_at: DateTime<Utc>,
    pub prior_total_postings: Option<usize>,
}

impl CorpusWindow {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            built_at: Utc::now(),
            prior_total_postings: None,
        }
    }

    pub fn has_prior(&self) -> bool {
        self.prior_total_postings.is_some()
    }
}

/// Skill demand across a set of postings. Built whole, never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketCorpus {
    entries: BTreeMap<String, CorpusEntry>,
    total_postings: usize,
    window: CorpusWindow,
}

impl MarketCorpus {
    /// Count each distinct skill once per posting.
    ///
    /// `total_postings` may exceed `postings.len()` when the caller knows of
    /// postings that required none of the taxonomy's skills.
    pub fn aggregate(
        postings: &[ValidatedPosting],
        total_postings: usize,
        prior: Option<&MarketCorpus>,
        label: impl Into<String>,
    ) -> Result<Self> {
        if total_postings < postings.len() {
            return Err(SkillGapError::InvalidInput(format!(
                "total_postings ({}) is smaller than the number of postings ({})",
                total_postings,
                postings.len()
            )));
        }

        let mut counts: BTreeMap<String, (Arc<SkillTerm>, usize)> = BTreeMap::new();
        for posting in postings {
            // profiles are unique by term, so each posting counts a skill once
            for skill in posting.skills.iter() {
                counts
                    .entry(skill.term.name.clone())
                    .or_insert_with(|| (Arc::clone(&skill.term), 0))
                    .1 += 1;
            }
        }

        let entries: BTreeMap<String, CorpusEntry> = counts
            .into_iter()
            .map(|(name, (term, frequency))| {
                let prior_frequency = prior.map(|p| p.frequency(&name));
                (
                    name,
                    CorpusEntry {
                        term,
                        frequency,
                        prior_frequency,
                    },
                )
            })
            .collect();

        let mut window = CorpusWindow::new(label);
        window.prior_total_postings = prior.map(|p| p.total_postings);

        log::info!(
            "Aggregated {} postings into {} distinct skills{}",
            total_postings,
            entries.len(),
            if prior.is_some() { " (with prior window)" } else { "" }
        );

        Ok(Self {
            entries,
            total_postings,
            window,
        })
    }

    /// Assemble a corpus from precomputed counts
    pub fn from_entries(entries: Vec<CorpusEntry>, total_postings: usize, window: CorpusWindow) -> Result<Self> {
        let mut map = BTreeMap::new();
        for entry in entries {
            if entry.frequency > total_postings {
                return Err(SkillGapError::InvalidInput(format!(
                    "skill '{}' appears in {} postings but the corpus has {}",
                    entry.term.name, entry.frequency, total_postings
                )));
            }
            if map.insert(entry.term.name.clone(), entry).is_some() {
                return Err(SkillGapError::InvalidInput("duplicate corpus entry".to_string()));
            }
        }

        Ok(Self {
            entries: map,
            total_postings,
            window,
        })
    }

    pub fn empty(label: impl Into<String>) -> Self {
        Self {
            entries: BTreeMap::new(),
            total_postings: 0,
            window: CorpusWindow::new(label),
        }
    }

    pub fn total_postings(&self) -> usize {
        self.total_postings
    }

    pub fn window(&self) -> &CorpusWindow {
        &self.window
    }

    pub fn frequency(&self, name: &str) -> usize {
        self.entries.get(name).map_or(0, |e| e.frequency)
    }

    pub fn get(&self, name: &str) -> Option<&CorpusEntry> {
        self.entries.get(name)
    }

    /// Entries in canonical-name order
    pub fn entries(&self) -> impl Iterator<Item = &CorpusEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
