//! Canonical skill taxonomy
//!
//! The taxonomy is the fixed reference set every extracted skill is resolved
//! against. It is loaded once, embedded once, and then shared read-only
//! (behind `Arc`) by every analysis that runs in the process.

pub mod builtin;
pub mod loader;

use crate::error::{Result, SkillGapError};
use crate::processing::deadline::Deadline;
use crate::processing::embeddings::{cosine, l2_normalize, BatchEmbedder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use loader::{TaxonomyEntry, TaxonomySpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    Language,
    Framework,
    Database,
    Tool,
    Platform,
    SoftSkill,
    Domain,
    Uncategorized,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 8] = [
        SkillCategory::Language,
        SkillCategory::Framework,
        SkillCategory::Database,
        SkillCategory::Tool,
        SkillCategory::Platform,
        SkillCategory::SoftSkill,
        SkillCategory::Domain,
        SkillCategory::Uncategorized,
    ];

    /// Key used in configuration tables
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::Language => "language",
            SkillCategory::Framework => "framework",
            SkillCategory::Database => "database",
            SkillCategory::Tool => "tool",
            SkillCategory::Platform => "platform",
            SkillCategory::SoftSkill => "soft_skill",
            SkillCategory::Domain => "domain",
            SkillCategory::Uncategorized => "uncategorized",
        }
    }

    /// Parse a category label from a taxonomy file, accepting common spellings
    pub fn parse(label: &str) -> Option<Self> {
        let key: String = label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();

        match key.as_str() {
            "language" | "languages" | "programming" | "programming_language" => Some(SkillCategory::Language),
            "framework" | "frameworks" | "library" | "libraries" | "web_frameworks" => Some(SkillCategory::Framework),
            "database" | "databases" | "datastore" => Some(SkillCategory::Database),
            "tool" | "tools" | "tooling" => Some(SkillCategory::Tool),
            "platform" | "platforms" | "cloud" | "cloud_devops" => Some(SkillCategory::Platform),
            "soft_skill" | "soft_skills" | "softskill" | "softskills" => Some(SkillCategory::SoftSkill),
            "domain" | "domains" | "specialized" => Some(SkillCategory::Domain),
            "uncategorized" | "other" => Some(SkillCategory::Uncategorized),
            _ => None,
        }
    }
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkillCategory::Language => "Language",
            SkillCategory::Framework => "Framework",
            SkillCategory::Database => "Database",
            SkillCategory::Tool => "Tool",
            SkillCategory::Platform => "Platform",
            SkillCategory::SoftSkill => "Soft Skill",
            SkillCategory::Domain => "Domain",
            SkillCategory::Uncategorized => "Uncategorized",
        };
        write!(f, "{}", label)
    }
}

/// Lowercase and collapse whitespace; the canonical key of a skill
pub fn normalize_skill_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A canonical, taxonomy-registered skill.
///
/// Vectors are L2-normalized; they are not serialized into reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillTerm {
    pub name: String,
    pub display_name: String,
    pub category: SkillCategory,
    pub aliases: Vec<String>,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    #[serde(skip)]
    pub alias_embeddings: Vec<Vec<f32>>,
}

impl SkillTerm {
    pub fn new(display_name: &str, category: SkillCategory, embedding: Vec<f32>) -> Self {
        Self {
            name: normalize_skill_name(display_name),
            display_name: display_name.trim().to_string(),
            category,
            aliases: Vec::new(),
            embedding,
            alias_embeddings: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: &str, embedding: Vec<f32>) -> Self {
        self.aliases.push(normalize_skill_name(alias));
        self.alias_embeddings.push(embedding);
        self
    }

    /// Best cosine similarity between `vector` and the name or any alias
    pub fn similarity(&self, vector: &[f32]) -> f32 {
        self.alias_embeddings
            .iter()
            .map(|alias| cosine(alias, vector))
            .fold(cosine(&self.embedding, vector), f32::max)
    }
}

/// The loaded, embedded taxonomy. Read-only after construction.
#[derive(Debug)]
pub struct Taxonomy {
    terms: Vec<Arc<SkillTerm>>,
    index: HashMap<String, usize>,
    dimension: usize,
}

impl Taxonomy {
    /// Build from terms that already carry vectors.
    ///
    /// Terms are sorted by canonical name; vectors are normalized and must
    /// all share one dimension.
    pub fn from_terms(terms: Vec<SkillTerm>) -> Result<Self> {
        if terms.is_empty() {
            return Err(SkillGapError::TaxonomyLoad("taxonomy contains no skills".to_string()));
        }

        let dimension = terms[0].embedding.len();
        if dimension == 0 {
            return Err(SkillGapError::TaxonomyLoad(format!(
                "skill '{}' has an empty embedding",
                terms[0].display_name
            )));
        }

        let mut prepared = Vec::with_capacity(terms.len());
        for mut term in terms {
            if term.name.is_empty() {
                return Err(SkillGapError::TaxonomyLoad("skill with empty name".to_string()));
            }
            if term.aliases.len() != term.alias_embeddings.len() {
                return Err(SkillGapError::TaxonomyLoad(format!(
                    "skill '{}' has {} aliases but {} alias vectors",
                    term.name,
                    term.aliases.len(),
                    term.alias_embeddings.len()
                )));
            }
            for vector in std::iter::once(&mut term.embedding).chain(term.alias_embeddings.iter_mut()) {
                if vector.len() != dimension {
                    return Err(SkillGapError::TaxonomyLoad(format!(
                        "skill '{}' has dimension {}, expected {}",
                        term.name,
                        vector.len(),
                        dimension
                    )));
                }
                if !l2_normalize(vector) {
                    return Err(SkillGapError::TaxonomyLoad(format!(
                        "skill '{}' has a zero or non-finite embedding",
                        term.name
                    )));
                }
            }
            prepared.push(term);
        }

        prepared.sort_by(|a, b| a.name.cmp(&b.name));

        let mut index = HashMap::with_capacity(prepared.len());
        for (i, term) in prepared.iter().enumerate() {
            if index.insert(term.name.clone(), i).is_some() {
                return Err(SkillGapError::TaxonomyLoad(format!(
                    "duplicate skill name '{}'",
                    term.name
                )));
            }
        }

        Ok(Self {
            terms: prepared.into_iter().map(Arc::new).collect(),
            index,
            dimension,
        })
    }

    /// Embed a parsed taxonomy file in one batch and build the taxonomy.
    ///
    /// Entries with precomputed vectors keep them; names without one and all
    /// aliases are embedded. Any failure is a `TaxonomyLoad` error.
    pub fn build(spec: &TaxonomySpec, embedder: &BatchEmbedder<'_>, deadline: &Deadline) -> Result<Self> {
        let entries = spec.entries();
        let expected_dim = entries.iter().find_map(|e| e.embedding.as_ref().map(|v| v.len()));

        let mut texts = Vec::new();
        for entry in entries {
            if entry.embedding.is_none() {
                texts.push(entry.name.clone());
            }
            texts.extend(entry.aliases.iter().cloned());
        }

        let mut vectors = embedder
            .embed(&texts, expected_dim, deadline)
            .map_err(|e| SkillGapError::TaxonomyLoad(format!("failed to embed taxonomy: {}", e)))?
            .into_iter();

        let mut terms = Vec::with_capacity(entries.len());
        for entry in entries {
            let category = entry.category();
            let embedding = match &entry.embedding {
                Some(precomputed) => precomputed.clone(),
                None => vectors.next().ok_or_else(|| {
                    SkillGapError::TaxonomyLoad("embedding batch ended early".to_string())
                })?,
            };

            let mut term = SkillTerm::new(&entry.name, category, embedding);
            for alias in &entry.aliases {
                let vector = vectors.next().ok_or_else(|| {
                    SkillGapError::TaxonomyLoad("embedding batch ended early".to_string())
                })?;
                term = term.with_alias(alias, vector);
            }
            terms.push(term);
        }

        let taxonomy = Self::from_terms(terms)?;
        log::info!(
            "Taxonomy ready: {} skills, dimension {}",
            taxonomy.len(),
            taxonomy.dimension()
        );
        Ok(taxonomy)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Terms in canonical-name order
    pub fn terms(&self) -> &[Arc<SkillTerm>] {
        &self.terms
    }

    pub fn get(&self, name: &str) -> Option<&Arc<SkillTerm>> {
        self.index
            .get(&normalize_skill_name(name))
            .map(|&i| &self.terms[i])
    }

    /// Nearest term to a unit vector.
    ///
    /// Ties resolve to the smaller canonical name, so results are
    /// deterministic for deterministic embeddings.
    pub fn best_match(&self, vector: &[f32]) -> Option<(&Arc<SkillTerm>, f32)> {
        let mut best: Option<(&Arc<SkillTerm>, f32)> = None;
        for term in &self.terms {
            let score = term.similarity(vector);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((term, score)),
            }
        }
        best
    }

    pub fn count_by_category(&self) -> Vec<(SkillCategory, usize)> {
        SkillCategory::ALL
            .iter()
            .map(|&category| {
                let count = self.terms.iter().filter(|t| t.category == category).count();
                (category, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}
