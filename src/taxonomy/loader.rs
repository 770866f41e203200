//! Taxonomy file parsing
//!
//! Accepts JSON (a bare array or `{"skills": [...]}`) and TOML
//! (`[[skills]]` tables). Parsing only checks structure; embedding happens
//! in [`Taxonomy::build`](super::Taxonomy::build).

use super::{normalize_skill_name, SkillCategory};
use crate::error::{Result, SkillGapError};
use crate::input::file_detector::FileType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl TaxonomyEntry {
    pub fn new(name: &str, category: SkillCategory, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            category: Some(category.as_str().to_string()),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            embedding: None,
        }
    }

    pub fn category(&self) -> SkillCategory {
        match &self.category {
            None => SkillCategory::Uncategorized,
            Some(label) => SkillCategory::parse(label).unwrap_or_else(|| {
                log::warn!(
                    "Unknown category '{}' for skill '{}', treating as uncategorized",
                    label,
                    self.name
                );
                SkillCategory::Uncategorized
            }),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTaxonomy {
    Wrapped { skills: Vec<TaxonomyEntry> },
    Bare(Vec<TaxonomyEntry>),
}

impl RawTaxonomy {
    fn into_entries(self) -> Vec<TaxonomyEntry> {
        match self {
            RawTaxonomy::Wrapped { skills } => skills,
            RawTaxonomy::Bare(skills) => skills,
        }
    }
}

/// A parsed, structurally valid taxonomy that has not been embedded yet
#[derive(Debug, Clone)]
pub struct TaxonomySpec {
    entries: Vec<TaxonomyEntry>,
    source: String,
}

impl TaxonomySpec {
    /// Validate entries: names must be non-empty and unique after
    /// normalization. Aliases that repeat a name or another skill's alias
    /// are dropped with a warning.
    pub fn from_entries(entries: Vec<TaxonomyEntry>, source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        if entries.is_empty() {
            return Err(SkillGapError::TaxonomyLoad(format!("{}: no skills defined", source)));
        }

        let mut names = HashSet::with_capacity(entries.len());
        for entry in &entries {
            let name = normalize_skill_name(&entry.name);
            if name.is_empty() {
                return Err(SkillGapError::TaxonomyLoad(format!("{}: skill with empty name", source)));
            }
            if !names.insert(name.clone()) {
                return Err(SkillGapError::TaxonomyLoad(format!(
                    "{}: duplicate skill '{}'",
                    source, name
                )));
            }
            if let Some(vector) = &entry.embedding {
                if vector.is_empty() || vector.iter().any(|v| !v.is_finite()) {
                    return Err(SkillGapError::TaxonomyLoad(format!(
                        "{}: skill '{}' has an invalid embedding",
                        source, name
                    )));
                }
            }
        }

        let mut alias_owner: HashMap<String, String> = HashMap::new();
        let mut cleaned = Vec::with_capacity(entries.len());
        for mut entry in entries {
            let owner = normalize_skill_name(&entry.name);
            let mut kept = Vec::with_capacity(entry.aliases.len());
            for alias in entry.aliases.drain(..) {
                let key = normalize_skill_name(&alias);
                if key.is_empty() || key == owner {
                    continue;
                }
                if names.contains(&key) {
                    log::warn!("{}: alias '{}' of '{}' names another skill, dropped", source, key, owner);
                    continue;
                }
                match alias_owner.get(&key) {
                    Some(existing) if existing == &owner => continue,
                    Some(existing) => {
                        log::warn!(
                            "{}: alias '{}' claimed by both '{}' and '{}', kept for '{}'",
                            source,
                            key,
                            existing,
                            owner,
                            existing
                        );
                        continue;
                    }
                    None => {
                        alias_owner.insert(key.clone(), owner.clone());
                        kept.push(key);
                    }
                }
            }
            entry.aliases = kept;
            cleaned.push(entry);
        }

        let dims: HashSet<usize> = cleaned
            .iter()
            .filter_map(|e| e.embedding.as_ref().map(|v| v.len()))
            .collect();
        if dims.len() > 1 {
            return Err(SkillGapError::TaxonomyLoad(format!(
                "{}: precomputed embeddings have inconsistent dimensions",
                source
            )));
        }

        Ok(Self { entries: cleaned, source })
    }

    pub fn from_json(content: &str, source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let raw: RawTaxonomy = serde_json::from_str(content)
            .map_err(|e| SkillGapError::TaxonomyLoad(format!("{}: invalid JSON taxonomy: {}", source, e)))?;
        Self::from_entries(raw.into_entries(), source)
    }

    pub fn from_toml(content: &str, source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let raw: RawTaxonomy = toml::from_str(content)
            .map_err(|e| SkillGapError::TaxonomyLoad(format!("{}: invalid TOML taxonomy: {}", source, e)))?;
        Self::from_entries(raw.into_entries(), source)
    }

    /// Load a taxonomy file, choosing the parser by extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SkillGapError::TaxonomyLoad(format!("cannot read {}: {}", source, e)))?;

        match FileType::from_path(path) {
            FileType::Toml => Self::from_toml(&content, source),
            FileType::Json => Self::from_json(&content, source),
            other => Err(SkillGapError::TaxonomyLoad(format!(
                "{}: unsupported taxonomy format ({})",
                source, other
            ))),
        }
    }

    /// The compiled-in default taxonomy
    pub fn builtin() -> Self {
        Self {
            entries: super::builtin::entries(),
            source: "built-in".to_string(),
        }
    }

    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
