//! Input manager for candidate and posting files

use crate::error::{Result, SkillGapError};
use crate::input::file_detector::FileType;
use crate::processing::aggregator::{PostingRawInput, SkippedPosting};
use crate::processing::extractor::CandidateRawInput;
use log::info;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

/// Postings decoded from one file, plus the entries that could not be
#[derive(Debug, Clone, Default)]
pub struct PostingBatch {
    pub postings: Vec<PostingRawInput>,
    pub skipped: Vec<SkippedPosting>,
}

/// Reads input files, caching contents by path so a file named twice on
/// the command line is read once
pub struct InputManager {
    cache: HashMap<String, String>,
}

impl InputManager {
    pub fn new() -> Self {
        Self { cache: HashMap::new() }
    }

    /// Read a resume: plain text, markdown, or a JSON `CandidateRawInput`
    pub async fn read_candidate(&mut self, path: &Path) -> Result<CandidateRawInput> {
        let file_type = FileType::from_path(path);
        let content = self.read_file(path).await?;

        match file_type {
            FileType::Text | FileType::Unknown => Ok(CandidateRawInput::from_text(content)),
            FileType::Markdown => Ok(CandidateRawInput::from_text(strip_markdown(&content))),
            FileType::Json => serde_json::from_str(&content).map_err(|e| {
                SkillGapError::InvalidInput(format!("Invalid candidate JSON in {}: {}", path.display(), e))
            }),
            FileType::Toml => Err(SkillGapError::InvalidInput(format!(
                "Unsupported candidate file: {}",
                path.display()
            ))),
        }
    }

    /// Read postings.
    ///
    /// JSON files hold an array (or `{"postings": [...]}`) and each element is
    /// decoded on its own, so one bad entry does not sink the file. Text and
    /// markdown files hold postings separated by `---` lines.
    pub async fn read_postings(&mut self, path: &Path) -> Result<PostingBatch> {
        let content = self.read_file(path).await?;

        match FileType::from_path(path) {
            FileType::Json => decode_postings(&content, &path.display().to_string()),
            FileType::Text | FileType::Markdown => Ok(PostingBatch {
                postings: split_text_postings(&content),
                skipped: Vec::new(),
            }),
            other => Err(SkillGapError::InvalidInput(format!(
                "Unsupported posting file type ({}): {}",
                other,
                path.display()
            ))),
        }
    }

    async fn read_file(&mut self, path: &Path) -> Result<String> {
        let path_str = path.to_string_lossy().to_string();

        if let Some(cached_text) = self.cache.get(&path_str) {
            info!("Using cached text for: {}", path.display());
            return Ok(cached_text.clone());
        }

        if !path.exists() {
            return Err(SkillGapError::InvalidInput(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        info!("Reading {}", path.display());
        let text = fs::read_to_string(path).await?;

        self.cache.insert(path_str, text.clone());
        Ok(text)
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a posting collection element by element
pub fn decode_postings(content: &str, source: &str) -> Result<PostingBatch> {
    let root: Value = serde_json::from_str(content)
        .map_err(|e| SkillGapError::InvalidInput(format!("Invalid postings JSON in {}: {}", source, e)))?;

    let elements = match root {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("postings") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(SkillGapError::InvalidInput(format!(
                    "{}: expected an array or an object with a \"postings\" array",
                    source
                )))
            }
        },
        _ => {
            return Err(SkillGapError::InvalidInput(format!(
                "{}: expected an array of postings",
                source
            )))
        }
    };

    let mut batch = PostingBatch::default();
    for (index, element) in elements.into_iter().enumerate() {
        let id = match element.get("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
            Some(Value::Number(id)) => id.to_string(),
            _ => format!("posting-{}", index + 1),
        };

        let decoded = match element {
            Value::String(text) => Ok(PostingRawInput::new(text)),
            other => serde_json::from_value::<PostingRawInput>(other),
        };

        match decoded {
            Ok(posting) => batch.postings.push(posting),
            Err(e) => {
                let error = SkillGapError::MalformedPosting {
                    posting: id.clone(),
                    reason: e.to_string(),
                };
                log::warn!("Skipping posting: {}", error);
                batch.skipped.push(SkippedPosting::from_error(id, &error));
            }
        }
    }

    info!(
        "Decoded {} postings from {} ({} skipped)",
        batch.postings.len(),
        source,
        batch.skipped.len()
    );
    Ok(batch)
}

fn split_text_postings(content: &str) -> Vec<PostingRawInput> {
    let mut postings = Vec::new();
    let mut current = String::new();

    for line in content.lines() {
        if line.trim() == "---" {
            if !current.trim().is_empty() {
                postings.push(PostingRawInput::new(current.trim()));
            }
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.trim().is_empty() {
        postings.push(PostingRawInput::new(current.trim()));
    }

    postings
}

fn strip_markdown(content: &str) -> String {
    let link = Regex::new(r"\[([^\]]*)\]\([^)]*\)");
    let lines = content.lines().map(|line| {
        let line = line.trim_start_matches(|c: char| c == '#' || c == '>' || c.is_whitespace());
        let line = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")).unwrap_or(line);
        let line = line.replace("**", "").replace('`', "");
        match &link {
            Ok(re) => re.replace_all(&line, "$1").into_owned(),
            Err(_) => line,
        }
    });

    lines
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
