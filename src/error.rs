//! Error handling for the skill-gap engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkillGapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Taxonomy load error: {0}")]
    TaxonomyLoad(String),

    #[error("Embedding provider error: {0}")]
    EmbeddingProvider(String),

    #[error("Malformed posting '{posting}': {reason}")]
    MalformedPosting { posting: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Analysis timed out during {stage} after {elapsed_ms}ms")]
    Timeout { stage: String, elapsed_ms: u64 },

    #[error("Output formatting error: {0}")]
    OutputFormatting(String),
}

pub type Result<T> = std::result::Result<T, SkillGapError>;

impl SkillGapError {
    /// Errors worth retrying with backoff.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SkillGapError::EmbeddingProvider(_))
    }

    /// Failures of the engine's collaborators, as opposed to bad or empty input.
    ///
    /// Callers use this to tell "the analysis could not run" apart from
    /// "the analysis ran and found nothing".
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            SkillGapError::TaxonomyLoad(_)
                | SkillGapError::EmbeddingProvider(_)
                | SkillGapError::Timeout { .. }
                | SkillGapError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let provider = SkillGapError::EmbeddingProvider("connection reset".to_string());
        assert!(provider.is_recoverable());
        assert!(provider.is_infrastructure());

        let posting = SkillGapError::MalformedPosting {
            posting: "#3".to_string(),
            reason: "empty text".to_string(),
        };
        assert!(!posting.is_recoverable());
        assert!(!posting.is_infrastructure());

        let timeout = SkillGapError::Timeout {
            stage: "validate profile".to_string(),
            elapsed_ms: 1200,
        };
        assert!(!timeout.is_recoverable());
        assert!(timeout.is_infrastructure());
        assert!(timeout.to_string().contains("validate profile"));
    }
}
