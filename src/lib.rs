//! Skill-gap engine: semantic skill validation, market gap scoring and
//! learning roadmaps

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod processing;
pub mod taxonomy;

pub use config::Config;
pub use error::{Result, SkillGapError};
pub use processing::analyzer::{AnalysisContext, AnalysisEngine, AnalysisReport, AnalysisRequest};
pub use processing::embeddings::{build_provider, EmbeddingProvider, HashEmbeddingProvider};
pub use taxonomy::{SkillCategory, SkillTerm, Taxonomy, TaxonomySpec};
