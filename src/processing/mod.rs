//! Skill-gap pipeline stages

pub mod aggregator;
pub mod analyzer;
pub mod deadline;
pub mod embeddings;
pub mod extractor;
pub mod gap_scorer;
pub mod roadmap;
pub mod validator;
