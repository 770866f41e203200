//! CLI interface for the skill-gap engine

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "skill-gap")]
#[command(about = "Semantic skill-gap analysis against job market demand")]
#[command(long_about = "Validate the skills in a resume against a skill taxonomy, measure demand across job postings, and rank the gaps into a learning roadmap")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a resume against a set of job postings
    Analyze {
        /// Path to resume file (TXT, MD, or JSON with pre-extracted mentions)
        #[arg(short, long)]
        resume: PathBuf,

        /// Path to postings file (JSON array, or TXT/MD separated by `---`)
        #[arg(short, long)]
        postings: PathBuf,

        /// Postings from an earlier period, used for demand velocity
        #[arg(long)]
        prior: Option<PathBuf>,

        /// Label for the current market window
        #[arg(long)]
        window: Option<String>,

        /// Taxonomy file (JSON or TOML); the built-in taxonomy is used otherwise
        #[arg(short, long)]
        taxonomy: Option<PathBuf>,

        /// Embedding backend: "hash" or a Model2Vec model path / repo id
        #[arg(short, long)]
        embedding: Option<String>,

        /// Output format: console, json, markdown
        #[arg(short, long)]
        output: Option<String>,

        /// Save output to file
        #[arg(short, long)]
        save: Option<PathBuf>,

        /// Abort the analysis after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Output detailed analysis
        #[arg(short, long)]
        detailed: bool,
    },

    /// Inspect a skill taxonomy
    Taxonomy {
        #[command(subcommand)]
        action: TaxonomyAction,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum TaxonomyAction {
    /// List skills per category
    Show {
        /// Taxonomy file; the built-in taxonomy is shown otherwise
        file: Option<PathBuf>,

        /// Only show this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Check a taxonomy file for duplicates, bad vectors and unknown categories
    Validate {
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,

    /// Print the configuration file location
    Path,
}

/// Parse and validate output format
pub fn parse_output_format(format: &str) -> Result<crate::config::OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "console" => Ok(crate::config::OutputFormat::Console),
        "json" => Ok(crate::config::OutputFormat::Json),
        "markdown" | "md" => Ok(crate::config::OutputFormat::Markdown),
        _ => Err(format!(
            "Invalid output format: {}. Supported: console, json, markdown",
            format
        )),
    }
}

/// Validate file extension
pub fn validate_file_extension(path: &Path, allowed_extensions: &[&str]) -> Result<(), String> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            if allowed_extensions.contains(&ext.to_lowercase().as_str()) {
                Ok(())
            } else {
                Err(format!(
                    "Unsupported file extension: .{}. Allowed: {}",
                    ext,
                    allowed_extensions.join(", ")
                ))
            }
        }
        None => Err("File has no extension".to_string()),
    }
}
