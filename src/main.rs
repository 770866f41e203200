//! skill-gap: semantic skill-gap analysis against job market demand

use anyhow::{bail, Context};
use clap::Parser;
use log::{error, info};
use skill_gap::cli::{self, Cli, Commands, ConfigAction, TaxonomyAction};
use skill_gap::config::{Config, EmbeddingBackend};
use skill_gap::input::InputManager;
use skill_gap::output::{save_report_to_file, ReportGenerator, SkillGapReport};
use skill_gap::processing::aggregator::PostingRawInput;
use skill_gap::processing::analyzer::{AnalysisContext, AnalysisEngine, AnalysisRequest};
use skill_gap::processing::embeddings::build_provider;
use skill_gap::taxonomy::{SkillCategory, TaxonomySpec};
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);

    // Load configuration
    let config = match Config::load_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration from {}: {}", config_path.display(), e);
            process::exit(1);
        }
    };

    // Execute command
    if let Err(e) = run_command(cli.command, config, &config_path).await {
        error!("Command failed: {:#}", e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, mut config: Config, config_path: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Analyze {
            resume,
            postings,
            prior,
            window,
            taxonomy,
            embedding,
            output,
            save,
            timeout,
            detailed,
        } => {
            info!("Starting skill-gap analysis");

            cli::validate_file_extension(&resume, &["txt", "md", "json"])
                .map_err(|e| anyhow::anyhow!("Resume file: {}", e))?;
            cli::validate_file_extension(&postings, &["json", "txt", "md"])
                .map_err(|e| anyhow::anyhow!("Postings file: {}", e))?;

            if let Some(format) = &output {
                config.output.format = cli::parse_output_format(format).map_err(anyhow::Error::msg)?;
            }
            if let Some(embedding) = embedding {
                apply_embedding_override(&mut config, embedding);
            }
            config.output.detailed |= detailed;

            // stdout carries only the rendered report
            eprintln!("🚀 Skill-gap analysis");
            eprintln!("📄 Resume: {}", resume.display());
            eprintln!("💼 Postings: {}", postings.display());
            if let Some(prior) = &prior {
                eprintln!("🕰️  Prior postings: {}", prior.display());
            }

            // Inputs
            let mut input_manager = InputManager::new();
            let candidate = input_manager
                .read_candidate(&resume)
                .await
                .with_context(|| format!("Failed to read resume {}", resume.display()))?;
            let current = input_manager
                .read_postings(&postings)
                .await
                .with_context(|| format!("Failed to read postings {}", postings.display()))?;
            let prior_batch = match &prior {
                Some(path) => Some(
                    input_manager
                        .read_postings(path)
                        .await
                        .with_context(|| format!("Failed to read prior postings {}", path.display()))?,
                ),
                None => None,
            };

            let mut input_skipped = current.skipped;
            let prior_postings: Option<Vec<PostingRawInput>> = prior_batch.map(|batch| {
                input_skipped.extend(batch.skipped.into_iter().map(|mut s| {
                    s.id = format!("{} (prior)", s.id);
                    s
                }));
                batch.postings
            });

            // Engine
            let spec = load_taxonomy_spec(taxonomy.as_deref())?;
            eprintln!("🧠 Embedding {} taxonomy skills...", spec.len());
            let engine = build_engine(config.clone(), spec).await?;
            eprintln!("✅ Engine ready ({})", engine.context().provider_name());

            let request = AnalysisRequest {
                candidate,
                postings: current.postings,
                prior_postings,
                window_label: window,
            };

            eprintln!("🔍 Analyzing...");
            let mut analysis = match timeout {
                Some(secs) => engine
                    .analyze_with_timeout(request, Duration::from_secs(secs))
                    .await
                    .context("Analysis failed")?,
                None => {
                    let engine = engine.clone();
                    tokio::task::spawn_blocking(move || engine.analyze(&request, None))
                        .await
                        .context("Analysis task failed")?
                        .context("Analysis failed")?
                }
            };

            // Postings that never decoded are reported with the ones the engine rejected
            input_skipped.append(&mut analysis.skipped_postings);
            analysis.skipped_postings = input_skipped;

            let report = SkillGapReport::from_analysis(
                analysis,
                &resume.to_string_lossy(),
                &postings.to_string_lossy(),
            );

            let generator = ReportGenerator::with_options(
                config.output.color_output && save.is_none(),
                config.output.detailed,
                config.output.max_rows,
                true,
                true,
            );
            let rendered = generator.generate_report(&report, &config.output.format)?;

            match save {
                Some(path) => {
                    save_report_to_file(&rendered, &path)
                        .with_context(|| format!("Failed to save report to {}", path.display()))?;
                    println!("💾 Report saved to {}", path.display());
                }
                None => println!("{}", rendered),
            }
        }

        Commands::Taxonomy { action } => match action {
            TaxonomyAction::Show { file, category } => {
                let spec = load_taxonomy_spec(file.as_deref())?;
                let filter = match category.as_deref() {
                    Some(label) => match SkillCategory::parse(label) {
                        Some(category) => Some(category),
                        None => bail!("Unknown category: {}", label),
                    },
                    None => None,
                };

                println!("📚 Taxonomy: {} ({} skills)\n", spec.source(), spec.len());
                for category in SkillCategory::ALL {
                    if filter.is_some_and(|f| f != category) {
                        continue;
                    }
                    let entries: Vec<_> = spec.entries().iter().filter(|e| e.category() == category).collect();
                    if entries.is_empty() {
                        continue;
                    }
                    println!("{} ({}):", category, entries.len());
                    for entry in entries {
                        if entry.aliases.is_empty() {
                            println!("  • {}", entry.name);
                        } else {
                            println!("  • {} (aka {})", entry.name, entry.aliases.join(", "));
                        }
                    }
                    println!();
                }
            }

            TaxonomyAction::Validate { file } => {
                let spec = TaxonomySpec::from_path(&file)
                    .with_context(|| format!("Invalid taxonomy {}", file.display()))?;
                let precomputed = spec.entries().iter().filter(|e| e.embedding.is_some()).count();
                let uncategorized = spec
                    .entries()
                    .iter()
                    .filter(|e| e.category() == SkillCategory::Uncategorized)
                    .count();
                println!("✅ {} is valid", file.display());
                println!("  Skills: {}", spec.len());
                println!("  Precomputed vectors: {}", precomputed);
                println!("  Uncategorized: {}", uncategorized);
            }
        },

        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                println!("⚙️  Current Configuration ({})\n", config_path.display());
                let content = toml::to_string_pretty(&config).context("Failed to render configuration")?;
                println!("{}", content);
            }

            Some(ConfigAction::Reset) => {
                println!("🔄 Resetting configuration to defaults...");
                Config::default()
                    .save_to(config_path)
                    .with_context(|| format!("Failed to write {}", config_path.display()))?;
                println!("✅ Configuration reset successfully!");
            }

            Some(ConfigAction::Path) => {
                println!("{}", config_path.display());
            }
        },
    }

    Ok(())
}

/// `hash` selects the offline hash embedder; anything else names a Model2Vec model
fn apply_embedding_override(config: &mut Config, embedding: String) {
    if embedding.eq_ignore_ascii_case("hash") {
        config.embedding.backend = EmbeddingBackend::Hash;
    } else {
        config.embedding.backend = EmbeddingBackend::Model2Vec;
        config.embedding.model = embedding;
    }
}

fn load_taxonomy_spec(path: Option<&Path>) -> anyhow::Result<TaxonomySpec> {
    match path {
        Some(path) => TaxonomySpec::from_path(path)
            .with_context(|| format!("Failed to load taxonomy {}", path.display())),
        None => Ok(TaxonomySpec::builtin()),
    }
}

/// Load the provider and embed the taxonomy off the async runtime
async fn build_engine(config: Config, spec: TaxonomySpec) -> anyhow::Result<AnalysisEngine> {
    let context = tokio::task::spawn_blocking(move || {
        let provider = build_provider(&config.embedding)?;
        AnalysisContext::initialize(config, provider, &spec)
    })
    .await
    .context("Engine initialization task failed")?
    .context("Failed to initialize analysis engine")?;

    Ok(AnalysisEngine::new(Arc::new(context)))
}
