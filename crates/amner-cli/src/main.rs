//! amner CLI - Command-line interface
//!
//! Usage:
//!   amner [--config FILE] run [--input-dir DIR] [--catalog FILE] [--definitions FILE]
//!       [--output FILE] [--resume] [--missing-doi collapse|always-process]
//!       [--on-resolve-error sentinel|abort]
//!   amner [--config FILE] lookup <term> [--catalog FILE] [--definitions FILE]
//!   amner [--config FILE] patterns [--catalog FILE] [--definitions FILE]

use std::path::PathBuf;
use std::sync::Arc;

use amner_core::{AppConfig, LoggingConfig, MissingDoiPolicy, ResolveFailurePolicy};
use amner_extractor::{compile_patterns, to_lookup_key, Definitions, Vocabulary};
use amner_openalex::OpenAlexResolver;
use amner_parser::PdfDoiFinder;
use amner_pipeline::{BatchDriver, ResultWriter};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "amner")]
#[command(about = "Ontology entity extraction for additive-manufacturing papers")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract entities from every PDF in a directory
    Run {
        /// Directory holding the PDF papers
        #[arg(long)]
        input_dir: Option<PathBuf>,

        #[command(flatten)]
        tables: TableArgs,

        /// Result JSON file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Continue from an existing result file
        #[arg(long)]
        resume: bool,

        /// Handling of papers without a DOI (collapse, always-process)
        #[arg(long)]
        missing_doi: Option<MissingDoiPolicy>,

        /// Handling of DOIs OpenAlex cannot resolve (sentinel, abort)
        #[arg(long)]
        on_resolve_error: Option<ResolveFailurePolicy>,
    },
    /// Show the catalog entry and definition of a term
    Lookup {
        /// Term as it would appear in a paper
        term: String,

        #[command(flatten)]
        tables: TableArgs,
    },
    /// Print the compiled match patterns as JSON
    Patterns {
        #[command(flatten)]
        tables: TableArgs,
    },
}

#[derive(Args)]
struct TableArgs {
    /// Catalog workbook (entity, entity_type, Thing, SubClass1..9)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Definitions workbook (entities, Definition)
    #[arg(long)]
    definitions: Option<PathBuf>,
}

impl TableArgs {
    fn apply(self, config: &mut AppConfig) {
        if let Some(path) = self.catalog {
            config.extraction.catalog_path = path;
        }
        if let Some(path) = self.definitions {
            config.extraction.definitions_path = path;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // File, then environment, then flags
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };

    match cli.command {
        Commands::Run {
            input_dir,
            tables,
            output,
            resume,
            missing_doi,
            on_resolve_error,
        } => {
            tables.apply(&mut config);
            if let Some(dir) = input_dir {
                config.extraction.input_dir = dir;
            }
            if let Some(path) = output {
                config.extraction.output_path = path;
            }
            if resume {
                config.pipeline.resume = true;
            }
            if let Some(policy) = missing_doi {
                config.pipeline.missing_doi = policy;
            }
            if let Some(policy) = on_resolve_error {
                config.pipeline.on_resolve_error = policy;
            }

            init_tracing(&config.logging);
            run(config).await
        }
        Commands::Lookup { term, tables } => {
            tables.apply(&mut config);
            init_tracing(&config.logging);
            lookup(&config, &term)
        }
        Commands::Patterns { tables } => {
            tables.apply(&mut config);
            init_tracing(&config.logging);
            patterns(&config)
        }
    }
}

/// Logs go to stderr so that stdout stays machine-readable
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    config.validate()?;

    let vocabulary = Vocabulary::load(&config.extraction.catalog_path)?;
    if vocabulary.overwritten() > 0 {
        warn!(
            count = vocabulary.overwritten(),
            "catalog rows shadowed by later rows with the same key"
        );
    }

    let recognizer = compile_patterns(&vocabulary).into_recognizer();
    info!(
        rules = recognizer.rule_count(),
        special_cases = recognizer.special_case_count(),
        "recognizer ready"
    );

    let resolver = OpenAlexResolver::from_config(&config.openalex)?;
    let driver = BatchDriver::new(
        Arc::new(vocabulary),
        Arc::new(recognizer),
        Arc::new(resolver),
        ResultWriter::new(config.extraction.output_path.clone()),
    )
    .with_doi_extractor(Arc::new(PdfDoiFinder::new(
        config.extraction.doi_search_pages,
    )))
    .with_config(config.pipeline.clone());

    let summary = driver
        .run(&config.extraction.input_dir)
        .await
        .with_context(|| format!("batch over {} failed", config.extraction.input_dir.display()))?;

    println!(
        "{} papers: {} records, {} skipped, {} unresolved DOIs -> {}",
        summary.discovered,
        summary.processed,
        summary.skipped,
        summary.unresolved,
        config.extraction.output_path.display()
    );
    Ok(())
}

fn lookup(config: &AppConfig, term: &str) -> anyhow::Result<()> {
    let vocabulary = Vocabulary::load(&config.extraction.catalog_path)?;
    let entry = vocabulary
        .get(term)
        .with_context(|| format!("'{term}' (key '{}') is not in the catalog", to_lookup_key(term)))?;

    println!("term:       {}", entry.raw_term);
    println!("canonical:  {}", entry.canonical_term);
    println!("type:       {}", entry.entity_type);

    let hierarchy: Vec<_> = entry.hierarchy().collect();
    if !hierarchy.is_empty() {
        println!("hierarchy:  {}", hierarchy.join(" / "));
    }

    let definitions_path = &config.extraction.definitions_path;
    if definitions_path.is_file() {
        let definitions = Definitions::load(definitions_path)?;
        match definitions.get(term).and_then(|d| d.definition.as_deref()) {
            Some(definition) => println!("definition: {definition}"),
            None => println!("definition: (none)"),
        }
    } else {
        warn!(path = %definitions_path.display(), "definitions workbook not found");
    }

    Ok(())
}

fn patterns(config: &AppConfig) -> anyhow::Result<()> {
    let vocabulary = Vocabulary::load(&config.extraction.catalog_path)?;
    let set = compile_patterns(&vocabulary);

    println!("{}", serde_json::to_string_pretty(&set)?);
    Ok(())
}
