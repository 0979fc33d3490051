//! crm-retrieval CLI: build, inspect and query FR-materialized graphs.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use crm_retrieval::config::RetrievalConfig;
use crm_retrieval::engine::{Engine, RetrievalRequest};
use crm_retrieval::graph::FundamentalCategory;
use crm_retrieval::sources::{
    ChainedSource, EmbeddingMap, EmbeddingSource, JsonlTripleSource, StaticIndex, TripleSource,
    TypeMap, TypeSource,
};

#[derive(Parser)]
#[command(name = "crm-retrieval", version, about = "Graph-guided retrieval over CIDOC-CRM data")]
struct Cli {
    /// Directory holding the ontology JSON files.
    #[arg(long, global = true, default_value = "ontology")]
    ontology: PathBuf,

    /// Runtime tuning file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Graph snapshot to write (build) or read (everything else).
    #[arg(long, global = true, default_value = "graph.snap")]
    snapshot: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a graph from JSON Lines triple files and save a snapshot.
    Build {
        /// Triple files, one JSON object per line.
        #[arg(long = "triples", required = true)]
        triples: Vec<PathBuf>,

        /// JSON map of URI → rdf:type URIs. Uses the graph's rdf:type edges when omitted.
        #[arg(long)]
        types: Option<PathBuf>,

        /// Triples per batch.
        #[arg(long, default_value = "10000")]
        batch_size: usize,
    },

    /// Show snapshot statistics.
    Info,

    /// List the FR relations of an entity.
    Relations {
        /// Entity URI.
        uri: String,

        /// Include relations flagged as suppressed.
        #[arg(long)]
        all: bool,
    },

    /// Fuse two ranked candidate lists and select a coherent document set.
    Rank {
        /// The question (drives category inference).
        #[arg(long)]
        question: String,

        /// Dense ranked list: JSON array of {"id", "score"}.
        #[arg(long)]
        dense: PathBuf,

        /// Sparse ranked list: JSON array of {"id", "score"}.
        #[arg(long)]
        sparse: PathBuf,

        /// JSON map of document id → embedding.
        #[arg(long)]
        embeddings: Option<PathBuf>,

        /// Documents to select.
        #[arg(short, long, default_value = "10")]
        k: usize,

        /// Target categories (overrides inference), e.g. --category Actor.
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Write a retrieval.toml with every default spelled out.
    InitConfig {
        /// Output path.
        #[arg(default_value = "retrieval.toml")]
        path: PathBuf,
    },
}

fn open_engine(cli: &Cli) -> Result<Engine> {
    Ok(Engine::open(&cli.ontology, cli.config.as_deref())?)
}

fn open_snapshot(cli: &Cli) -> Result<Engine> {
    let engine = open_engine(cli)?;
    engine.load(&cli.snapshot)?;
    Ok(engine)
}

fn triple_source(files: &[PathBuf], batch_size: usize) -> Result<ChainedSource> {
    let mut sources: Vec<Box<dyn TripleSource>> = Vec::with_capacity(files.len());
    for file in files {
        sources.push(Box::new(JsonlTripleSource::open(file, batch_size)?));
    }
    Ok(ChainedSource::new(sources))
}

fn load_types(path: Option<&Path>) -> Result<Option<TypeMap>> {
    Ok(path.map(TypeMap::load).transpose()?)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Build {
            triples,
            types,
            batch_size,
        } => {
            let engine = open_engine(&cli)?;
            let mut source = triple_source(triples, *batch_size)?;
            let types = load_types(types.as_deref())?;
            let report = engine.build(&mut source, types.as_ref().map(|t| t as &dyn TypeSource))?;
            engine.save(&cli.snapshot)?;

            println!("Built graph into {}", cli.snapshot.display());
            for rel in &report.relationships {
                println!(
                    "  {:<40} sources {:>7}  matched {:>7}  edges {:>8}",
                    rel.fr_id, rel.sources_considered, rel.sources_matched, rel.edges_added
                );
            }
            println!(
                "PageRank: {} iterations{}",
                report.pagerank_iterations,
                if report.pagerank_converged { "" } else { " (not converged)" }
            );
            println!("{}", engine.info());
        }

        Commands::Info => {
            let engine = open_snapshot(&cli)?;
            println!("{}", engine.info());
        }

        Commands::Relations { uri, all } => {
            let engine = open_snapshot(&cli)?;
            let relations = engine.relations(uri)?;
            if relations.is_empty() {
                println!("No relations for {uri}.");
            }
            for rel in relations.iter().filter(|r| *all || !r.suppressed) {
                let marker = if rel.suppressed { " [suppressed]" } else { "" };
                println!("{} ({}){marker}:", rel.label, rel.total_count);
                for target in &rel.targets {
                    println!("  - {} <{}>", target.label, target.uri);
                }
            }
        }

        Commands::Rank {
            question,
            dense,
            sparse,
            embeddings,
            k,
            categories,
            json,
        } => {
            let engine = open_snapshot(&cli)?;
            let dense = StaticIndex::load("dense", dense)?;
            let sparse = StaticIndex::load("sparse", sparse)?;
            let embeddings = embeddings
                .as_deref()
                .map(EmbeddingMap::load)
                .transpose()?;

            let mut request = RetrievalRequest::new(question.clone(), *k);
            if !categories.is_empty() {
                let parsed = categories
                    .iter()
                    .map(|c| c.parse::<FundamentalCategory>())
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                request = request.with_categories(parsed);
            }

            let embeddings = embeddings.as_ref().map(|e| e as &dyn EmbeddingSource);
            let result = engine.retrieve(&request, &dense, &sparse, embeddings)?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
            } else {
                let targets: Vec<String> = result.categories.iter().map(|c| c.to_string()).collect();
                println!(
                    "Selected {} of {} candidates (targets: {}):",
                    result.documents.len(),
                    result.pool,
                    if targets.is_empty() { "none".to_string() } else { targets.join(", ") }
                );
                for (i, (doc, score)) in result.documents.iter().zip(&result.outcome.scores).enumerate() {
                    let category = doc.category.map(|c| c.to_string()).unwrap_or_else(|| "-".into());
                    println!(
                        "  {}. {} <{}> [{category}] score {:.4}",
                        i + 1,
                        doc.label,
                        doc.id,
                        score
                    );
                }
                if result.outcome.exhausted {
                    println!("(fewer candidates than requested)");
                }
            }
        }

        Commands::InitConfig { path } => {
            RetrievalConfig::default().save(path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}
