use anyhow::anyhow;
use chrono::Utc;
use clap::{Parser, Subcommand};
use doc_rag_core::{
    discover_document_files, extract_relevant_lines, rank_titles, ChromaStore, DocumentPipeline,
    MarkdownNormalizer, OpenAiEmbedder, PipelineOptions, PlainTextNormalizer, TextNormalizer,
    VectorIndex, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, DEFAULT_SNIPPET_LINES,
};
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Corpus folder containing .md and .txt source documents
    #[arg(long, default_value = "data/raw")]
    data_dir: String,

    /// Chroma base URL
    #[arg(long, default_value = "http://localhost:8000")]
    chroma_url: String,

    /// Vector collection name
    #[arg(long, default_value = "documents")]
    collection: String,

    /// API key for the embedding provider
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Embedding model name
    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Embedding dimensionality of the chosen model
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize, chunk, and index the corpus into the vector database.
    Build {
        /// Keep markdown heading structure instead of full prose stripping.
        #[arg(long, default_value_t = false)]
        markdown: bool,
        /// Max chunk size in characters; defaults to the processing mode's size.
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Drop the existing collection before indexing.
        #[arg(long, default_value_t = false)]
        reset: bool,
    },
    /// Embedding-backed nearest-neighbor search over indexed chunks.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of results to return.
        #[arg(long, default_value = "5")]
        n_results: usize,
    },
    /// Keyword search over document titles, no embeddings involved.
    Find {
        /// Search query
        #[arg(long)]
        query: String,
        /// Maximum number of matching documents.
        #[arg(long, default_value = "3")]
        max_results: usize,
    },
    /// Extract query-related lines from one document.
    Extract {
        /// Document title (file stem, extension excluded)
        #[arg(long)]
        title: String,
        /// Search query
        #[arg(long)]
        query: String,
        /// Maximum number of lines to extract.
        #[arg(long, default_value_t = DEFAULT_SNIPPET_LINES)]
        max_lines: usize,
    },
    /// Show collection name, record count, and persist location.
    Info,
    /// Drop and recreate the vector collection.
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "doc-rag boot"
    );

    match &cli.command {
        Command::Build {
            markdown,
            chunk_size,
            reset,
        } => build(&cli, *markdown, *chunk_size, *reset).await,
        Command::Search { query, n_results } => search(&cli, query, *n_results).await,
        Command::Find { query, max_results } => find(&cli, query, *max_results),
        Command::Extract {
            title,
            query,
            max_lines,
        } => extract(&cli, title, query, *max_lines),
        Command::Info => show_info(&cli).await,
        Command::Reset => reset_collection(&cli).await,
    }
}

fn embedder_from(cli: &Cli) -> anyhow::Result<OpenAiEmbedder> {
    let api_key = cli
        .openai_api_key
        .clone()
        .ok_or_else(|| anyhow!("OPENAI_API_KEY is not set"))?;

    Ok(OpenAiEmbedder::new(api_key)?
        .with_model(&cli.embedding_model, cli.embedding_dimensions))
}

fn pipeline_from(
    cli: &Cli,
    markdown: bool,
    chunk_size: Option<usize>,
) -> anyhow::Result<DocumentPipeline<OpenAiEmbedder, ChromaStore>> {
    let normalizer: Box<dyn TextNormalizer + Send + Sync> = if markdown {
        Box::new(MarkdownNormalizer)
    } else {
        Box::new(PlainTextNormalizer)
    };

    let options = PipelineOptions {
        chunk_size,
        ..PipelineOptions::default()
    };

    Ok(DocumentPipeline::new(
        &cli.data_dir,
        normalizer,
        embedder_from(cli)?,
        ChromaStore::new(&cli.chroma_url, &cli.collection)?,
        options,
    ))
}

async fn build(
    cli: &Cli,
    markdown: bool,
    chunk_size: Option<usize>,
    reset: bool,
) -> anyhow::Result<()> {
    let pipeline = pipeline_from(cli, markdown, chunk_size)?;

    if reset {
        pipeline.reset_database().await?;
        info!(collection = %cli.collection, "collection reset before build");
    }

    let report = pipeline.build().await?;

    for skipped in &report.skipped_files {
        warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped file");
    }
    for batch in &report.index.skipped_batches {
        warn!(
            batch = batch.batch_index,
            chunks = batch.chunk_count,
            reason = %batch.reason,
            "skipped batch"
        );
    }

    println!("=== corpus statistics ===");
    println!("files:            {}", report.file_count);
    println!("chunks:           {}", report.chunk_count);
    println!("raw size:         {} chars", report.total_raw_chars);
    println!("normalized size:  {} chars", report.total_normalized_chars);
    println!("compression:      {:.1}%", report.compression_percent());

    for stats in &report.file_stats {
        println!(
            "  - {}: {} chunks, {} -> {} chars ({:.1}% reduced)",
            stats.file_name,
            stats.chunk_count,
            stats.raw_chars,
            stats.normalized_chars,
            stats.compression_percent()
        );
    }

    println!(
        "{} of {} chunks indexed at {}",
        report.index.added_chunks,
        report.chunk_count,
        Utc::now().to_rfc3339()
    );

    if !report.succeeded() {
        return Err(anyhow!("vector database build failed: no chunks were added"));
    }

    let info = pipeline.collection_info().await?;
    println!(
        "collection '{}' now holds {} records at {}",
        info.name, info.document_count, info.persist_location
    );

    Ok(())
}

async fn search(cli: &Cli, query: &str, n_results: usize) -> anyhow::Result<()> {
    let pipeline = pipeline_from(cli, false, None)?;
    let hits = pipeline.search(query, n_results).await?;

    if hits.is_empty() {
        println!("no results for '{query}'");
        return Ok(());
    }

    println!("=== {} results for '{}' ===", hits.len(), query);
    for (position, hit) in hits.iter().enumerate() {
        let preview: String = hit.document.chars().take(300).collect();
        let truncated = hit.document.chars().count() > 300;

        println!("--- result {} ---", position + 1);
        println!("file:       {}", hit.metadata.file_name);
        println!(
            "chunk:      {}/{}",
            hit.metadata.chunk_index + 1,
            hit.metadata.total_chunks
        );
        println!("similarity: {:.4}", hit.similarity());
        println!("{preview}{}", if truncated { "..." } else { "" });
    }

    Ok(())
}

fn find(cli: &Cli, query: &str, max_results: usize) -> anyhow::Result<()> {
    let files = discover_document_files(Path::new(&cli.data_dir));

    if files.is_empty() {
        println!("no searchable documents in {}", cli.data_dir);
        return Ok(());
    }

    let titles: Vec<(String, &Path)> = files
        .iter()
        .filter_map(|path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .map(|stem| (stem.to_string(), path.as_path()))
        })
        .collect();

    let ranked = rank_titles(query, titles.iter().map(|(title, _)| title.as_str()));

    if ranked.is_empty() {
        println!("no documents related to '{query}'");
        return Ok(());
    }

    println!("=== documents related to '{query}' ===");
    for scored in ranked.iter().take(max_results) {
        let path = titles
            .iter()
            .find(|(title, _)| *title == scored.title)
            .map(|(_, path)| *path);

        println!("- {} (relevance {:.2})", scored.title, scored.score);
        if let Some(path) = path {
            let size = fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
            println!("    {} ({} bytes)", path.display(), size);
        }
    }

    Ok(())
}

fn extract(cli: &Cli, title: &str, query: &str, max_lines: usize) -> anyhow::Result<()> {
    let files = discover_document_files(Path::new(&cli.data_dir));

    let target = files.iter().find(|path| {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| stem.eq_ignore_ascii_case(title))
    });

    let Some(path) = target else {
        let available: Vec<&str> = files
            .iter()
            .filter_map(|path| path.file_stem().and_then(|stem| stem.to_str()))
            .take(10)
            .collect();
        println!("document '{title}' not found");
        if !available.is_empty() {
            println!("available documents: {}", available.join(", "));
        }
        return Ok(());
    };

    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    let snippet = extract_relevant_lines(&content, query, max_lines);

    println!("## {title}");
    println!("query: {query}");
    println!();
    println!("{snippet}");
    println!();
    println!("source: {}", path.display());

    Ok(())
}

async fn show_info(cli: &Cli) -> anyhow::Result<()> {
    let store = ChromaStore::new(&cli.chroma_url, &cli.collection)?;
    let count = store.count().await?;

    println!("collection:       {}", store.collection_name());
    println!("records:          {count}");
    println!("persist location: {}", store.persist_location());

    Ok(())
}

async fn reset_collection(cli: &Cli) -> anyhow::Result<()> {
    let store = ChromaStore::new(&cli.chroma_url, &cli.collection)?;
    store.drop_collection().await?;
    store.ensure_ready().await?;

    info!(collection = %cli.collection, "collection reset");
    println!("collection '{}' was reset", cli.collection);

    Ok(())
}
