use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use echo_study::{
    config::Config,
    embedding::build_embedding_client,
    logging,
    metrics::MetricsSnapshot,
    processing::{
        ChunkerSettings, IngestionService,
        pdf::{document_id, has_pdf_extension},
    },
    qdrant::QdrantService,
};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "ingest",
    about = "Extract, chunk, embed, and index every PDF under a directory"
)]
struct Cli {
    /// Directory scanned recursively for `*.pdf` files.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    /// Namespace to write into; defaults to `INDEX_NAMESPACE`.
    #[arg(long)]
    namespace: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;
    logging::init_tracing("ingest");
    config.log_summary();

    let pdfs = assign_ids(&cli.data_dir, collect_pdfs(&cli.data_dir)?)?;
    if pdfs.is_empty() {
        tracing::warn!(dir = %cli.data_dir.display(), "No PDF files found");
        return Ok(());
    }

    let chunker = ChunkerSettings::new(config.chunk_size, config.chunk_overlap)
        .context("Invalid CHUNK_SIZE / CHUNK_OVERLAP")?;
    let embedder = build_embedding_client(&config)
        .await
        .context("Failed to initialize embedding model")?;
    let index = QdrantService::new(&config).context("Failed to connect to Qdrant")?;
    index
        .ensure_collection(config.embedding_dimension as u64)
        .await
        .context("Failed to ensure Qdrant collection exists")?;

    let namespace = cli
        .namespace
        .unwrap_or_else(|| config.index_namespace.clone());
    let service = IngestionService::new(embedder, Arc::new(index), chunker, namespace);
    tracing::info!(
        files = pdfs.len(),
        namespace = %service.namespace(),
        "Starting ingestion"
    );

    for (path, id) in &pdfs {
        match service.ingest_pdf(path, id).await {
            Ok(outcome) if outcome.is_complete() => {
                println!("indexed {} ({} chunks)", path.display(), outcome.chunk_count);
            }
            Ok(outcome) => {
                println!(
                    "partially indexed {} ({} chunks, {} failed batches)",
                    path.display(),
                    outcome.chunk_count,
                    outcome.failed_batches.len()
                );
                for failure in &outcome.failed_batches {
                    println!("  {failure}");
                }
            }
            Err(error) => println!("failed {}: {error}", path.display()),
        }
    }

    let snapshot = service.metrics_snapshot();
    println!("{}", summary(&snapshot));
    if !snapshot.is_clean() {
        bail!(
            "ingestion incomplete: {} failed documents, {} failed batches",
            snapshot.documents_failed,
            snapshot.batches_failed
        );
    }
    Ok(())
}

/// Every PDF below `dir`, sorted for a deterministic ingestion order.
fn collect_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("data directory {} does not exist", dir.display());
    }
    let mut pdfs: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && has_pdf_extension(&entry.file_name().to_string_lossy())
        })
        .map(|entry| entry.into_path())
        .collect();
    pdfs.sort();
    Ok(pdfs)
}

/// Pair each PDF with its document id, refusing ids shared by two files.
fn assign_ids(root: &Path, pdfs: Vec<PathBuf>) -> Result<Vec<(PathBuf, String)>> {
    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut assigned = Vec::with_capacity(pdfs.len());
    for path in pdfs {
        let id = document_id(root, &path);
        if let Some(previous) = seen.insert(id.clone(), path.clone()) {
            bail!(
                "{} and {} would both be indexed as document {id}",
                previous.display(),
                path.display()
            );
        }
        assigned.push((path, id));
    }
    Ok(assigned)
}

fn summary(snapshot: &MetricsSnapshot) -> String {
    format!(
        "documents indexed: {}, documents failed: {}, chunks indexed: {}, failed batches: {}",
        snapshot.documents_indexed,
        snapshot.documents_failed,
        snapshot.chunks_indexed,
        snapshot.batches_failed
    )
}
