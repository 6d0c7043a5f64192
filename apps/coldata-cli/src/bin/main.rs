use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use coldata_core::config::Config;
use coldata_core::types::ResultSet;
use coldata_search::Retriever;
use coldata_vector::LanceDocumentStore;

#[derive(Parser, Debug)]
#[command(name = "coldata", about = "Semantic search over crawled dataset records")]
struct Cli {
    /// Configuration file; defaults to config.toml plus the RUST_ENV profile
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load JSON-lines records (a file or a directory of *.jsonl) into the document store
    Import { path: PathBuf },
    /// Rebuild the vector index from the document store
    BuildIndex,
    /// Search the index; one result list per query
    Query {
        #[arg(required = true)]
        queries: Vec<String>,
        /// Override the configured number of nearest chunks per query
        #[arg(long)]
        limit: Option<usize>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop the vector collection
    ResetIndex,
    /// Record and chunk counts
    Status,
}

fn print_results(query: &str, set: &ResultSet) {
    println!("\n🔎 {query}");
    if set.is_empty() {
        println!("   (no results)");
    }
    for (rank, hit) in set.iter().enumerate() {
        let title = hit.record.title.as_deref().unwrap_or("(untitled)");
        println!("{:>3}. [{:.4}] {} | {}", rank + 1, hit.score, hit.record.website, title);
        println!("     {}", hit.record.url);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path),
        None => Config::load()?,
    };
    let mut settings = config.settings()?;
    let store = LanceDocumentStore::from_config(&settings.store).await?;

    match cli.command {
        Command::Import { path } => {
            let report = coldata_cli::import_path(&store, &path).await?;
            println!("✅ Imported {} records from {} files ({} already present)", report.inserted, report.files, report.skipped);
        }
        Command::BuildIndex => {
            let retriever = Retriever::from_settings(settings).await?;
            let report = retriever.build_index(&store).await?;
            println!(
                "✅ Indexed {} chunks from {} records in {} batches ({} without text)",
                report.chunks, report.records, report.batches, report.empty_records
            );
        }
        Command::Query { queries, limit, json } => {
            if let Some(limit) = limit {
                settings.vector.limit = limit;
            }
            let retriever = Retriever::from_settings(settings).await?;
            let results = retriever.query(&store, &queries).await?;
            let mut out = Vec::with_capacity(results.len());
            for (query, result) in queries.iter().zip(results) {
                match result {
                    Ok(set) if json => out.push(serde_json::json!({ "query": query, "hits": set.hits })),
                    Ok(set) => print_results(query, &set),
                    Err(e) if json => out.push(serde_json::json!({ "query": query, "error": e.to_string() })),
                    Err(e) => eprintln!("❌ {query}: {e}"),
                }
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
        }
        Command::ResetIndex => {
            let retriever = Retriever::from_settings(settings).await?;
            retriever.reset_index().await?;
            println!("✅ Vector index reset");
        }
        Command::Status => {
            let retriever = Retriever::from_settings(settings).await?;
            let status = retriever.status(&store).await?;
            println!("collection: {}", status.collection);
            println!("records:    {}", status.records);
            println!("chunks:     {}", status.chunks);
        }
    }
    Ok(())
}
