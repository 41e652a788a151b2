//! Novelgraph CLI — novel-to-knowledge-graph pipeline.
//!
//! Usage:
//!   novelgraph chunk --input novel.txt --author "Mark Twain" --book "Tom Sawyer" --output rows.json
//!   novelgraph generate --input rows.json --api-key KEY --output rows.json
//!   novelgraph process --input rows.json --output processed.json
//!   novelgraph import --input processed.json --uri bolt://localhost:7687

use clap::{Parser, Subcommand};
use novelgraph::{
    chunk_novel_file, extract_nodes, extract_relationships, process_rows, ChunkRow,
    ExtractionClient, GeminiClient, GeminiConfig, LoaderConfig, MemgraphLoader,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "novelgraph",
    version,
    about = "Literary knowledge-graph extraction and import pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a novel text file into chunk rows
    Chunk {
        /// Path to the novel text file
        #[arg(long)]
        input: PathBuf,
        /// Author name attached to every row
        #[arg(long)]
        author: String,
        /// Book title attached to every row
        #[arg(long)]
        book: String,
        /// Where to write the rows (JSON array)
        #[arg(long)]
        output: PathBuf,
    },
    /// Fill each row's kg_json by calling the extraction service
    Generate {
        /// Path to a rows JSON file
        #[arg(long)]
        input: PathBuf,
        /// Gemini API key
        #[arg(long)]
        api_key: String,
        /// Model name
        #[arg(long, default_value = "gemini-2.0-flash-lite")]
        model: String,
        /// Where to write the rows with kg_json filled
        #[arg(long)]
        output: PathBuf,
    },
    /// Normalize every row's kg_json to stable identifiers
    Process {
        /// Path to a rows JSON file with kg_json filled
        #[arg(long)]
        input: PathBuf,
        /// Where to write the processed rows
        #[arg(long)]
        output: PathBuf,
        /// Progress-logging cadence
        #[arg(long, default_value_t = 100)]
        batch_size: usize,
    },
    /// Bulk-load processed rows into Memgraph
    Import {
        /// Path to a processed rows JSON file
        #[arg(long)]
        input: PathBuf,
        /// Bolt endpoint
        #[arg(long, default_value = "bolt://localhost:7687")]
        uri: String,
        /// Database user
        #[arg(long, default_value = "")]
        user: String,
        /// Database password
        #[arg(long, default_value = "")]
        password: String,
        /// Records per transaction batch
        #[arg(long, default_value_t = novelgraph::loader::DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
}

fn read_rows(path: &PathBuf) -> Result<Vec<ChunkRow>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("cannot parse {}: {}", path.display(), e))
}

fn write_rows(path: &PathBuf, rows: &[ChunkRow]) -> Result<(), String> {
    let text = serde_json::to_string_pretty(rows).map_err(|e| e.to_string())?;
    std::fs::write(path, text).map_err(|e| format!("cannot write {}: {}", path.display(), e))
}

async fn cmd_chunk(
    input: PathBuf,
    author: String,
    book: String,
    output: PathBuf,
) -> Result<(), String> {
    let rows = chunk_novel_file(&input, &author, &book)
        .map_err(|e| format!("cannot read {}: {}", input.display(), e))?;
    info!(rows = rows.len(), "chunked novel");
    write_rows(&output, &rows)
}

async fn cmd_generate(
    input: PathBuf,
    api_key: String,
    model: String,
    output: PathBuf,
) -> Result<(), String> {
    let client = GeminiClient::new(GeminiConfig::new(api_key).with_model(model))
        .map_err(|e| e.to_string())?;
    let mut rows = read_rows(&input)?;
    let total = rows.len();
    let mut failures = 0usize;

    for (index, row) in rows.iter_mut().enumerate() {
        match client.extract(row).await {
            Ok(kg_json) => row.kg_json = kg_json,
            Err(e) => {
                failures += 1;
                error!(row = index, "extraction failed: {}", e);
            }
        }
        if (index + 1) % 10 == 0 {
            info!(processed = index + 1, total, "extracted chunks");
        }
    }

    info!(total, failures, "extraction pass finished");
    write_rows(&output, &rows)
}

async fn cmd_process(input: PathBuf, output: PathBuf, batch_size: usize) -> Result<(), String> {
    let rows = read_rows(&input)?;
    let (processed, stats) = process_rows(rows, batch_size);
    info!(
        rows = processed.len(),
        total_errors = stats.total_errors,
        json_decode_errors = stats.json_decode_errors,
        unresolved_endpoints = stats.unresolved_endpoints,
        "processing finished"
    );
    if !stats.error_rows.is_empty() {
        error!(rows = ?stats.error_rows, "rows kept their original kg_json");
    }
    write_rows(&output, &processed)
}

async fn cmd_import(
    input: PathBuf,
    uri: String,
    user: String,
    password: String,
    batch_size: usize,
) -> Result<(), String> {
    let rows = read_rows(&input)?;
    let nodes = extract_nodes(&rows);
    let relationships = extract_relationships(&rows);
    info!(
        nodes = nodes.len(),
        relationships = relationships.len(),
        "extracted entities for import"
    );

    let mut loader = MemgraphLoader::new(LoaderConfig {
        uri,
        user,
        password,
        batch_size,
    });
    loader.connect().await.map_err(|e| e.to_string())?;
    loader.create_indexes().await.map_err(|e| e.to_string())?;
    let node_count = loader.import_nodes(&nodes).await.map_err(|e| e.to_string())?;
    let rel_count = loader
        .import_relationships(&relationships)
        .await
        .map_err(|e| e.to_string())?;
    loader.close();

    info!(node_count, rel_count, "import finished");
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Chunk {
            input,
            author,
            book,
            output,
        } => cmd_chunk(input, author, book, output).await,
        Commands::Generate {
            input,
            api_key,
            model,
            output,
        } => cmd_generate(input, api_key, model, output).await,
        Commands::Process {
            input,
            output,
            batch_size,
        } => cmd_process(input, output, batch_size).await,
        Commands::Import {
            input,
            uri,
            user,
            password,
            batch_size,
        } => cmd_import(input, uri, user, password, batch_size).await,
    };

    if let Err(message) = result {
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}
