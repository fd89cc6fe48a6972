use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use tech_support_rag::config::AssistantConfig;
use tech_support_rag::embedding::Embedder;
use tech_support_rag::loader::{load_directory, load_urls};
use tech_support_rag::session::WELCOME_MESSAGE;
use tech_support_rag::splitter::TextSplitter;
use tech_support_rag::{
    AnswerAssembler, Assistant, DocumentStoreBuilder, IndexStore, LLM, Retriever, Session,
};

#[derive(Parser)]
#[command(name = "tech-support-rag")]
#[command(about = "Tech support assistant with retrieval-augmented answers", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector index from the .pdf and .txt files in a directory
    Ingest {
        /// Directory holding the source files
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Add to the existing index instead of replacing it
        #[arg(long)]
        append: bool,
    },

    /// Build the vector index from web pages
    IngestUrls {
        /// Pages to load; the built-in list is used when none are given
        urls: Vec<String>,

        /// Add to the existing index instead of replacing it
        #[arg(long)]
        append: bool,
    },

    /// Start an interactive support conversation
    Chat,
}

#[cfg(feature = "minilm")]
fn make_embedder() -> Result<Arc<dyn Embedder>> {
    let embedder = tech_support_rag::embedding::MiniLmEmbedder::new()
        .context("Failed to load all-MiniLM-L6-v2")?;
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "minilm"))]
fn make_embedder() -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(tech_support_rag::HashingEmbedder::default()))
}

fn make_builder(config: &AssistantConfig, store: Arc<IndexStore>) -> Result<DocumentStoreBuilder> {
    let splitter = TextSplitter::new(config.ingest.chunk_size, config.ingest.chunk_overlap)?;
    Ok(DocumentStoreBuilder::new(make_embedder()?, store, splitter))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AssistantConfig::from_env();
    let store = Arc::new(IndexStore::new(config.ingest.index_dir.clone()));

    match cli.command {
        Commands::Ingest { data_dir, append } => {
            let data_dir = data_dir.unwrap_or_else(|| config.ingest.data_dir.clone());
            let documents = load_directory(&data_dir)
                .with_context(|| format!("Failed to load documents from {}", data_dir.display()))?;
            let report = make_builder(&config, store)?.build(&documents, append)?;
            println!("Total chunks created: {}", report.chunks);
            println!("Ingestion completed successfully");
        }
        Commands::IngestUrls { urls, append } => {
            let urls = if urls.is_empty() { config.ingest.urls.clone() } else { urls };
            let client = reqwest::Client::new();
            let documents = load_urls(&client, &urls).await.context("Failed to load web pages")?;
            println!("Loaded {} web documents", documents.len());
            let report = make_builder(&config, store)?.build(&documents, append)?;
            println!("Split into {} chunks", report.chunks);
            println!("Web data ingested into vector database");
        }
        Commands::Chat => run_chat(config, store).await?,
    }

    Ok(())
}

async fn run_chat(config: AssistantConfig, store: Arc<IndexStore>) -> Result<()> {
    let llm = LLM::new(config.llm.clone()).context("Cannot reach the language model")?;
    let retriever = Retriever::new(store, make_embedder()?, config.retrieval.top_k);
    let assistant = Assistant::new(AnswerAssembler::new(retriever, Arc::new(llm)), config.keywords);
    let mut session = Session::new();

    println!("{}\n", WELCOME_MESSAGE);
    println!("Commands: /clear, /memory, /stats, /quit\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        // EOF (Ctrl+D)
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        match message {
            "/quit" => break,
            "/clear" => {
                session.reset();
                println!("Conversation cleared\n");
            }
            "/memory" => println!("{}\n", serde_json::to_string_pretty(session.memory())?),
            "/stats" => {
                let stats = session.stats();
                println!(
                    "Issues tracked: {}  Steps given: {}  Context fields: {}\n",
                    stats.issues_tracked, stats.steps_given, stats.context_fields
                );
            }
            _ => {
                print!("\nAnalyzing issue...");
                std::io::stdout().flush()?;
                let reply = assistant.handle_turn(&mut session, message).await;
                println!("\r{}\n", reply);
            }
        }
    }

    Ok(())
}
