use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use mimir_core::MimirConfig;
use mimir_graph::{Direction, GraphStore, KindFilter, QueryRequest};
use mimir_lexical::{EmbeddingClient, LexicalStore};
use mimir_mcp::tools::{GRAPH_BASE, INDEX_DIR, LEXICAL_DB};

const CONFIG_FILE: &str = ".mimir.toml";

const DEFAULT_CONFIG: &str = r#"# Mimir configuration

[index]
# Worker threads for the extraction phases (0 = one per core)
parallelism = 0
# Reference resolution for code chunks: "resolved" or "syntactic"
resolution = "resolved"
# Extra linkable XML field names merged with the built-in seed set
linkable_fields = []

[embedding]
provider = "voyage"
model = "voyage-code-3"
dimensions = 1024
# api_key = "..."   # or set VOYAGE_API_KEY
"#;

#[derive(Parser)]
#[command(
    name = "mimir",
    version,
    about = "Knowledge-graph indexer and retrieval server for game-mod corpora",
    long_about = "Mimir indexes a mod corpus (C# sources plus XML Defs), builds a typed\n\
                  knowledge graph with PageRank scores, and serves ranked retrieval\n\
                  queries over it — standalone or as an MCP server."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: <corpus>/.mimir.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default .mimir.toml in the current directory
    Init,
    /// Index a corpus: chunk it, build the graph artefacts and lexical store
    Index {
        /// Corpus root directory
        path: PathBuf,
    },
    /// Run a one-shot graph query against an indexed corpus
    Query {
        /// Symbol reference (ID, xml: Def, or #n)
        symbol: String,
        /// Walk inbound edges instead of outbound
        #[arg(long)]
        used_by: bool,
        /// Counterpart filter: code, xml, or all
        #[arg(long, default_value = "all")]
        kind: String,
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Results per page
        #[arg(long, default_value_t = 10)]
        page_size: usize,
        /// Indexed corpus root
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },
    /// Start the MCP server for IDE and agent integration
    Mcp {
        /// Indexed corpus root
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Init => init(),
        Command::Index { path } => index(&path, cli.config.as_deref()).await,
        Command::Query {
            symbol,
            used_by,
            kind,
            page,
            page_size,
            path,
        } => run_query(&path, &symbol, used_by, &kind, page, page_size),
        Command::Mcp { path } => {
            mimir_mcp::run_server(path).await?;
            Ok(())
        }
    }
}

fn init() -> Result<()> {
    let path = PathBuf::from(CONFIG_FILE);
    if path.exists() {
        bail!("{CONFIG_FILE} already exists; refusing to overwrite");
    }
    std::fs::write(&path, DEFAULT_CONFIG).context("failed to write config")?;
    println!("wrote {CONFIG_FILE}");
    Ok(())
}

fn load_config(
    corpus: &std::path::Path,
    explicit: Option<&std::path::Path>,
) -> Result<MimirConfig> {
    if let Some(path) = explicit {
        return MimirConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }
    let local = corpus.join(CONFIG_FILE);
    if local.exists() {
        return MimirConfig::from_file(&local)
            .with_context(|| format!("failed to load config {}", local.display()));
    }
    Ok(MimirConfig::default())
}

async fn index(corpus: &std::path::Path, config_path: Option<&std::path::Path>) -> Result<()> {
    let config = load_config(corpus, config_path)?;

    let chunks = mimir_corpus::chunk_dir(corpus)
        .with_context(|| format!("failed to chunk corpus {}", corpus.display()))?;
    tracing::info!(chunks = chunks.len(), "corpus chunked");

    let index_dir = corpus.join(INDEX_DIR);
    let store = LexicalStore::open(&index_dir.join(LEXICAL_DB))?;
    store.insert_chunks(&chunks)?;

    // Embeddings are an enrichment; an unconfigured key is not an error
    match EmbeddingClient::with_config(&config.embedding) {
        Ok(client) => {
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let embeddings = client.embed_batch(&texts).await?;
            for (chunk, embedding) in chunks.iter().zip(&embeddings) {
                store.set_embedding(&chunk.id, embedding)?;
            }
            tracing::info!(embedded = embeddings.len(), "chunks embedded");
        }
        Err(e) => {
            tracing::info!("skipping embeddings: {e}");
        }
    }

    let summary =
        mimir_graph::build_artifacts(&chunks, &config.index, &index_dir.join(GRAPH_BASE))?;
    println!(
        "indexed {} chunks: {} nodes, {} edges",
        summary.chunks, summary.nodes, summary.edges
    );
    Ok(())
}

fn run_query(
    corpus: &std::path::Path,
    symbol: &str,
    used_by: bool,
    kind: &str,
    page: usize,
    page_size: usize,
) -> Result<()> {
    let kind_filter = match kind {
        "all" => None,
        "code" => Some(KindFilter::Code),
        "xml" => Some(KindFilter::Xml),
        other => bail!("kind must be \"code\", \"xml\", or \"all\", got {other:?}"),
    };

    let base = corpus.join(INDEX_DIR).join(GRAPH_BASE);
    let store = GraphStore::load(&base)
        .with_context(|| format!("no index at {}; run `mimir index` first", base.display()))?;

    let request = QueryRequest {
        direction: if used_by {
            Direction::UsedBy
        } else {
            Direction::Uses
        },
        kind_filter,
        page: page.max(1),
        page_size: page_size.max(1),
        max_depth: None,
    };
    let response = mimir_graph::query(&store, symbol, &request);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
