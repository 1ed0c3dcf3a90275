//! Tool implementations for the Mimir MCP server.
//!
//! Three tools are exposed: `get_item`, `get_uses`, and `get_used_by`.
//! `get_item` fetches chunk source from the lexical store; the other two
//! walk the knowledge graph. Each returns JSON via `CallToolResult`.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars, tool, tool_router, ErrorData as McpError,
};
use serde::{Deserialize, Serialize};

use mimir_graph::{query, Direction, GraphStore, KindFilter, QueryRequest};
use mimir_lexical::LexicalStore;

/// Directory under the corpus root holding the index artefacts.
pub const INDEX_DIR: &str = ".mimir";
/// Base name of the graph artefacts inside [`INDEX_DIR`].
pub const GRAPH_BASE: &str = "graph";
/// File name of the lexical database inside [`INDEX_DIR`].
pub const LEXICAL_DB: &str = "index.db";

const UNRESOLVED_HINT: &str =
    "symbol not found in the index; try the search tool or a node reference like #42";

/// MCP server exposing Mimir retrieval tools.
///
/// The graph artefacts are loaded lazily on the first query and shared
/// read-only afterwards.
///
/// # Examples
///
/// ```
/// use mimir_mcp::tools::MimirServer;
/// use std::path::PathBuf;
///
/// let server = MimirServer::new(PathBuf::from("."));
/// ```
#[derive(Clone)]
pub struct MimirServer {
    pub(crate) corpus_path: PathBuf,
    pub(crate) tool_router: ToolRouter<Self>,
    graph: Arc<OnceLock<GraphStore>>,
}

// --- Parameter structs ---

/// Parameters for the `get_item` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetItemParams {
    /// Symbol ID (code, `xml:` Def, or `#n` node reference).
    pub symbol: String,
    /// Truncate the returned source to this many lines.
    pub max_lines: Option<usize>,
}

/// Parameters for the `get_uses` and `get_used_by` tools.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GraphQueryParams {
    /// Symbol ID (code, `xml:` Def, or `#n` node reference).
    pub symbol: String,
    /// Counterpart filter: "code", "xml", or "all" (default).
    pub kind: Option<String>,
    /// 1-based page number (default: 1).
    pub page: Option<usize>,
    /// Results per page (default: 10).
    pub page_size: Option<usize>,
}

// --- Response structs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemResponse {
    symbol: String,
    name: String,
    language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    def_type: Option<String>,
    path: String,
    span_start: usize,
    span_end: usize,
    source: String,
    truncated: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmptyResponse {
    results: Vec<serde_json::Value>,
    total_count: usize,
    hint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EdgePage {
    resolved: String,
    direction: Direction,
    results: Vec<mimir_graph::GraphHit>,
    total_count: usize,
    page: usize,
    page_size: usize,
}

fn mcp_err(msg: impl Into<String>) -> McpError {
    McpError::internal_error(msg.into(), None)
}

fn invalid(msg: impl Into<String>) -> McpError {
    McpError::invalid_params(msg.into(), None)
}

/// Validate a symbol reference per the tool contract: `#` + digits, an
/// `xml:`-prefixed Def reference, or a code reference. Anything with
/// markup or control characters is rejected outright.
fn validate_symbol(symbol: &str) -> Result<(), McpError> {
    if symbol.is_empty() {
        return Err(invalid("symbol must not be empty"));
    }
    if symbol.chars().any(|c| c.is_control() || c == '<' || c == '>') {
        return Err(invalid(format!("invalid character in symbol: {symbol:?}")));
    }

    if let Some(rest) = symbol.strip_prefix('#') {
        if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(format!(
                "node references are '#' followed by digits, got {symbol:?}"
            )));
        }
        return Ok(());
    }

    if let Some(rest) = symbol.strip_prefix("xml:") {
        let starts_ok = rest
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        if !starts_ok {
            return Err(invalid(format!("malformed xml reference: {symbol:?}")));
        }
        return Ok(());
    }

    let acceptable = symbol.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '(' | ')' | '`' | ',' | ' ' | ':')
    });
    if !acceptable {
        return Err(invalid(format!("malformed symbol reference: {symbol:?}")));
    }
    Ok(())
}

fn parse_kind_filter(kind: &Option<String>) -> Result<Option<KindFilter>, McpError> {
    match kind.as_deref() {
        None | Some("all") => Ok(None),
        Some("code") => Ok(Some(KindFilter::Code)),
        Some("xml") => Ok(Some(KindFilter::Xml)),
        Some(other) => Err(invalid(format!(
            "kind must be \"code\", \"xml\", or \"all\", got {other:?}"
        ))),
    }
}

fn to_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| mcp_err(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[tool_router]
impl MimirServer {
    /// Create a new server over an indexed corpus directory.
    pub fn new(corpus_path: PathBuf) -> Self {
        Self {
            corpus_path,
            tool_router: Self::tool_router(),
            graph: Arc::new(OnceLock::new()),
        }
    }

    fn index_dir(&self) -> PathBuf {
        self.corpus_path.join(INDEX_DIR)
    }

    /// The loaded graph, reading the artefacts on first use.
    fn graph(&self) -> Result<&GraphStore, McpError> {
        if let Some(store) = self.graph.get() {
            return Ok(store);
        }
        let base = self.index_dir().join(GRAPH_BASE);
        let store = GraphStore::load(&base).map_err(|e| {
            mcp_err(format!(
                "failed to load graph artefacts from {}: {e}. Run `mimir index` first.",
                base.display()
            ))
        })?;
        tracing::info!(
            nodes = store.node_count(),
            edges = store.edge_count(),
            "graph artefacts loaded"
        );
        Ok(self.graph.get_or_init(|| store))
    }

    fn lexical(&self) -> Result<LexicalStore, McpError> {
        let path = self.index_dir().join(LEXICAL_DB);
        LexicalStore::open(&path).map_err(|e| {
            mcp_err(format!(
                "failed to open lexical index at {}: {e}. Run `mimir index` first.",
                path.display()
            ))
        })
    }

    fn run_graph_query(
        &self,
        params: &GraphQueryParams,
        direction: Direction,
    ) -> Result<CallToolResult, McpError> {
        validate_symbol(&params.symbol)?;
        let kind_filter = parse_kind_filter(&params.kind)?;
        let page = params.page.unwrap_or(1).max(1);
        let page_size = params.page_size.unwrap_or(10).max(1);

        let request = QueryRequest {
            direction,
            kind_filter,
            page,
            page_size,
            max_depth: None,
        };
        let response = query(self.graph()?, &params.symbol, &request);

        match response.resolved {
            Some(resolved) => to_result(&EdgePage {
                resolved,
                direction,
                results: response.results,
                total_count: response.total_count,
                page,
                page_size,
            }),
            None => to_result(&EmptyResponse {
                results: Vec::new(),
                total_count: 0,
                hint: UNRESOLVED_HINT.to_string(),
            }),
        }
    }

    #[tool(
        name = "get_item",
        description = "Fetch the source and metadata of a symbol by ID. Accepts canonical code IDs (Namespace.Type.Member), XML Def IDs (xml:DefType:DefName), and #n node references. Use max_lines to truncate long sources."
    )]
    pub fn get_item(
        &self,
        Parameters(params): Parameters<GetItemParams>,
    ) -> Result<CallToolResult, McpError> {
        validate_symbol(&params.symbol)?;
        let store = self.lexical()?;

        // Exact hit first; otherwise resolve through the graph's node
        // table (handles #n references and fuzzy lookups).
        let mut chunk = store
            .get(&params.symbol)
            .map_err(|e| mcp_err(e.to_string()))?;
        if chunk.is_none() {
            if let Ok(graph) = self.graph() {
                if let Some(resolved) =
                    mimir_graph::resolve::resolve_reference(graph, &params.symbol)
                {
                    chunk = store.get(&resolved).map_err(|e| mcp_err(e.to_string()))?;
                }
            }
        }

        let Some(chunk) = chunk else {
            return to_result(&EmptyResponse {
                results: Vec::new(),
                total_count: 0,
                hint: UNRESOLVED_HINT.to_string(),
            });
        };

        let (source, truncated) = truncate_lines(&chunk.text, params.max_lines);
        to_result(&ItemResponse {
            symbol: chunk.id,
            name: chunk.symbol_name,
            language: chunk.language.to_string(),
            def_type: chunk.def_type,
            path: chunk.path.display().to_string(),
            span_start: chunk.span_start,
            span_end: chunk.span_end,
            source,
            truncated,
        })
    }

    #[tool(
        name = "get_uses",
        description = "List the symbols a given symbol uses (outbound edges), ranked by PageRank, edge weight, and name similarity. Filter with kind=\"code\" or kind=\"xml\"; paginate with page/page_size."
    )]
    pub fn get_uses(
        &self,
        Parameters(params): Parameters<GraphQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run_graph_query(&params, Direction::Uses)
    }

    #[tool(
        name = "get_used_by",
        description = "List the symbols that use a given symbol (inbound edges), including the Defs that bind a class via CodeUsedByDef edges. Same ranking and pagination as get_uses."
    )]
    pub fn get_used_by(
        &self,
        Parameters(params): Parameters<GraphQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        self.run_graph_query(&params, Direction::UsedBy)
    }
}

fn truncate_lines(text: &str, max_lines: Option<usize>) -> (String, bool) {
    let Some(max_lines) = max_lines else {
        return (text.to_string(), false);
    };
    let total = text.lines().count();
    if total <= max_lines {
        return (text.to_string(), false);
    }
    let kept: Vec<&str> = text.lines().take(max_lines).collect();
    (kept.join("\n"), true)
}
