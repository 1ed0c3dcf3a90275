//! Single-hop ranked traversal of the loaded graph.

use std::collections::HashMap;

use serde::Serialize;
use strsim::jaro_winkler;

use crate::edge::EdgeKind;
use crate::loader::GraphStore;
use crate::resolve::resolve_reference;

/// Scale factor applied to a counterpart's PageRank before it enters the
/// composite score.
const PAGERANK_SCALE: f64 = 1e7;

/// Traversal direction.
///
/// # Examples
///
/// ```
/// use mimir_graph::query::Direction;
///
/// assert_ne!(Direction::Uses, Direction::UsedBy);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    /// Follow outgoing edges: what does this symbol use?
    Uses,
    /// Follow incoming edges: what uses this symbol?
    UsedBy,
}

/// Filter on the counterpart's symbol universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KindFilter {
    /// Keep only counterparts that are code symbols.
    Code,
    /// Keep only counterparts that are XML Defs (`xml:` prefix).
    Xml,
}

/// A query against the graph.
///
/// `max_depth` is accepted for forward compatibility; traversal is always
/// single-hop.
///
/// # Examples
///
/// ```
/// use mimir_graph::query::{Direction, QueryRequest};
///
/// let request = QueryRequest::new(Direction::UsedBy);
/// assert_eq!(request.page, 1);
/// assert_eq!(request.page_size, 10);
/// ```
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Traversal direction.
    pub direction: Direction,
    /// Optional counterpart filter; `None` keeps everything.
    pub kind_filter: Option<KindFilter>,
    /// 1-based page number.
    pub page: usize,
    /// Results per page.
    pub page_size: usize,
    /// Ignored; single-hop traversal only.
    pub max_depth: Option<usize>,
}

impl QueryRequest {
    /// A request with default pagination (page 1, 10 results).
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            kind_filter: None,
            page: 1,
            page_size: 10,
            max_depth: None,
        }
    }
}

/// One ranked edge group in a query result.
///
/// # Examples
///
/// ```
/// use mimir_graph::query::GraphHit;
///
/// let hit = GraphHit {
///     symbol: "Verse.ThingComp".into(),
///     edge_kind: "Inherits".into(),
///     duplicate_count: 1,
///     pagerank: 0.25,
///     score: 5_000_000.0,
/// };
/// assert_eq!(hit.edge_kind, "Inherits");
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphHit {
    /// Counterpart symbol ID.
    pub symbol: String,
    /// Edge kind name (`Unknown(n)` for unrecognised on-disk bytes).
    pub edge_kind: String,
    /// How many identical edges were collapsed into this group.
    pub duplicate_count: usize,
    /// PageRank of the counterpart (0 when unranked).
    pub pagerank: f64,
    /// Composite relevance score.
    pub score: f64,
}

/// The outcome of a graph query: the resolved subject, one page of ranked
/// hits, and the total hit count before pagination.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    /// Canonical ID the reference resolved to, if any.
    pub resolved: Option<String>,
    /// The requested page of results.
    pub results: Vec<GraphHit>,
    /// Total result count across all pages.
    pub total_count: usize,
}

impl QueryResponse {
    fn empty() -> Self {
        Self {
            resolved: None,
            results: Vec::new(),
            total_count: 0,
        }
    }
}

/// Resolve `reference` and walk one hop of the graph, scoring and
/// paginating the counterpart groups.
///
/// An unresolvable reference yields an empty response rather than an
/// error; the engine is re-entrant and never fails across queries.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use mimir_graph::loader::GraphStore;
/// use mimir_graph::query::{query, Direction, QueryRequest};
///
/// let store = GraphStore::load(Path::new(".mimir/graph")).unwrap();
/// let response = query(&store, "Verse.Pawn", &QueryRequest::new(Direction::UsedBy));
/// println!("{} inbound references", response.total_count);
/// ```
pub fn query(store: &GraphStore, reference: &str, request: &QueryRequest) -> QueryResponse {
    let Some(resolved) = resolve_reference(store, reference) else {
        return QueryResponse::empty();
    };
    let Some(subject) = store.node_index(&resolved) else {
        return QueryResponse::empty();
    };

    // Group duplicate edges by (counterpart, kind), recording multiplicity.
    let mut groups: HashMap<(u32, u8), usize> = HashMap::new();
    let edges: Box<dyn Iterator<Item = (u32, u8)>> = match request.direction {
        Direction::Uses => Box::new(store.out_neighbors(subject)),
        Direction::UsedBy => Box::new(store.in_neighbors(subject)),
    };
    for (counterpart, kind_byte) in edges {
        if counterpart == subject {
            continue;
        }
        // CodeUsedByDef is a synthetic reverse edge; it only means
        // something when walking incoming edges.
        if request.direction == Direction::Uses
            && EdgeKind::from_byte(kind_byte) == Some(EdgeKind::CodeUsedByDef)
        {
            continue;
        }
        let counterpart_id = match store.symbol_id(counterpart) {
            Some(id) => id,
            None => continue,
        };
        if !passes_filter(counterpart_id, request.kind_filter) {
            continue;
        }
        *groups.entry((counterpart, kind_byte)).or_insert(0) += 1;
    }

    let mut hits: Vec<GraphHit> = groups
        .into_iter()
        .map(|((counterpart, kind_byte), duplicate_count)| {
            let symbol = store
                .symbol_id(counterpart)
                .unwrap_or_default()
                .to_string();
            let pagerank = store.pagerank_of(&symbol).unwrap_or(0.0);
            let score = PAGERANK_SCALE
                * pagerank
                * EdgeKind::weight_of_byte(kind_byte)
                * (duplicate_count as f64).sqrt()
                * jaro_winkler(reference, &symbol);
            GraphHit {
                symbol,
                edge_kind: kind_name(kind_byte),
                duplicate_count,
                pagerank,
                score,
            }
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
            .then_with(|| a.edge_kind.cmp(&b.edge_kind))
    });

    let total_count = hits.len();
    let page = request.page.max(1);
    let start = (page - 1).saturating_mul(request.page_size).min(total_count);
    let end = start.saturating_add(request.page_size).min(total_count);

    QueryResponse {
        resolved: Some(resolved),
        results: hits[start..end].to_vec(),
        total_count,
    }
}

fn passes_filter(counterpart_id: &str, filter: Option<KindFilter>) -> bool {
    match filter {
        None => true,
        Some(KindFilter::Code) => !counterpart_id.starts_with("xml:"),
        Some(KindFilter::Xml) => counterpart_id.starts_with("xml:"),
    }
}

fn kind_name(byte: u8) -> String {
    match EdgeKind::from_byte(byte) {
        Some(kind) => kind.to_string(),
        None => format!("Unknown({byte})"),
    }
}
