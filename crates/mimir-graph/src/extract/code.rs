//! Phase 1: code → code edges.
//!
//! Both modes parse the chunk's own text and walk the whole tree (chunk
//! spans refer to the chunk text, so the covering node is the root). They
//! differ in resolution: resolved mode consults the corpus-wide
//! [`CompilationIndex`] for declaration kinds and overloads and picks one
//! deterministic candidate; syntactic mode resolves by short name alone
//! and emits an edge for every match.

use std::collections::{HashMap, HashSet};

use mimir_core::{ChunkRecord, ResolutionMode};
use tree_sitter::{Node, Parser};

use crate::edge::{Edge, EdgeKind};
use crate::extract::symbols::{
    base_short_names, child_of_kind, node_text, short_name_of, type_short_name, CompilationIndex,
};

/// Cached name → candidate resolutions, reused across one worker's chunks.
pub type ResolutionCache = HashMap<String, Vec<String>>;

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "struct_declaration",
    "enum_declaration",
    "record_declaration",
];

/// Extract code→code edges from one chunk.
///
/// Parse failures yield no edges; the caller logs and moves on. Self-loops
/// and references that do not resolve inside the corpus are dropped.
pub fn extract_code_edges(
    chunk: &ChunkRecord,
    parser: &mut Parser,
    cache: &mut ResolutionCache,
    index: &CompilationIndex,
    mode: ResolutionMode,
) -> Vec<Edge> {
    let Some(tree) = parser.parse(&chunk.text, None) else {
        return Vec::new();
    };

    let mut extractor = ChunkExtractor {
        chunk,
        source: chunk.text.as_bytes(),
        cache,
        index,
        mode,
        consumed: HashSet::new(),
        edges: Vec::new(),
    };
    extractor.walk(tree.root_node());
    extractor.edges
}

struct ChunkExtractor<'a> {
    chunk: &'a ChunkRecord,
    source: &'a [u8],
    cache: &'a mut ResolutionCache,
    index: &'a CompilationIndex,
    mode: ResolutionMode,
    /// Node IDs already claimed by a more specific rule, so the generic
    /// identifier pass does not double-count them.
    consumed: HashSet<usize>,
    edges: Vec<Edge>,
}

impl ChunkExtractor<'_> {
    fn walk(&mut self, node: Node) {
        match node.kind() {
            kind if TYPE_DECLARATIONS.contains(&kind) => self.on_base_list(&node),
            "invocation_expression" => self.on_invocation(&node),
            "member_access_expression" => self.on_member_access(&node),
            "object_creation_expression" => self.on_object_creation(&node),
            "identifier" | "generic_name" | "qualified_name" => {
                self.on_name_mention(&node);
                // generic/qualified names contain identifiers; stop here
                if node.kind() != "identifier" {
                    return;
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child);
        }
    }

    fn on_base_list(&mut self, decl: &Node) {
        if let Some(base_list) = child_of_kind(decl, "base_list") {
            self.consume_subtree(&base_list);
        }
        for base in base_short_names(decl, self.source) {
            let kind = match self.mode {
                ResolutionMode::Resolved if self.index.is_interface_name(&base) => {
                    EdgeKind::Implements
                }
                _ => EdgeKind::Inherits,
            };
            for target in self.resolve_per_mode(&base) {
                self.push(target, kind);
            }
        }
    }

    fn on_invocation(&mut self, node: &Node) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        let callee = match function.kind() {
            "member_access_expression" => {
                // Only the accessed name is the callee; the receiver
                // expression is still walked for its own references.
                if let Some(name) = function.child_by_field_name("name") {
                    self.consume_subtree(&name);
                    type_short_name(&node_text(&name, self.source))
                } else {
                    return;
                }
            }
            "identifier" | "generic_name" => {
                self.consume_subtree(&function);
                type_short_name(&node_text(&function, self.source))
            }
            _ => return,
        };
        if callee.is_empty() {
            return;
        }

        match self.mode {
            ResolutionMode::Resolved => {
                let arity = argument_count(node);
                if let Some(target) = self.resolve_method(&callee, arity) {
                    self.push(target, EdgeKind::Calls);
                }
            }
            ResolutionMode::Syntactic => {
                for target in self.resolve(&callee) {
                    self.push(target, EdgeKind::Calls);
                }
            }
        }
    }

    fn on_member_access(&mut self, node: &Node) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        if self.consumed.contains(&name.id()) {
            return;
        }
        self.consume_subtree(&name);

        let accessed = type_short_name(&node_text(&name, self.source));
        for target in self.resolve_per_mode(&accessed) {
            self.push(target, EdgeKind::References);
        }
    }

    fn on_object_creation(&mut self, node: &Node) {
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        self.consume_subtree(&type_node);

        // The edge targets the constructed type, not the constructor
        let constructed = type_short_name(&node_text(&type_node, self.source));
        for target in self.resolve_per_mode(&constructed) {
            self.push(target, EdgeKind::References);
        }
    }

    /// Bare name mentions: generic and qualified names in both modes,
    /// lone identifiers only when resolved mode can tie them to a type
    /// declaration (anything looser floods the graph with locals).
    fn on_name_mention(&mut self, node: &Node) {
        if self.consumed.contains(&node.id()) {
            return;
        }
        let written = node_text(node, self.source);

        if node.kind() == "qualified_name" {
            self.consume_subtree(node);
            for target in self.resolve_dotted(&written) {
                self.push(target, EdgeKind::References);
            }
            return;
        }

        let short = type_short_name(&written);
        if node.kind() == "generic_name" {
            self.consume_subtree(node);
            for target in self.resolve_per_mode(&short) {
                self.push(target, EdgeKind::References);
            }
            return;
        }

        if self.mode == ResolutionMode::Resolved {
            let targets: Vec<String> = self
                .resolve(&short)
                .into_iter()
                .filter(|id| self.index.type_info(id).is_some())
                .collect();
            if let Some(target) = targets.into_iter().next() {
                self.push(target, EdgeKind::References);
            }
        }
    }

    fn consume_subtree(&mut self, node: &Node) {
        self.consumed.insert(node.id());
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.consume_subtree(&child);
        }
    }

    /// Short-name resolution with the three-step fallback: exact matches,
    /// then dotted-suffix matches, else nothing. Cached per worker.
    fn resolve(&mut self, reference: &str) -> Vec<String> {
        if let Some(hit) = self.cache.get(reference) {
            return hit.clone();
        }

        let exact = self.index.lookup(reference);
        let resolved = if !exact.is_empty() {
            exact.to_vec()
        } else if reference.contains('.') {
            self.index.lookup_dotted_suffix(reference)
        } else {
            Vec::new()
        };

        self.cache.insert(reference.to_string(), resolved.clone());
        resolved
    }

    fn resolve_dotted(&mut self, written: &str) -> Vec<String> {
        let compact: String = written.split_whitespace().collect();
        let exact = self.index.lookup(&short_name_of(&compact));
        if exact.iter().any(|id| id == &compact) {
            return vec![compact];
        }
        self.resolve(&compact)
    }

    /// Resolved mode picks one deterministic candidate; syntactic mode
    /// emits an edge per match.
    fn resolve_per_mode(&mut self, reference: &str) -> Vec<String> {
        let mut candidates = self.resolve(reference);
        if self.mode == ResolutionMode::Resolved {
            candidates.truncate(1);
        }
        candidates
    }

    /// Most specific method for an invocation: candidates sharing the
    /// short name, preferring a matching arity, ties broken by ID order.
    fn resolve_method(&mut self, name: &str, arity: usize) -> Option<String> {
        let overloads = self.index.methods_named(name);
        if overloads.is_empty() {
            return None;
        }
        overloads
            .iter()
            .find(|m| m.arity == arity)
            .or_else(|| overloads.first())
            .map(|m| m.id.clone())
    }

    fn push(&mut self, target: String, kind: EdgeKind) {
        if target == self.chunk.id {
            return;
        }
        self.edges.push(Edge {
            source: self.chunk.id.clone(),
            target,
            kind,
        });
    }
}

fn argument_count(invocation: &Node) -> usize {
    let Some(args) = invocation.child_by_field_name("arguments") else {
        return 0;
    };
    let mut cursor = args.walk();
    args.children(&mut cursor)
        .filter(|c| c.kind() == "argument")
        .count()
}
