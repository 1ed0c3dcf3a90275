//! Chunk extraction for C# sources and XML Def files.
//!
//! Each C# type and method declaration becomes one chunk; each Def element
//! under an XML document root becomes one chunk. Chunk IDs are canonical
//! symbol IDs: `Namespace.Type[.Member(Params)]` for code (generic arity
//! suffixed `` `N ``), `xml:<DefType>:<DefName>` for Defs.

use std::path::Path;

use mimir_core::{ChunkLanguage, ChunkRecord, MimirError};
use tree_sitter::{Node, Parser};

use crate::walker::{CorpusFile, FileKind};

/// Extract all chunks from a corpus file.
///
/// # Errors
///
/// Returns [`MimirError::Parse`] if the C# grammar cannot be loaded, or
/// [`MimirError::Xml`] if an XML file is not well-formed.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use mimir_corpus::chunker::chunk_file;
/// use mimir_corpus::walker::{CorpusFile, FileKind};
///
/// let file = CorpusFile {
///     path: PathBuf::from("Source/Pawn.cs"),
///     kind: FileKind::CSharp,
///     content: "namespace Verse { public class Pawn { public void Tick() { } } }".into(),
/// };
/// let chunks = chunk_file(&file).unwrap();
/// let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
/// assert!(ids.contains(&"Verse.Pawn"));
/// assert!(ids.contains(&"Verse.Pawn.Tick()"));
/// ```
pub fn chunk_file(file: &CorpusFile) -> Result<Vec<ChunkRecord>, MimirError> {
    match file.kind {
        FileKind::CSharp => chunk_code_file(&file.path, &file.content),
        FileKind::Xml => chunk_xml_file(&file.path, &file.content),
        FileKind::Unknown => Ok(Vec::new()),
    }
}

/// Chunk every file in a corpus, skipping files that fail to parse.
///
/// Parse failures are logged and produce no chunks; they never fail the
/// build.
///
/// # Examples
///
/// ```
/// use mimir_corpus::chunker::chunk_corpus;
///
/// let chunks = chunk_corpus(&[]);
/// assert!(chunks.is_empty());
/// ```
pub fn chunk_corpus(files: &[CorpusFile]) -> Vec<ChunkRecord> {
    let mut chunks = Vec::new();
    for file in files {
        match chunk_file(file) {
            Ok(file_chunks) => chunks.extend(file_chunks),
            Err(e) => {
                tracing::warn!(path = %file.path.display(), error = %e, "skipping unparseable file");
            }
        }
    }
    chunks
}

// --- C# ---

fn chunk_code_file(path: &Path, content: &str) -> Result<Vec<ChunkRecord>, MimirError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
        .map_err(|e| MimirError::Parse(format!("failed to set C# language: {e}")))?;

    let Some(tree) = parser.parse(content, None) else {
        return Ok(Vec::new());
    };

    let source = content.as_bytes();
    let mut chunks = Vec::new();
    collect_code_chunks(
        tree.root_node(),
        source,
        path,
        &mut Vec::new(),
        &mut chunks,
    );

    Ok(chunks)
}

/// Node kinds that open a named type scope.
const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "struct_declaration",
    "enum_declaration",
    "record_declaration",
];

fn collect_code_chunks(
    node: Node,
    source: &[u8],
    path: &Path,
    scope: &mut Vec<String>,
    chunks: &mut Vec<ChunkRecord>,
) {
    let kind = node.kind();

    if kind == "namespace_declaration" {
        let name = field_text(&node, "name", source).unwrap_or_default();
        let depth = push_dotted(scope, &name);
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            collect_code_chunks(child, source, path, scope, chunks);
        }
        scope.truncate(scope.len() - depth);
        return;
    }

    if TYPE_DECLARATIONS.contains(&kind) {
        if let Some(name) = field_text(&node, "name", source) {
            let qualified = type_segment(&node, &name);
            scope.push(qualified.clone());
            let id = scope.join(".");
            chunks.push(make_chunk(path, &node, source, id, name));

            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_code_chunks(child, source, path, scope, chunks);
            }
            scope.pop();
        }
        return;
    }

    if (kind == "method_declaration" || kind == "constructor_declaration") && !scope.is_empty() {
        if let Some(name) = field_text(&node, "name", source) {
            let params = parameter_signature(&node, source);
            let id = format!("{}.{}({})", scope.join("."), method_segment(&node, &name), params);
            chunks.push(make_chunk(path, &node, source, id, name));
        }
        return;
    }

    // A file-scoped namespace (`namespace X;`) scopes everything after it;
    // the grammar may attach the trailing declarations as its children or as
    // siblings, so keep the name pushed until this level is fully walked.
    let mut cursor = node.walk();
    let mut file_scoped = 0;
    for child in node.children(&mut cursor) {
        if child.kind() == "file_scoped_namespace_declaration" {
            let name = field_text(&child, "name", source).unwrap_or_default();
            file_scoped += push_dotted(scope, &name);
            let mut inner = child.walk();
            for decl in child.children(&mut inner) {
                collect_code_chunks(decl, source, path, scope, chunks);
            }
            continue;
        }
        collect_code_chunks(child, source, path, scope, chunks);
    }
    scope.truncate(scope.len() - file_scoped);
}

/// Push a possibly dotted namespace name as individual scope segments.
/// Returns how many segments were pushed.
fn push_dotted(scope: &mut Vec<String>, name: &str) -> usize {
    if name.is_empty() {
        return 0;
    }
    let mut pushed = 0;
    for segment in name.split('.') {
        scope.push(segment.to_string());
        pushed += 1;
    }
    pushed
}

/// Type name with generic arity suffix (`Dict` + `<K, V>` → ``Dict`2``).
fn type_segment(node: &Node, name: &str) -> String {
    match generic_arity(node) {
        0 => name.to_string(),
        n => format!("{name}`{n}"),
    }
}

fn method_segment(node: &Node, name: &str) -> String {
    type_segment(node, name)
}

fn generic_arity(node: &Node) -> usize {
    let Some(params) = node.child_by_field_name("type_parameters") else {
        return 0;
    };
    let mut cursor = params.walk();
    params
        .children(&mut cursor)
        .filter(|c| c.kind() == "type_parameter")
        .count()
}

/// Render a method's parameter list as `Type1, Type2` with internal
/// whitespace collapsed so overload IDs are stable.
fn parameter_signature(node: &Node, source: &[u8]) -> String {
    let Some(list) = node.child_by_field_name("parameters") else {
        return String::new();
    };
    let mut cursor = list.walk();
    let types: Vec<String> = list
        .children(&mut cursor)
        .filter(|c| c.kind() == "parameter")
        .filter_map(|p| p.child_by_field_name("type").map(|t| node_text(&t, source)))
        .map(|t| t.split_whitespace().collect::<String>())
        .collect();
    types.join(", ")
}

fn make_chunk(
    path: &Path,
    node: &Node,
    source: &[u8],
    id: String,
    symbol_name: String,
) -> ChunkRecord {
    ChunkRecord {
        id,
        language: ChunkLanguage::Code,
        text: node_text(node, source),
        symbol_name,
        def_type: None,
        span_start: node.start_byte(),
        span_end: node.end_byte(),
        path: path.to_path_buf(),
    }
}

fn node_text(node: &Node, source: &[u8]) -> String {
    let start = node.start_byte();
    let end = node.end_byte();
    if start >= source.len() || end > source.len() {
        return String::new();
    }
    String::from_utf8_lossy(&source[start..end]).to_string()
}

fn field_text(node: &Node, field: &str, source: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .map(|child| node_text(&child, source))
        .filter(|text| !text.is_empty())
}

// --- XML ---

fn chunk_xml_file(path: &Path, content: &str) -> Result<Vec<ChunkRecord>, MimirError> {
    let doc = roxmltree::Document::parse(content)
        .map_err(|e| MimirError::Xml(format!("{}: {e}", path.display())))?;

    let mut chunks = Vec::new();
    for def in doc.root_element().children().filter(|n| n.is_element()) {
        let def_type = def.tag_name().name().to_string();
        let Some(def_name) = def_name_of(&def) else {
            continue;
        };

        let range = def.range();
        chunks.push(ChunkRecord {
            id: format!("xml:{def_type}:{def_name}"),
            language: ChunkLanguage::Xml,
            text: content[range.clone()].to_string(),
            symbol_name: def_name,
            def_type: Some(def_type),
            span_start: range.start,
            span_end: range.end,
            path: path.to_path_buf(),
        });
    }

    Ok(chunks)
}

/// A Def is named by its `defName` child, or the `Name` attribute for
/// abstract parent Defs.
fn def_name_of(def: &roxmltree::Node<'_, '_>) -> Option<String> {
    let by_child = def
        .children()
        .filter(|n| n.is_element())
        .find(|n| n.tag_name().name() == "defName")
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    by_child.or_else(|| {
        def.attribute("Name")
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
    })
}
