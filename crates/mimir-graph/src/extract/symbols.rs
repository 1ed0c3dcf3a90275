//! Corpus-wide symbol survey backing reference resolution.
//!
//! There is no real compiler here: the index is assembled by parsing every
//! code chunk once and recording declarations, base lists, and public
//! fields. Resolution against it is best-effort by short name, which is
//! what the rest of the extractor expects.

use std::collections::{HashMap, HashSet};

use mimir_core::{ChunkLanguage, ChunkRecord};
use tree_sitter::{Node, Parser};

/// Declaration kind of a surveyed type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Enum,
    Record,
}

impl TypeKind {
    fn from_node_kind(kind: &str) -> Option<Self> {
        match kind {
            "class_declaration" => Some(TypeKind::Class),
            "interface_declaration" => Some(TypeKind::Interface),
            "struct_declaration" => Some(TypeKind::Struct),
            "enum_declaration" => Some(TypeKind::Enum),
            "record_declaration" => Some(TypeKind::Record),
            _ => None,
        }
    }
}

/// A public field of a surveyed type.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Declared field name.
    pub name: String,
    /// Short name of the field's declared type (`List` for list fields).
    pub type_name: String,
    /// Element type for `List<T>` / `T[]` fields.
    pub element_type: Option<String>,
}

/// A surveyed type declaration.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// Canonical symbol ID.
    pub id: String,
    /// Declaration kind.
    pub kind: TypeKind,
    /// Short names of the base-list entries, in declaration order.
    pub bases: Vec<String>,
    /// Public fields declared on this type.
    pub fields: Vec<FieldInfo>,
}

/// A surveyed method declaration.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    /// Canonical symbol ID (with parameter list).
    pub id: String,
    /// Number of declared parameters.
    pub arity: usize,
}

/// The compilation index: every code declaration in the corpus, keyed for
/// short-name resolution.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use mimir_core::{ChunkLanguage, ChunkRecord};
/// use mimir_graph::extract::symbols::CompilationIndex;
///
/// let chunk = ChunkRecord {
///     id: "Verse.ThingComp".into(),
///     language: ChunkLanguage::Code,
///     text: "public class ThingComp { }".into(),
///     symbol_name: "ThingComp".into(),
///     def_type: None,
///     span_start: 0,
///     span_end: 26,
///     path: PathBuf::from("Source/ThingComp.cs"),
/// };
/// let index = CompilationIndex::build(&[chunk]);
/// assert_eq!(index.lookup("ThingComp"), &["Verse.ThingComp".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct CompilationIndex {
    /// Short name → every symbol ID carrying it (types and methods).
    by_short_name: HashMap<String, Vec<String>>,
    /// Type symbol ID → surveyed declaration.
    types: HashMap<String, TypeInfo>,
    /// Short names declared as interfaces anywhere in the corpus.
    interface_names: HashSet<String>,
    /// Method short name → surveyed overloads.
    methods_by_name: HashMap<String, Vec<MethodInfo>>,
}

impl CompilationIndex {
    /// Survey all code chunks.
    pub fn build(chunks: &[ChunkRecord]) -> Self {
        let mut index = Self::default();

        let mut parser = Parser::new();
        let have_grammar = parser
            .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
            .is_ok();

        for chunk in chunks {
            if chunk.language != ChunkLanguage::Code {
                continue;
            }

            index
                .by_short_name
                .entry(short_name_of(&chunk.id))
                .or_default()
                .push(chunk.id.clone());

            if let Some(open) = chunk.id.find('(') {
                let arity = method_arity(&chunk.id[open..]);
                index
                    .methods_by_name
                    .entry(chunk.symbol_name.clone())
                    .or_default()
                    .push(MethodInfo {
                        id: chunk.id.clone(),
                        arity,
                    });
                continue;
            }

            if !have_grammar {
                continue;
            }
            if let Some(info) = survey_type(&mut parser, chunk) {
                if info.kind == TypeKind::Interface {
                    index.interface_names.insert(short_name_of(&chunk.id));
                }
                index.types.insert(chunk.id.clone(), info);
            }
        }

        // Sorted candidate lists make "first candidate" deterministic
        for ids in index.by_short_name.values_mut() {
            ids.sort();
            ids.dedup();
        }
        for methods in index.methods_by_name.values_mut() {
            methods.sort_by(|a, b| a.id.cmp(&b.id));
        }

        index
    }

    /// All symbol IDs sharing a short name, sorted.
    pub fn lookup(&self, short_name: &str) -> &[String] {
        self.by_short_name
            .get(short_name)
            .map_or(&[], Vec::as_slice)
    }

    /// Symbol IDs whose dotted ID ends with `.<suffix>`.
    pub fn lookup_dotted_suffix(&self, suffix: &str) -> Vec<String> {
        let needle = format!(".{suffix}");
        let mut matches: Vec<String> = self
            .by_short_name
            .values()
            .flatten()
            .filter(|id| id.ends_with(&needle))
            .cloned()
            .collect();
        matches.sort();
        matches.dedup();
        matches
    }

    /// Surveyed info of a type symbol.
    pub fn type_info(&self, id: &str) -> Option<&TypeInfo> {
        self.types.get(id)
    }

    /// All surveyed types.
    pub fn types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.values()
    }

    /// True when the short name is declared as an interface somewhere.
    pub fn is_interface_name(&self, short_name: &str) -> bool {
        self.interface_names.contains(short_name)
    }

    /// Method overloads sharing a short name, sorted by ID.
    pub fn methods_named(&self, short_name: &str) -> &[MethodInfo] {
        self.methods_by_name
            .get(short_name)
            .map_or(&[], Vec::as_slice)
    }

    /// True when a short name transitively inherits one of `roots`,
    /// following base lists surveyed inside the corpus. The walk is by
    /// short name; ambiguity between same-named types is accepted.
    pub fn inherits_from(&self, short_name: &str, roots: &[String]) -> bool {
        let mut seen = HashSet::new();
        let mut frontier = vec![short_name.to_string()];

        while let Some(current) = frontier.pop() {
            if roots.iter().any(|root| *root == current) {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            for id in self.lookup(&current) {
                if let Some(info) = self.types.get(id) {
                    for base in &info.bases {
                        if !seen.contains(base) {
                            frontier.push(base.clone());
                        }
                    }
                }
            }
        }
        false
    }

    /// Public fields of a type, including fields inherited from corpus
    /// base types.
    pub fn fields_including_inherited(&self, id: &str) -> Vec<&FieldInfo> {
        let mut fields = Vec::new();
        let mut seen_types = HashSet::new();
        let mut frontier = vec![id.to_string()];

        while let Some(current) = frontier.pop() {
            if !seen_types.insert(current.clone()) {
                continue;
            }
            if let Some(info) = self.types.get(&current) {
                fields.extend(info.fields.iter());
                for base in &info.bases {
                    for base_id in self.lookup(base) {
                        frontier.push(base_id.clone());
                    }
                }
            }
        }
        fields
    }
}

/// Last dotted segment of a symbol ID, with any parameter list and generic
/// arity marker removed, so written references like `ThingOwner<T>` hit the
/// ``ThingOwner`1`` declaration.
pub fn short_name_of(id: &str) -> String {
    let without_params = match id.find('(') {
        Some(open) => &id[..open],
        None => id,
    };
    let segment = without_params.rsplit('.').next().unwrap_or(without_params);
    match segment.find('`') {
        Some(tick) => segment[..tick].to_string(),
        None => segment.to_string(),
    }
}

fn method_arity(params: &str) -> usize {
    let inner = params.trim_start_matches('(').trim_end_matches(')');
    if inner.trim().is_empty() {
        0
    } else {
        inner.split(',').count()
    }
}

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "struct_declaration",
    "enum_declaration",
    "record_declaration",
];

fn survey_type(parser: &mut Parser, chunk: &ChunkRecord) -> Option<TypeInfo> {
    let tree = parser.parse(&chunk.text, None)?;
    let source = chunk.text.as_bytes();
    let decl = find_first_declaration(tree.root_node())?;

    let kind = TypeKind::from_node_kind(decl.kind())?;
    let bases = base_short_names(&decl, source);
    let fields = public_fields(&decl, source);

    Some(TypeInfo {
        id: chunk.id.clone(),
        kind,
        bases,
        fields,
    })
}

fn find_first_declaration<'t>(node: Node<'t>) -> Option<Node<'t>> {
    if TYPE_DECLARATIONS.contains(&node.kind()) {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = find_first_declaration(child) {
            return Some(found);
        }
    }
    None
}

/// Short names mentioned in a declaration's base list.
pub(crate) fn base_short_names(decl: &Node, source: &[u8]) -> Vec<String> {
    let Some(base_list) = child_of_kind(decl, "base_list") else {
        return Vec::new();
    };
    let mut cursor = base_list.walk();
    base_list
        .children(&mut cursor)
        .filter(|c| c.is_named())
        .map(|c| type_short_name(&node_text(&c, source)))
        .filter(|name| !name.is_empty())
        .collect()
}

fn public_fields(decl: &Node, source: &[u8]) -> Vec<FieldInfo> {
    let mut fields = Vec::new();
    let Some(body) = decl.child_by_field_name("body") else {
        return fields;
    };

    let mut cursor = body.walk();
    for member in body.children(&mut cursor) {
        if member.kind() != "field_declaration" {
            continue;
        }
        if !has_public_modifier(&member, source) {
            continue;
        }
        let Some(var_decl) = child_of_kind(&member, "variable_declaration") else {
            continue;
        };
        let Some(type_node) = var_decl
            .child_by_field_name("type")
            .or_else(|| var_decl.named_child(0))
        else {
            continue;
        };
        let type_text = node_text(&type_node, source);
        let (type_name, element_type) = split_field_type(&type_text);

        let mut inner = var_decl.walk();
        for declarator in var_decl.children(&mut inner) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name_node) = declarator
                .child_by_field_name("name")
                .or_else(|| declarator.named_child(0))
            else {
                continue;
            };
            fields.push(FieldInfo {
                name: node_text(&name_node, source),
                type_name: type_name.clone(),
                element_type: element_type.clone(),
            });
        }
    }
    fields
}

fn has_public_modifier(node: &Node, source: &[u8]) -> bool {
    let mut cursor = node.walk();
    let result = node
        .children(&mut cursor)
        .filter(|c| c.kind() == "modifier")
        .any(|c| node_text(&c, source) == "public");
    result
}

/// Split a declared field type into its short name and, for list/array
/// types, the element short name.
fn split_field_type(type_text: &str) -> (String, Option<String>) {
    let compact: String = type_text.split_whitespace().collect();

    if let Some(element) = compact.strip_suffix("[]") {
        return (type_short_name(element), Some(type_short_name(element)));
    }

    if let Some(open) = compact.find('<') {
        let outer = type_short_name(&compact[..open]);
        let inner = compact[open + 1..].trim_end_matches('>');
        let first_arg = inner.split(',').next().unwrap_or(inner);
        return (outer, Some(type_short_name(first_arg)));
    }

    (type_short_name(&compact), None)
}

/// Short name of a written type reference: last dotted segment, generic
/// arguments stripped.
pub(crate) fn type_short_name(written: &str) -> String {
    let compact: String = written.split_whitespace().collect();
    let without_generics = match compact.find('<') {
        Some(open) => &compact[..open],
        None => compact.as_str(),
    };
    without_generics
        .rsplit('.')
        .next()
        .unwrap_or(without_generics)
        .trim_end_matches("[]")
        .to_string()
}

pub(crate) fn node_text(node: &Node, source: &[u8]) -> String {
    let start = node.start_byte();
    let end = node.end_byte();
    if start >= source.len() || end > source.len() {
        return String::new();
    }
    String::from_utf8_lossy(&source[start..end]).to_string()
}

pub(crate) fn child_of_kind<'t>(node: &Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).find(|c| c.kind() == kind);
    result
}
