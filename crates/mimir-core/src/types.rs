use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which symbol universe a chunk belongs to.
///
/// # Examples
///
/// ```
/// use mimir_core::ChunkLanguage;
///
/// let lang = ChunkLanguage::Code;
/// assert_eq!(format!("{lang}"), "code");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkLanguage {
    /// C# source code (classes, methods).
    Code,
    /// Declarative XML data definitions (Defs).
    Xml,
}

impl fmt::Display for ChunkLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkLanguage::Code => write!(f, "code"),
            ChunkLanguage::Xml => write!(f, "xml"),
        }
    }
}

/// A named, spanned unit of source extracted by the chunker.
///
/// The `id` is the canonical symbol ID: `Namespace.Type[.Member(Params)]`
/// for code, `xml:<DefType>:<DefName>` for Defs. Span offsets are byte
/// offsets in the enclosing source file.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use mimir_core::{ChunkLanguage, ChunkRecord};
///
/// let chunk = ChunkRecord {
///     id: "Verse.Pawn.Tick()".into(),
///     language: ChunkLanguage::Code,
///     text: "public void Tick() { }".into(),
///     symbol_name: "Tick".into(),
///     def_type: None,
///     span_start: 120,
///     span_end: 142,
///     path: PathBuf::from("Source/Pawn.cs"),
/// };
/// assert_eq!(chunk.symbol_name, "Tick");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRecord {
    /// Canonical symbol ID, globally unique across the corpus.
    pub id: String,
    /// Symbol universe of this chunk.
    pub language: ChunkLanguage,
    /// Raw source of the unit.
    pub text: String,
    /// Short name (class, method, or defName).
    pub symbol_name: String,
    /// For XML chunks: the Def category (e.g. `ThingDef`, `RecipeDef`).
    pub def_type: Option<String>,
    /// Byte offset of the unit inside its source file.
    pub span_start: usize,
    /// End byte offset of the unit inside its source file.
    pub span_end: usize,
    /// Source file path relative to the corpus root.
    pub path: PathBuf,
}

impl ChunkRecord {
    /// Returns true when this chunk describes an XML Def.
    pub fn is_xml(&self) -> bool {
        self.language == ChunkLanguage::Xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_display_is_lowercase() {
        assert_eq!(ChunkLanguage::Code.to_string(), "code");
        assert_eq!(ChunkLanguage::Xml.to_string(), "xml");
    }

    #[test]
    fn chunk_record_serializes_camel_case() {
        let chunk = ChunkRecord {
            id: "xml:ThingDef:Steel".into(),
            language: ChunkLanguage::Xml,
            text: "<ThingDef><defName>Steel</defName></ThingDef>".into(),
            symbol_name: "Steel".into(),
            def_type: Some("ThingDef".into()),
            span_start: 0,
            span_end: 45,
            path: PathBuf::from("Defs/Things.xml"),
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["defType"], "ThingDef");
        assert_eq!(json["spanStart"], 0);
        assert!(chunk.is_xml());
    }
}
