use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MimirError;

/// Top-level configuration loaded from `.mimir.toml`.
///
/// # Examples
///
/// ```
/// use mimir_core::MimirConfig;
///
/// let config = MimirConfig::default();
/// assert_eq!(config.index.default_namespace, "RimWorld");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MimirConfig {
    /// Graph and corpus indexing settings.
    #[serde(default)]
    pub index: IndexConfig,
    /// Embedding provider settings for the lexical index.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl MimirConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::Io`] if the file cannot be read, or
    /// [`MimirError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mimir_core::MimirConfig;
    /// use std::path::Path;
    ///
    /// let config = MimirConfig::from_file(Path::new(".mimir.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, MimirError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use mimir_core::MimirConfig;
    ///
    /// let toml = r#"
    /// [index]
    /// parallelism = 4
    /// "#;
    /// let config = MimirConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.index.parallelism, 4);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, MimirError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Mode used by the code→code edge extractor.
///
/// # Examples
///
/// ```
/// use mimir_core::ResolutionMode;
///
/// assert_eq!(ResolutionMode::default(), ResolutionMode::Resolved);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// Build a corpus-wide compilation index first and resolve references
    /// against declarations (interface detection, overload choice).
    #[default]
    Resolved,
    /// Parse each chunk in isolation and resolve by short name only.
    Syntactic,
}

/// A namespace-inference rule for bare class names found in XML.
///
/// Rules are checked in order; the first whose prefix matches wins.
///
/// # Examples
///
/// ```
/// use mimir_core::NamespaceRule;
///
/// let rule = NamespaceRule {
///     prefix: "CompProperties_".into(),
///     namespace: "RimWorld".into(),
/// };
/// assert!("CompProperties_Explosive".starts_with(&rule.prefix));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceRule {
    /// Class-name prefix to match.
    pub prefix: String,
    /// Namespace to qualify matching names with.
    pub namespace: String,
}

/// Graph and corpus indexing configuration.
///
/// The namespace table and linkable-field additions exist because the
/// XML-to-code binding rules are corpus-specific heuristics; ship defaults
/// for the stock Def schema and let mod authors override.
///
/// # Examples
///
/// ```
/// use mimir_core::IndexConfig;
///
/// let config = IndexConfig::default();
/// assert_eq!(config.parallelism, 0);
/// assert!(config.linkable_base_types.contains(&"Thing".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Worker threads for the extraction phases (0 = one per core).
    #[serde(default)]
    pub parallelism: usize,
    /// Reference-resolution mode for code chunks.
    #[serde(default)]
    pub resolution: ResolutionMode,
    /// Extra linkable XML field names merged with the built-in seed set.
    #[serde(default)]
    pub linkable_fields: Vec<String>,
    /// Base types whose descendants make a Def field linkable.
    #[serde(default = "default_linkable_base_types")]
    pub linkable_base_types: Vec<String>,
    /// Root of the Def type hierarchy.
    #[serde(default = "default_def_base_type")]
    pub def_base_type: String,
    /// Namespace-inference rules applied to bare class names, in order.
    #[serde(default = "default_namespace_rules")]
    pub namespace_rules: Vec<NamespaceRule>,
    /// Namespace used when no rule matches.
    #[serde(default = "default_namespace")]
    pub default_namespace: String,
}

fn default_linkable_base_types() -> Vec<String> {
    ["Thing", "ThingComp", "CompProperties", "Verb", "Graphic", "Hediff", "Worker"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn default_def_base_type() -> String {
    "Def".into()
}

fn default_namespace_rules() -> Vec<NamespaceRule> {
    let rules = [
        ("CompProperties_", "RimWorld"),
        ("Verb_", "Verse"),
        ("Graphic_", "Verse"),
        ("Hediff", "Verse"),
    ];
    rules
        .iter()
        .map(|(prefix, namespace)| NamespaceRule {
            prefix: (*prefix).to_string(),
            namespace: (*namespace).to_string(),
        })
        .collect()
}

fn default_namespace() -> String {
    "RimWorld".into()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            parallelism: 0,
            resolution: ResolutionMode::default(),
            linkable_fields: Vec::new(),
            linkable_base_types: default_linkable_base_types(),
            def_base_type: default_def_base_type(),
            namespace_rules: default_namespace_rules(),
            default_namespace: default_namespace(),
        }
    }
}

/// Configuration for the embedding provider used by the lexical index.
///
/// # Examples
///
/// ```
/// use mimir_core::EmbeddingConfig;
///
/// let config = EmbeddingConfig::default();
/// assert_eq!(config.provider, "voyage");
/// assert_eq!(config.dimensions, 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding provider (default: `"voyage"`).
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    /// API key for the embedding provider.
    pub api_key: Option<String>,
    /// Model name (default: `"voyage-code-3"`).
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Embedding dimensions (default: 1024).
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
}

fn default_embedding_provider() -> String {
    "voyage".into()
}

fn default_embedding_model() -> String {
    "voyage-code-3".into()
}

fn default_embedding_dimensions() -> usize {
    1024
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
        }
    }
}
