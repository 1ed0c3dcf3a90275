//! Discovery of linkable XML field names from the Def type schema.
//!
//! A field is linkable when its value in XML names a code class. The set
//! is discovered from the surveyed Def hierarchy and merged with a seed of
//! well-known names to backstop incomplete analysis.

use std::collections::HashSet;

use mimir_core::IndexConfig;

use crate::extract::symbols::{short_name_of, CompilationIndex};

/// Well-known linkable field names in the stock Def schema.
const SEED_FIELDS: &[&str] = &[
    "thingClass",
    "compClass",
    "workerClass",
    "driverClass",
    "verbClass",
    "graphicClass",
    "hediffClass",
    "moteClass",
];

/// Compute the linkable-field set: the seed, any configured additions,
/// and every public field on a Def-derived type whose type (or list
/// element type) descends from a configured linkable base.
///
/// Reflection-typed fields (`Type thingClass`) are always linkable; the
/// declared type says nothing about what they may name.
///
/// # Examples
///
/// ```
/// use mimir_core::IndexConfig;
/// use mimir_graph::extract::fields::discover_linkable_fields;
/// use mimir_graph::extract::symbols::CompilationIndex;
///
/// let index = CompilationIndex::build(&[]);
/// let fields = discover_linkable_fields(&index, &IndexConfig::default());
/// assert!(fields.contains("thingClass"));
/// ```
pub fn discover_linkable_fields(
    index: &CompilationIndex,
    config: &IndexConfig,
) -> HashSet<String> {
    let mut fields: HashSet<String> = SEED_FIELDS.iter().map(|f| (*f).to_string()).collect();
    fields.extend(config.linkable_fields.iter().cloned());

    let def_roots = vec![config.def_base_type.clone()];

    for type_info in index.types() {
        let short = short_name_of(&type_info.id);
        if !index.inherits_from(&short, &def_roots) {
            continue;
        }

        for field in index.fields_including_inherited(&type_info.id) {
            let linkable = field.type_name == "Type"
                || index.inherits_from(&field.type_name, &config.linkable_base_types)
                || field
                    .element_type
                    .as_deref()
                    .is_some_and(|elem| index.inherits_from(elem, &config.linkable_base_types));
            if linkable {
                fields.insert(field.name.clone());
            }
        }
    }

    fields
}
