//! Query-time resolution of user references to canonical symbol IDs.

use crate::fuzzy::fuzzy_resolve;
use crate::loader::GraphStore;

/// Resolve a user-supplied reference to a canonical symbol ID.
///
/// Accepts `#<n>` node-index references, exact node-table keys, and falls
/// back to fuzzy resolution. Returns `None` when nothing matches.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use mimir_graph::loader::GraphStore;
/// use mimir_graph::resolve::resolve_reference;
///
/// let store = GraphStore::load(Path::new(".mimir/graph")).unwrap();
/// let id = resolve_reference(&store, "#0");
/// assert_eq!(id.as_deref(), store.symbol_id(0));
/// ```
pub fn resolve_reference(store: &GraphStore, reference: &str) -> Option<String> {
    if let Some(rest) = reference.strip_prefix('#') {
        if let Ok(idx) = rest.parse::<u32>() {
            return store.symbol_id(idx).map(str::to_string);
        }
    }

    if store.node_index(reference).is_some() {
        return Some(reference.to_string());
    }

    fuzzy_resolve(reference, store.symbol_ids().iter().map(String::as_str))
        .map(str::to_string)
}
