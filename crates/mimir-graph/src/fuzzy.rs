//! Score-based fallback resolution for references that miss the node table.
//!
//! The weights and the part-split character class are tuned constants, not
//! a contract; they are grouped here so calibration against a corpus only
//! touches one place.

use strsim::jaro_winkler;

/// Weight of whole-string Jaro–Winkler similarity.
const SIMILARITY_WEIGHT: f64 = 0.3;
/// Weight of query-part coverage over the candidate key length.
const COVERAGE_WEIGHT: f64 = 0.3;
/// Weight of exact part matches between query and key segments.
const EXACT_PART_WEIGHT: f64 = 0.4;

/// Characters that separate a reference into parts.
const PART_SEPARATORS: &[char] = &[':', '.', ' ', '<', '-', '>'];

/// Resolve a reference against the node table by similarity scoring.
///
/// `xml:`-prefixed references short-circuit to the first key with that
/// prefix. Otherwise the reference is split into parts and only keys
/// containing every part (case-insensitively) are scored; the best-scoring
/// key wins. Returns `None` when no key passes the all-parts filter.
///
/// # Examples
///
/// ```
/// use mimir_graph::fuzzy::fuzzy_resolve;
///
/// let keys = ["Verse.Pawn.Tick()", "RimWorld.CompExplosive", "xml:ThingDef:Steel"];
/// let hit = fuzzy_resolve("pawn tick", keys.iter().map(|k| *k));
/// assert_eq!(hit, Some("Verse.Pawn.Tick()"));
///
/// let hit = fuzzy_resolve("xml:ThingDef", keys.iter().map(|k| *k));
/// assert_eq!(hit, Some("xml:ThingDef:Steel"));
///
/// let miss = fuzzy_resolve("nonexistent", keys.iter().map(|k| *k));
/// assert_eq!(miss, None);
/// ```
pub fn fuzzy_resolve<'a>(
    reference: &str,
    keys: impl Iterator<Item = &'a str>,
) -> Option<&'a str> {
    if reference.starts_with("xml:") {
        let mut keys = keys;
        return keys.find(|key| key.starts_with(reference));
    }

    let reference_lower = reference.to_lowercase();
    let query_parts = split_parts(&reference_lower);
    if query_parts.is_empty() {
        return None;
    }

    let mut best: Option<(&'a str, f64)> = None;
    for key in keys {
        let key_lower = key.to_lowercase();
        if !query_parts.iter().all(|part| key_lower.contains(part)) {
            continue;
        }

        let score = score_candidate(&reference_lower, &query_parts, &key_lower);
        let better = match best {
            None => true,
            Some((_, best_score)) => score > best_score,
        };
        if better {
            best = Some((key, score));
        }
    }

    best.map(|(key, _)| key)
}

fn score_candidate(reference_lower: &str, query_parts: &[String], key_lower: &str) -> f64 {
    let similarity = jaro_winkler(reference_lower, key_lower) * SIMILARITY_WEIGHT;

    let covered: usize = query_parts.iter().map(String::len).sum();
    let coverage = (covered as f64 / key_lower.len() as f64).min(1.0) * COVERAGE_WEIGHT;

    let key_parts = split_parts(key_lower);
    let exact_matches = query_parts
        .iter()
        .filter(|part| key_parts.iter().any(|kp| kp == *part))
        .count();
    let exactness = (exact_matches as f64 / query_parts.len() as f64) * EXACT_PART_WEIGHT;

    similarity + coverage + exactness
}

fn split_parts(text: &str) -> Vec<String> {
    text.split(PART_SEPARATORS)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
