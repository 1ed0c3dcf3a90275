//! Phases 2 and 3: edges extracted from XML Def chunks.
//!
//! Phase 2 turns linkable-field values into `XmlBindsClass` edges (and
//! `comps/li[@Class]` attributes into `XmlUsesComp`), normalising bare
//! class names through the configured namespace table. Phase 3 extracts
//! Def-to-Def structure: `ParentName` inheritance and a small set of
//! per-Def-kind references. Phase-3 targets are emitted first and filtered
//! against the known Def set afterwards.

use std::collections::HashSet;

use mimir_core::{ChunkRecord, NamespaceRule};

use crate::edge::{Edge, EdgeKind};

/// Class-name prefixes accepted by the PascalCase heuristic.
const CLASS_PREFIXES: &[&str] = &[
    "Comp",
    "CompProperties",
    "Verb",
    "Graphic",
    "Building",
    "Hediff",
    "Ingestible",
    "Projectile",
    "JobDriver",
    "Mote",
];

/// Class-name suffixes accepted by the PascalCase heuristic.
const CLASS_SUFFIXES: &[&str] = &["Worker", "Driver", "Effect", "Extension", "Utility"];

/// Namespace-normalisation settings shared by the phase-2 extractor.
pub struct ClassBinding<'a> {
    /// Tag names whose text content names a class.
    pub linkable_fields: &'a HashSet<String>,
    /// Prefix rules, first match wins.
    pub namespace_rules: &'a [NamespaceRule],
    /// Namespace when no rule matches.
    pub default_namespace: &'a str,
}

impl ClassBinding<'_> {
    /// Qualify a bare class name through the namespace table. Dotted
    /// names are already qualified and pass through unchanged.
    pub fn qualify(&self, class_name: &str) -> String {
        if class_name.contains('.') {
            return class_name.to_string();
        }
        for rule in self.namespace_rules {
            if class_name.starts_with(rule.prefix.as_str()) {
                return format!("{}.{class_name}", rule.namespace);
            }
        }
        format!("{}.{class_name}", self.default_namespace)
    }
}

/// Phase 2: xml → code edges from one Def chunk.
///
/// Unparseable chunks are logged and yield no edges.
pub fn extract_class_bindings(chunk: &ChunkRecord, binding: &ClassBinding<'_>) -> Vec<Edge> {
    let doc = match roxmltree::Document::parse(&chunk.text) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!(chunk = %chunk.id, error = %e, "skipping unparseable XML chunk");
            return Vec::new();
        }
    };

    let mut edges = Vec::new();
    for element in doc.root_element().descendants().filter(|n| n.is_element()) {
        let tag = element.tag_name().name();

        if binding.linkable_fields.contains(tag) {
            if let Some(value) = element.text().map(str::trim).filter(|t| !t.is_empty()) {
                if is_class_name(value) {
                    edges.push(Edge::new(
                        chunk.id.clone(),
                        binding.qualify(value),
                        EdgeKind::XmlBindsClass,
                    ));
                }
            }
        }

        // <comps><li Class="CompProperties_Explosive"> names the concrete
        // component type on the list item itself
        if tag == "li" {
            let in_comps = element
                .parent_element()
                .is_some_and(|p| p.tag_name().name() == "comps");
            if in_comps {
                if let Some(class_attr) = element.attribute("Class").map(str::trim) {
                    if is_class_name(class_attr) {
                        edges.push(Edge::new(
                            chunk.id.clone(),
                            binding.qualify(class_attr),
                            EdgeKind::XmlUsesComp,
                        ));
                    }
                }
            }
        }
    }

    edges
}

/// Does this field value plausibly name a class?
///
/// Rejects numbers, booleans, and anything with whitespace or markup;
/// accepts dotted names, known prefixes/suffixes, and PascalCase
/// identifiers of length ≥ 3.
pub fn is_class_name(value: &str) -> bool {
    if value.is_empty()
        || value.chars().any(|c| c.is_whitespace() || c == '<' || c == '>')
        || value.parse::<f64>().is_ok()
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("false")
    {
        return false;
    }

    let first = match value.chars().next() {
        Some(c) => c,
        None => return false,
    };
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }

    if value.contains('.') {
        return true;
    }
    if !value.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return false;
    }

    CLASS_PREFIXES.iter().any(|p| value.starts_with(p))
        || CLASS_SUFFIXES.iter().any(|s| value.ends_with(s))
        || (value.len() >= 3
            && first.is_uppercase()
            && value.chars().any(|c| c.is_lowercase()))
}

/// Phase 3: xml → xml edges from one Def chunk, unfiltered.
///
/// Emits `XmlInherits` for `ParentName` and `XmlReferences` for the
/// per-Def-kind structural fields. Targets are short Def names prefixed
/// `xml:`; unknown ones are removed later by [`KnownDefs::retain_known`].
pub fn extract_def_references(chunk: &ChunkRecord) -> Vec<Edge> {
    let doc = match roxmltree::Document::parse(&chunk.text) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!(chunk = %chunk.id, error = %e, "skipping unparseable XML chunk");
            return Vec::new();
        }
    };
    let root = doc.root_element();

    let mut edges = Vec::new();
    let mut emit = |value: &str, kind: EdgeKind| {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let target = format!("xml:{value}");
        if target == chunk.id {
            return;
        }
        edges.push(Edge::new(chunk.id.clone(), target, kind));
    };

    let parent = root
        .attribute("ParentName")
        .map(str::to_string)
        .or_else(|| child_text(&root, "ParentName"));
    if let Some(parent) = parent {
        emit(&parent, EdgeKind::XmlInherits);
    }

    match chunk.def_type.as_deref() {
        Some("RecipeDef") => {
            // Product entries are keyed by Def name: <products><Steel>3</Steel>
            if let Some(products) = child_element(&root, "products") {
                for product in products.children().filter(|n| n.is_element()) {
                    emit(product.tag_name().name(), EdgeKind::XmlReferences);
                }
            }
            if let Some(ingredients) = child_element(&root, "ingredients") {
                for thing_defs in ingredients
                    .descendants()
                    .filter(|n| n.is_element() && n.tag_name().name() == "thingDefs")
                {
                    for entry in thing_defs.children().filter(|n| n.is_element()) {
                        if let Some(text) = entry.text() {
                            emit(text, EdgeKind::XmlReferences);
                        }
                    }
                }
            }
        }
        Some("PawnKindDef") => {
            if let Some(race) = child_text(&root, "race") {
                emit(&race, EdgeKind::XmlReferences);
            }
        }
        Some("ResearchProjectDef") => {
            if let Some(prerequisites) = child_element(&root, "prerequisites") {
                for li in prerequisites.children().filter(|n| n.is_element()) {
                    if let Some(text) = li.text() {
                        emit(text, EdgeKind::XmlReferences);
                    }
                }
            }
        }
        Some("ThingDef") => {
            if let Some(cost_list) = child_element(&root, "costList") {
                for cost in cost_list.children().filter(|n| n.is_element()) {
                    emit(cost.tag_name().name(), EdgeKind::XmlReferences);
                }
            }
        }
        _ => {}
    }

    edges
}

fn child_element<'a, 'd>(
    node: &roxmltree::Node<'a, 'd>,
    tag: &str,
) -> Option<roxmltree::Node<'a, 'd>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
}

fn child_text(node: &roxmltree::Node<'_, '_>, tag: &str) -> Option<String> {
    child_element(node, tag)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// The set of Defs known to this build, for filtering phase-3 targets.
///
/// Matchers accept either ID form, so a target `xml:<value>` survives when
/// it is a known full ID or when `<value>` is a known short Def name.
#[derive(Debug, Default)]
pub struct KnownDefs {
    ids: HashSet<String>,
    short_names: HashSet<String>,
}

impl KnownDefs {
    /// Collect the known Def IDs and short names from the chunk list.
    pub fn from_chunks(chunks: &[ChunkRecord]) -> Self {
        let mut known = Self::default();
        for chunk in chunks.iter().filter(|c| c.is_xml()) {
            known.ids.insert(chunk.id.clone());
            known.short_names.insert(chunk.symbol_name.clone());
        }
        known
    }

    /// Is this `xml:`-prefixed target a Def this build knows about?
    pub fn contains(&self, target: &str) -> bool {
        if self.ids.contains(target) {
            return true;
        }
        target
            .strip_prefix("xml:")
            .is_some_and(|value| self.short_names.contains(value))
    }

    /// Drop edges whose target is neither a known `xml:` ID nor a known
    /// short Def name.
    pub fn retain_known(&self, edges: Vec<Edge>) -> Vec<Edge> {
        edges
            .into_iter()
            .filter(|edge| self.contains(&edge.target))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimir_core::{ChunkLanguage, IndexConfig};
    use std::path::PathBuf;

    fn xml_chunk(def_type: &str, def_name: &str, text: &str) -> ChunkRecord {
        ChunkRecord {
            id: format!("xml:{def_type}:{def_name}"),
            language: ChunkLanguage::Xml,
            text: text.into(),
            symbol_name: def_name.into(),
            def_type: Some(def_type.into()),
            span_start: 0,
            span_end: text.len(),
            path: PathBuf::from("Defs/Test.xml"),
        }
    }

    fn binding<'a>(
        linkable: &'a HashSet<String>,
        config: &'a IndexConfig,
    ) -> ClassBinding<'a> {
        ClassBinding {
            linkable_fields: linkable,
            namespace_rules: &config.namespace_rules,
            default_namespace: &config.default_namespace,
        }
    }

    fn default_linkable() -> HashSet<String> {
        ["thingClass", "compClass", "workerClass"]
            .iter()
            .map(|s| (*s).to_string())
            .collect()
    }

    #[test]
    fn linkable_field_emits_binds_class() {
        let config = IndexConfig::default();
        let linkable = default_linkable();
        let chunk = xml_chunk(
            "ThingDef",
            "Mortar",
            "<ThingDef><defName>Mortar</defName><thingClass>Building_Mortar</thingClass></ThingDef>",
        );
        let edges = extract_class_bindings(&chunk, &binding(&linkable, &config));
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, EdgeKind::XmlBindsClass);
        // Bare name qualified through the default namespace
        assert_eq!(edges[0].target, "RimWorld.Building_Mortar");
    }

    #[test]
    fn namespace_rules_apply_in_order() {
        let config = IndexConfig::default();
        let linkable: HashSet<String> = ["verbClass", "compClass", "hediffClass"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        let chunk = xml_chunk(
            "ThingDef",
            "Gun",
            r#"<ThingDef>
  <defName>Gun</defName>
  <verbClass>Verb_Shoot</verbClass>
  <compClass>CompProperties_Explosive</compClass>
  <hediffClass>HediffWithComps</hediffClass>
</ThingDef>"#,
        );
        let edges = extract_class_bindings(&chunk, &binding(&linkable, &config));
        let targets: Vec<&str> = edges.iter().map(|e| e.target.as_str()).collect();
        assert!(targets.contains(&"Verse.Verb_Shoot"), "targets: {targets:?}");
        assert!(
            targets.contains(&"RimWorld.CompProperties_Explosive"),
            "targets: {targets:?}"
        );
        assert!(targets.contains(&"Verse.HediffWithComps"), "targets: {targets:?}");
    }

    #[test]
    fn dotted_names_pass_through_unqualified() {
        let config = IndexConfig::default();
        let linkable = default_linkable();
        let chunk = xml_chunk(
            "ThingDef",
            "Turret",
            "<ThingDef><thingClass>MyMod.Turrets.Building_Laser</thingClass></ThingDef>",
        );
        let edges = extract_class_bindings(&chunk, &binding(&linkable, &config));
        assert_eq!(edges[0].target, "MyMod.Turrets.Building_Laser");
    }

    #[test]
    fn nested_linkable_fields_are_found() {
        let config = IndexConfig::default();
        let linkable = default_linkable();
        let chunk = xml_chunk(
            "ThingDef",
            "Apparel",
            r#"<ThingDef>
  <apparel>
    <stuff><workerClass>StatWorker_Armor</workerClass></stuff>
  </apparel>
</ThingDef>"#,
        );
        let edges = extract_class_bindings(&chunk, &binding(&linkable, &config));
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target, "RimWorld.StatWorker_Armor");
    }

    #[test]
    fn comps_li_class_attribute_emits_uses_comp() {
        let config = IndexConfig::default();
        let linkable = default_linkable();
        let chunk = xml_chunk(
            "ThingDef",
            "Shell",
            r#"<ThingDef>
  <comps>
    <li Class="CompProperties_Explosive">
      <explosiveRadius>1.9</explosiveRadius>
    </li>
  </comps>
</ThingDef>"#,
        );
        let edges = extract_class_bindings(&chunk, &binding(&linkable, &config));
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, EdgeKind::XmlUsesComp);
        assert_eq!(edges[0].target, "RimWorld.CompProperties_Explosive");
    }

    #[test]
    fn non_class_values_are_rejected() {
        assert!(!is_class_name("3.5"));
        assert!(!is_class_name("12"));
        assert!(!is_class_name("true"));
        assert!(!is_class_name("False"));
        assert!(!is_class_name("two words"));
        assert!(!is_class_name("<markup>"));
        assert!(!is_class_name("9Lives"));
        assert!(!is_class_name(""));

        assert!(is_class_name("Building_Mortar"));
        assert!(is_class_name("MyMod.Widgets.Turret"));
        assert!(is_class_name("CompQuality"));
        assert!(is_class_name("StatWorker"));
    }

    #[test]
    fn parent_name_attribute_emits_xml_inherits() {
        let chunk = xml_chunk(
            "ThingDef",
            "MedKit",
            r#"<ThingDef ParentName="ResourceBase"><defName>MedKit</defName></ThingDef>"#,
        );
        let edges = extract_def_references(&chunk);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, EdgeKind::XmlInherits);
        assert_eq!(edges[0].target, "xml:ResourceBase");
    }

    #[test]
    fn parent_name_child_element_also_works() {
        let chunk = xml_chunk(
            "ThingDef",
            "MedKit",
            "<ThingDef><ParentName>ResourceBase</ParentName></ThingDef>",
        );
        let edges = extract_def_references(&chunk);
        assert_eq!(edges[0].target, "xml:ResourceBase");
    }

    #[test]
    fn recipe_products_and_ingredients_are_referenced() {
        let chunk = xml_chunk(
            "RecipeDef",
            "SmeltSteel",
            r#"<RecipeDef>
  <defName>SmeltSteel</defName>
  <products><Steel>10</Steel></products>
  <ingredients>
    <li>
      <filter><thingDefs><li>ChunkSlag</li></thingDefs></filter>
    </li>
  </ingredients>
</RecipeDef>"#,
        );
        let edges = extract_def_references(&chunk);
        let targets: Vec<&str> = edges.iter().map(|e| e.target.as_str()).collect();
        assert!(targets.contains(&"xml:Steel"), "targets: {targets:?}");
        assert!(targets.contains(&"xml:ChunkSlag"), "targets: {targets:?}");
        assert!(edges.iter().all(|e| e.kind == EdgeKind::XmlReferences));
    }

    #[test]
    fn pawnkind_race_and_research_prerequisites() {
        let kind = xml_chunk(
            "PawnKindDef",
            "Colonist",
            "<PawnKindDef><race>Human</race></PawnKindDef>",
        );
        assert_eq!(extract_def_references(&kind)[0].target, "xml:Human");

        let research = xml_chunk(
            "ResearchProjectDef",
            "GunTurrets",
            "<ResearchProjectDef><prerequisites><li>Gunsmithing</li></prerequisites></ResearchProjectDef>",
        );
        assert_eq!(extract_def_references(&research)[0].target, "xml:Gunsmithing");
    }

    #[test]
    fn thingdef_cost_list_entries_are_referenced() {
        let chunk = xml_chunk(
            "ThingDef",
            "Wall",
            "<ThingDef><costList><Steel>5</Steel><WoodLog>2</WoodLog></costList></ThingDef>",
        );
        let edges = extract_def_references(&chunk);
        let targets: Vec<&str> = edges.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["xml:Steel", "xml:WoodLog"]);
    }

    #[test]
    fn unknown_def_targets_are_filtered_after_emission() {
        let steel = xml_chunk(
            "ThingDef",
            "Steel",
            "<ThingDef><defName>Steel</defName></ThingDef>",
        );
        let wall = xml_chunk(
            "ThingDef",
            "Wall",
            "<ThingDef><costList><Steel>5</Steel><Unobtainium>1</Unobtainium></costList></ThingDef>",
        );
        let known = KnownDefs::from_chunks(&[steel, wall.clone()]);

        let edges = extract_def_references(&wall);
        assert_eq!(edges.len(), 2);
        let kept = known.retain_known(edges);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].target, "xml:Steel");
    }

    #[test]
    fn known_defs_accept_both_id_forms() {
        let steel = xml_chunk("ThingDef", "Steel", "<ThingDef/>");
        let known = KnownDefs::from_chunks(&[steel]);
        assert!(known.contains("xml:Steel"));
        assert!(known.contains("xml:ThingDef:Steel"));
        assert!(!known.contains("xml:Plasteel"));
    }
}
