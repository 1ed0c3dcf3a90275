use std::fs;
use std::path::Path;

use rmcp::{handler::server::wrapper::Parameters, model::*, ServerHandler};

use mimir_core::IndexConfig;
use mimir_lexical::LexicalStore;
use mimir_mcp::tools::{GetItemParams, GraphQueryParams, MimirServer, GRAPH_BASE, INDEX_DIR, LEXICAL_DB};

/// Write a small corpus to disk, index it, and return a server over it.
fn indexed_server() -> (tempfile::TempDir, MimirServer) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join("Source")).unwrap();
    fs::create_dir_all(root.join("Defs")).unwrap();
    fs::write(
        root.join("Source/Buildings.cs"),
        r#"
namespace RimWorld
{
    public class Building : ThingWithComps
    {
        public virtual void SpawnSetup() { }
    }

    public class Building_Mortar : Building
    {
        public void Fire() { SpawnSetup(); }
    }
}
"#,
    )
    .unwrap();
    fs::write(
        root.join("Source/Things.cs"),
        "namespace Verse { public class ThingWithComps { } }",
    )
    .unwrap();
    fs::write(
        root.join("Defs/Buildings.xml"),
        r#"<Defs>
  <ThingDef>
    <defName>Turret_Mortar</defName>
    <thingClass>Building_Mortar</thingClass>
  </ThingDef>
</Defs>"#,
    )
    .unwrap();

    index_corpus(root);
    let server = MimirServer::new(root.to_path_buf());
    (dir, server)
}

fn index_corpus(root: &Path) {
    let chunks = mimir_corpus::chunk_dir(root).unwrap();
    assert!(!chunks.is_empty());

    let index_dir = root.join(INDEX_DIR);
    let store = LexicalStore::open(&index_dir.join(LEXICAL_DB)).unwrap();
    store.insert_chunks(&chunks).unwrap();

    mimir_graph::build_artifacts(&chunks, &IndexConfig::default(), &index_dir.join(GRAPH_BASE))
        .unwrap();
}

fn extract_text(result: &CallToolResult) -> &str {
    match &result.content[0].raw {
        RawContent::Text(t) => &t.text,
        _ => panic!("expected text content"),
    }
}

fn parse(result: &CallToolResult) -> serde_json::Value {
    serde_json::from_str(extract_text(result)).unwrap()
}

#[test]
fn server_info_lists_the_three_tools() {
    let (_dir, server) = indexed_server();
    let info = server.get_info();

    assert_eq!(info.server_info.name, "mimir");
    assert_eq!(info.server_info.version, "0.2.0");
    let instructions = info.instructions.unwrap();
    assert!(instructions.contains("get_item"));
    assert!(instructions.contains("get_uses"));
    assert!(instructions.contains("get_used_by"));
}

#[test]
fn get_item_returns_source_and_metadata() {
    let (_dir, server) = indexed_server();
    let params = Parameters(GetItemParams {
        symbol: "RimWorld.Building_Mortar".to_string(),
        max_lines: None,
    });
    let result = server.get_item(params).unwrap();
    let parsed = parse(&result);

    assert_eq!(parsed["symbol"], "RimWorld.Building_Mortar");
    assert_eq!(parsed["language"], "code");
    assert!(parsed["source"]
        .as_str()
        .unwrap()
        .contains("class Building_Mortar"));
    assert_eq!(parsed["truncated"], false);
}

#[test]
fn get_item_truncates_long_sources() {
    let (_dir, server) = indexed_server();
    let params = Parameters(GetItemParams {
        symbol: "RimWorld.Building_Mortar".to_string(),
        max_lines: Some(1),
    });
    let result = server.get_item(params).unwrap();
    let parsed = parse(&result);
    assert_eq!(parsed["truncated"], true);
    assert_eq!(parsed["source"].as_str().unwrap().lines().count(), 1);
}

#[test]
fn get_item_resolves_xml_and_node_references() {
    let (_dir, server) = indexed_server();

    let by_def = Parameters(GetItemParams {
        symbol: "xml:ThingDef:Turret_Mortar".to_string(),
        max_lines: None,
    });
    let parsed = parse(&server.get_item(by_def).unwrap());
    assert_eq!(parsed["defType"], "ThingDef");
    assert_eq!(parsed["language"], "xml");

    let by_node = Parameters(GetItemParams {
        symbol: "#0".to_string(),
        max_lines: None,
    });
    let parsed = parse(&server.get_item(by_node).unwrap());
    assert!(parsed["symbol"].as_str().is_some());
}

#[test]
fn get_used_by_sees_def_bindings() {
    let (_dir, server) = indexed_server();
    let params = Parameters(GraphQueryParams {
        symbol: "RimWorld.Building_Mortar".to_string(),
        kind: None,
        page: None,
        page_size: None,
    });
    let result = server.get_used_by(params).unwrap();
    let parsed = parse(&result);

    assert_eq!(parsed["resolved"], "RimWorld.Building_Mortar");
    let results = parsed["results"].as_array().unwrap();
    assert!(results
        .iter()
        .any(|r| r["symbol"] == "xml:ThingDef:Turret_Mortar"
            && r["edgeKind"] == "XmlBindsClass"));
}

#[test]
fn get_uses_never_returns_synthetic_reverse_edges() {
    let (_dir, server) = indexed_server();
    let params = Parameters(GraphQueryParams {
        symbol: "RimWorld.Building_Mortar".to_string(),
        kind: None,
        page: None,
        page_size: None,
    });
    let result = server.get_uses(params).unwrap();
    let parsed = parse(&result);

    let results = parsed["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r["edgeKind"] != "CodeUsedByDef"));
}

#[test]
fn kind_filter_restricts_counterparts() {
    let (_dir, server) = indexed_server();
    let params = Parameters(GraphQueryParams {
        symbol: "RimWorld.Building_Mortar".to_string(),
        kind: Some("xml".to_string()),
        page: None,
        page_size: None,
    });
    let result = server.get_used_by(params).unwrap();
    let parsed = parse(&result);
    let results = parsed["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert!(results
        .iter()
        .all(|r| r["symbol"].as_str().unwrap().starts_with("xml:")));
}

#[test]
fn unresolved_symbol_returns_hint_not_error() {
    let (_dir, server) = indexed_server();
    let params = Parameters(GraphQueryParams {
        symbol: "TotallyUnknownSymbolXyz".to_string(),
        kind: None,
        page: None,
        page_size: None,
    });
    let result = server.get_uses(params).unwrap();
    let parsed = parse(&result);
    assert_eq!(parsed["totalCount"], 0);
    assert!(parsed["hint"].as_str().unwrap().contains("search"));
}

#[test]
fn invalid_symbol_is_a_structured_error() {
    let (_dir, server) = indexed_server();
    let params = Parameters(GraphQueryParams {
        symbol: "<not-a-symbol>".to_string(),
        kind: None,
        page: None,
        page_size: None,
    });
    assert!(server.get_uses(params).is_err());

    let params = Parameters(GraphQueryParams {
        symbol: "RimWorld.Building".to_string(),
        kind: Some("bogus".to_string()),
        page: None,
        page_size: None,
    });
    assert!(server.get_used_by(params).is_err());
}

#[test]
fn missing_index_is_reported_with_guidance() {
    let dir = tempfile::tempdir().unwrap();
    let server = MimirServer::new(dir.path().to_path_buf());
    let params = Parameters(GraphQueryParams {
        symbol: "Anything".to_string(),
        kind: None,
        page: None,
        page_size: None,
    });
    let err = server.get_uses(params).unwrap_err();
    assert!(err.message.contains("mimir index"), "{}", err.message);
}
