use std::fs;
use std::process::Command;

fn write_corpus(root: &std::path::Path) {
    fs::create_dir_all(root.join("Source")).unwrap();
    fs::create_dir_all(root.join("Defs")).unwrap();
    fs::write(
        root.join("Source/Comps.cs"),
        r#"
namespace RimWorld
{
    public class CompExplosive : ThingComp
    {
        public void Detonate() { }
    }
}
"#,
    )
    .unwrap();
    fs::write(
        root.join("Source/ThingComp.cs"),
        "namespace Verse { public class ThingComp { } }",
    )
    .unwrap();
    fs::write(
        root.join("Defs/Shells.xml"),
        r#"<Defs>
  <ThingDef>
    <defName>Shell_HighExplosive</defName>
    <comps>
      <li Class="CompExplosive" />
    </comps>
  </ThingDef>
</Defs>"#,
    )
    .unwrap();
}

fn mimir() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mimir"))
}

#[test]
fn index_then_query_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());

    let output = mimir().arg("index").arg(dir.path()).output().unwrap();
    assert!(
        output.status.success(),
        "mimir index failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("indexed"), "stdout: {stdout}");

    // All four artefacts exist
    let index_dir = dir.path().join(".mimir");
    for artefact in ["graph.nodes.tsv", "graph.csr.bin", "graph.csc.bin", "graph.pagerank.tsv"] {
        assert!(index_dir.join(artefact).exists(), "missing {artefact}");
    }
    assert!(index_dir.join("index.db").exists());

    // The Def binds CompExplosive through comps/li[@Class]
    let output = mimir()
        .args(["query", "RimWorld.CompExplosive", "--used-by"])
        .arg("--path")
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "mimir query failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let response: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("query output should be JSON");
    assert_eq!(response["resolved"], "RimWorld.CompExplosive");
    let results = response["results"].as_array().unwrap();
    assert!(
        results
            .iter()
            .any(|r| r["symbol"] == "xml:ThingDef:Shell_HighExplosive"),
        "results: {results:?}"
    );
}

#[test]
fn query_without_index_fails_with_guidance() {
    let dir = tempfile::tempdir().unwrap();
    let output = mimir()
        .args(["query", "Anything"])
        .arg("--path")
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("mimir index"), "stderr: {stderr}");
}
