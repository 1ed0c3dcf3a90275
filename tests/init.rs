use std::process::Command;

use mimir_core::{MimirConfig, ResolutionMode};

fn run_init(dir: &std::path::Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_mimir"))
        .arg("init")
        .current_dir(dir)
        .output()
        .unwrap()
}

#[test]
fn init_writes_a_config_matching_the_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_init(dir.path());

    assert!(
        output.status.success(),
        "mimir init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(".mimir.toml"), "stdout: {stdout}");

    // The template must parse back into the same values MimirConfig
    // would use when no file exists at all.
    let content = std::fs::read_to_string(dir.path().join(".mimir.toml")).unwrap();
    let written: MimirConfig = toml::from_str(&content).unwrap();
    let defaults = MimirConfig::default();

    assert_eq!(written.index.parallelism, defaults.index.parallelism);
    assert_eq!(written.index.resolution, ResolutionMode::Resolved);
    assert!(written.index.linkable_fields.is_empty());
    assert_eq!(written.index.default_namespace, defaults.index.default_namespace);
    assert_eq!(written.embedding.model, defaults.embedding.model);
    assert_eq!(written.embedding.dimensions, defaults.embedding.dimensions);
    // The key stays commented out in the template
    assert_eq!(written.embedding.api_key, None);
}

#[test]
fn init_template_documents_the_tunable_knobs() {
    let dir = tempfile::tempdir().unwrap();
    run_init(dir.path());

    let content = std::fs::read_to_string(dir.path().join(".mimir.toml")).unwrap();
    for knob in ["parallelism", "resolution", "linkable_fields", "VOYAGE_API_KEY"] {
        assert!(content.contains(knob), "template should mention {knob}");
    }
}

#[test]
fn init_never_clobbers_an_existing_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join(".mimir.toml");
    std::fs::write(&config_path, "[index]\nparallelism = 3\n").unwrap();

    let output = run_init(dir.path());
    assert!(!output.status.success());

    // The hand-edited file survives untouched
    let config = MimirConfig::from_file(&config_path).unwrap();
    assert_eq!(config.index.parallelism, 3);
}
