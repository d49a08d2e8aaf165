use crate::integration::support::Fixture;
use treesync::cli::{CliContext, Commands};

#[test]
fn scan_json_contract_has_required_fields() {
    let fx = Fixture::new();
    fx.write("src/main.rs");
    fx.write("README.md");

    let cli = CliContext::new(fx.root.clone(), None).unwrap();
    let output = cli
        .execute(&Commands::Scan {
            format: "json".to_string(),
            show_all: true,
            members: Vec::new(),
        })
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed.get("show_all_files").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(parsed.get("node_count").and_then(|v| v.as_u64()), Some(4));
    let root = parsed.get("root").unwrap();
    assert_eq!(root.get("kind").and_then(|v| v.as_str()), Some("root"));
    let children = root.get("children").and_then(|v| v.as_array()).unwrap();
    let captions: Vec<_> = children
        .iter()
        .filter_map(|c| c.get("caption").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(captions, vec!["src", "README.md"]);
    assert!(children[0].get("id").and_then(|v| v.as_u64()).is_some());
}

#[test]
fn scan_text_prints_tree_and_summary() {
    let fx = Fixture::new();
    fx.write("docs/guide.md");

    let cli = CliContext::new(fx.root.clone(), None).unwrap();
    let output = cli
        .execute(&Commands::Scan {
            format: "text".to_string(),
            show_all: false,
            members: Vec::new(),
        })
        .unwrap();
    assert!(output.contains("docs/"));
    assert!(output.contains("guide.md"));
    assert!(output.contains("Idle ticks"));
}

#[test]
fn workspace_config_file_is_honoured() {
    let fx = Fixture::new();
    fx.write("keep.rs");
    fx.write("app.proj");
    std::fs::write(
        fx.path(".treesync.toml"),
        "[project]\nmetadata_file = \"app.proj\"\n",
    )
    .unwrap();

    let cli = CliContext::new(fx.root.clone(), None).unwrap();
    assert_eq!(
        cli.config().project.metadata_file.as_deref(),
        Some(std::path::Path::new("app.proj"))
    );
    let output = cli
        .execute(&Commands::Scan {
            format: "json".to_string(),
            show_all: true,
            members: Vec::new(),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["node_count"], 2);
}
