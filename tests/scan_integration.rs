//! Integration tests for the full scan pipeline.
//!
//! These tests run the scanner against the plugin fixtures in
//! `testdata/plugins/` and check the resulting registry and artifact.

use std::path::{Path, PathBuf};

use nodescan::config::{CollisionPolicy, ScanConfig};
use nodescan::registry::NodeRegistry;
use nodescan::report;
use nodescan::scan::{ScanError, ScanResult, Scanner};
use tempfile::TempDir;
use walkdir::WalkDir;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("plugins")
        .join("image_tools")
}

fn scan_fixture() -> ScanResult {
    Scanner::new(ScanConfig::default())
        .scan(fixture_path())
        .expect("fixture scan should succeed")
}

/// Copy the fixture plugin into a temp dir so tests can write into it.
fn copy_fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    let src = fixture_path();
    for entry in WalkDir::new(&src) {
        let entry = entry.unwrap();
        let rel = entry.path().strip_prefix(&src).unwrap();
        let dest = temp.path().join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest).unwrap();
        } else {
            std::fs::copy(entry.path(), &dest).unwrap();
        }
    }
    temp
}

fn keys<'a>(registry: &'a NodeRegistry, name: &str, outputs: bool) -> Vec<&'a str> {
    let record = registry
        .get(name)
        .unwrap_or_else(|| panic!("missing node {}", name));
    let ports = if outputs {
        &record.outputs
    } else {
        &record.inputs
    };
    ports.keys().map(String::as_str).collect()
}

#[test]
fn test_registry_contains_expected_nodes() {
    let result = scan_fixture();
    let names: Vec<&str> = result.registry.names().collect();
    assert_eq!(
        names,
        vec![
            "Alpha",
            "Beta",
            "BlendBase",
            "FooNode",
            "Gamma",
            "Image Blend",
            "InnerSampler",
            "Load Image",
            "Looper",
            "Mask Only Blend",
            "SoftBlend",
        ]
    );
    assert!(result.registry.len() <= result.nodes_classified);
}

#[test]
fn test_classes_without_signals_are_not_nodes() {
    let result = scan_fixture();
    for name in ["_Helper", "Ping", "Pong", "ImageBlend", "LoadImage"] {
        assert!(
            !result.registry.contains(name),
            "{} should not be a registry key",
            name
        );
    }
}

#[test]
fn test_return_types_become_lowercase_outputs() {
    let result = scan_fixture();
    assert_eq!(
        keys(&result.registry, "Image Blend", true),
        vec!["image", "mask"]
    );
    assert_eq!(keys(&result.registry, "Load Image", true), vec!["image", "mask"]);
}

#[test]
fn test_subclass_inherits_inputs() {
    let result = scan_fixture();
    assert_eq!(
        keys(&result.registry, "Image Blend", false),
        vec!["image", "mask", "seed"]
    );
    let record = result.registry.get("Image Blend").unwrap();
    assert_eq!(record.category, "image/blend");
    assert_eq!(record.function, "blend");
}

#[test]
fn test_own_return_types_replace_inherited_outputs() {
    let result = scan_fixture();
    assert_eq!(keys(&result.registry, "Mask Only Blend", true), vec!["mask"]);
    assert_eq!(keys(&result.registry, "SoftBlend", true), vec!["image"]);
}

#[test]
fn test_own_inputs_merge_with_inherited() {
    let result = scan_fixture();
    assert_eq!(
        keys(&result.registry, "SoftBlend", false),
        vec!["image", "mask", "seed", "softness"]
    );
    let softness = &result.registry.get("SoftBlend").unwrap().inputs["softness"];
    assert_eq!(softness.kind.as_deref(), Some("FLOAT"));
}

#[test]
fn test_display_names() {
    let result = scan_fixture();
    let display = |name: &str| result.registry.get(name).unwrap().display_name.clone();
    assert_eq!(display("Image Blend"), "图像混合");
    assert_eq!(display("SoftBlend"), "Soft Blend");
    assert_eq!(display("Load Image"), "Load Image (Tools)");
    assert_eq!(display("Mask Only Blend"), "Mask Only Blend");
    assert_eq!(display("FooNode"), "FooNode");
}

#[test]
fn test_cyclic_inheritance_terminates() {
    let result = scan_fixture();
    assert_eq!(keys(&result.registry, "Looper", true), vec!["samples"]);

    let alpha = result.registry.get("Alpha").unwrap();
    assert_eq!(alpha.function, "go");
    assert_eq!(keys(&result.registry, "Alpha", true), vec!["int"]);
    assert!(result.registry.contains("Beta"));
}

#[test]
fn test_nested_and_decorated_classes() {
    let result = scan_fixture();
    let inner = result.registry.get("InnerSampler").unwrap();
    assert_eq!(inner.category, "sampling");
    assert_eq!(keys(&result.registry, "Load Image", false), vec!["image"]);
}

#[test]
fn test_parse_failure_is_skipped() {
    let result = scan_fixture();
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].path, "nodes/broken.py");
    assert!(result.skipped[0].reason.contains("syntax error at line 1"));
    // __init__.py, loaders.py, blend.py, cycles.py
    assert_eq!(result.files_scanned, 4);
}

#[test]
fn test_excluded_paths() {
    let config = ScanConfig {
        excluded_paths: vec!["nodes/**".to_string()],
        ..Default::default()
    };
    let result = Scanner::new(config).scan(fixture_path()).unwrap();
    let names: Vec<&str> = result.registry.names().collect();
    assert_eq!(names, vec!["InnerSampler", "Load Image"]);
    assert!(result.skipped.is_empty());
}

#[test]
fn test_write_is_idempotent() {
    let temp = copy_fixture();
    let scanner = Scanner::new(ScanConfig::default());

    let first = scanner.scan(temp.path()).unwrap();
    let path = report::write_node_defs(temp.path(), "zh", &first.registry, false).unwrap();
    assert_eq!(path, temp.path().join("locales").join("zh").join("nodeDefs.json"));
    let first_bytes = std::fs::read(&path).unwrap();

    let second = scanner.scan(temp.path()).unwrap();
    report::write_node_defs(temp.path(), "zh", &second.registry, false).unwrap();
    let second_bytes = std::fs::read(&path).unwrap();

    assert_eq!(first_bytes, second_bytes);
    let text = String::from_utf8(first_bytes).unwrap();
    assert!(text.contains("图像混合"));
    assert!(!text.contains("\"category\""));
}

#[test]
fn test_written_document_round_trips() {
    let temp = copy_fixture();
    let result = Scanner::default().scan(temp.path()).unwrap();
    let path = report::write_node_defs(temp.path(), "ja", &result.registry, true).unwrap();

    let loaded = NodeRegistry::load_json(&path).unwrap();
    assert_eq!(loaded.len(), result.registry.len());
    assert_eq!(loaded.get("FooNode").unwrap().category, "misc");
    let names: Vec<&str> = loaded.names().collect();
    let expected: Vec<&str> = result.registry.names().collect();
    assert_eq!(names, expected);
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[test]
fn test_cross_file_collision_policies() {
    let temp = TempDir::new().unwrap();
    let node = |category: &str| {
        format!(
            "class Sharpen:\n    RETURN_TYPES = (\"IMAGE\",)\n    CATEGORY = \"{}\"\n",
            category
        )
    };
    write(temp.path(), "a/sharpen.py", &node("first"));
    write(temp.path(), "b/sharpen.py", &node("second"));

    let result = Scanner::default().scan(temp.path()).unwrap();
    assert_eq!(result.registry.get("Sharpen").unwrap().category, "second");
    assert_eq!(result.collisions.len(), 1);
    assert_eq!(result.collisions[0].previous, "a/sharpen.py");
    assert_eq!(result.collisions[0].current, "b/sharpen.py");

    let err = Scanner::default()
        .collisions(CollisionPolicy::Error)
        .scan(temp.path())
        .unwrap_err();
    match err {
        ScanError::Collision { name, .. } => assert_eq!(name, "Sharpen"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_missing_root_is_an_error() {
    let temp = TempDir::new().unwrap();
    let err = Scanner::default()
        .scan(temp.path().join("does-not-exist"))
        .unwrap_err();
    assert!(matches!(err, ScanError::RootNotFound { .. }));
}

#[test]
fn test_non_utf8_file_is_skipped() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("latin1.py"), b"# caf\xe9\nclass A:\n    pass\n").unwrap();
    write(
        temp.path(),
        "ok.py",
        "class OkNode:\n    FUNCTION = \"run\"\n",
    );

    let result = Scanner::default().scan(temp.path()).unwrap();
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].path, "latin1.py");
    assert!(result.registry.contains("OkNode"));
}

#[cfg(unix)]
#[test]
fn test_dangling_symlink_does_not_abort_scan() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "ok.py",
        "class OkNode:\n    FUNCTION = \"run\"\n",
    );
    std::os::unix::fs::symlink(temp.path().join("gone.py"), temp.path().join("zz_link.py"))
        .unwrap();

    let result = Scanner::default().scan(temp.path()).unwrap();
    assert!(result.registry.contains("OkNode"));
    assert_eq!(result.files_scanned, 1);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].path, "zz_link.py");
}
