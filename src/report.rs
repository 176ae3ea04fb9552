//! Output formatting for nodescan.
//!
//! - `nodeDefs.json`: the artifact consumed by the translation workflow
//! - Pretty: colored terminal summaries of scans and diffs
//! - JSON: the same summaries for programmatic consumption

use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::differ::NodeDiff;
use crate::registry::{Collision, NodeRecord, NodeRegistry, PortMap};
use crate::scan::{ScanResult, SkippedFile};

/// File name of the node definitions artifact.
pub const NODE_DEFS_FILE: &str = "nodeDefs.json";

// =============================================================================
// nodeDefs.json
// =============================================================================

/// One entry of `nodeDefs.json`.
#[derive(Serialize)]
struct NodeDefEntry<'a> {
    display_name: &'a str,
    inputs: &'a PortMap,
    outputs: &'a PortMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
}

impl<'a> NodeDefEntry<'a> {
    fn new(record: &'a NodeRecord, include_category: bool) -> Self {
        Self {
            display_name: &record.display_name,
            inputs: &record.inputs,
            outputs: &record.outputs,
            category: include_category.then_some(record.category.as_str()),
        }
    }
}

/// Render records as a pretty-printed `nodeDefs.json` document.
///
/// Keys are sorted; non-ASCII text is written as is.
pub fn render_node_defs<'a, I, K>(records: I, include_category: bool) -> anyhow::Result<String>
where
    I: IntoIterator<Item = (K, &'a NodeRecord)>,
    K: AsRef<str>,
{
    let document: BTreeMap<String, NodeDefEntry<'a>> = records
        .into_iter()
        .map(|(name, record)| {
            (
                name.as_ref().to_string(),
                NodeDefEntry::new(record, include_category),
            )
        })
        .collect();
    let mut json = serde_json::to_string_pretty(&document)?;
    json.push('\n');
    Ok(json)
}

/// `<root>/locales/<language>/nodeDefs.json`
pub fn node_defs_path(root: &Path, language: &str) -> PathBuf {
    root.join("locales").join(language).join(NODE_DEFS_FILE)
}

/// Write a registry to `<root>/locales/<language>/nodeDefs.json`.
pub fn write_node_defs(
    root: &Path,
    language: &str,
    registry: &NodeRegistry,
    include_category: bool,
) -> anyhow::Result<PathBuf> {
    let path = node_defs_path(root, language);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("failed to create {}: {}", parent.display(), e))?;
    }
    let document = render_node_defs(registry.iter(), include_category)?;
    std::fs::write(&path, document)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {}", path.display(), e))?;
    Ok(path)
}

// =============================================================================
// JSON summaries
// =============================================================================

/// JSON report of one or more scans.
#[derive(Serialize)]
pub struct JsonScanReport<'a> {
    pub version: String,
    pub language: &'a str,
    pub scans: Vec<JsonScan<'a>>,
}

/// JSON summary of a single plugin root.
#[derive(Serialize)]
pub struct JsonScan<'a> {
    pub root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub files_scanned: usize,
    pub nodes: usize,
    pub categories: Vec<&'a str>,
    pub skipped: &'a [SkippedFile],
    pub collisions: &'a [Collision],
}

impl<'a> JsonScan<'a> {
    fn new(result: &'a ScanResult, output: Option<&Path>) -> Self {
        Self {
            root: result.root.to_string_lossy().to_string(),
            output: output.map(|p| p.to_string_lossy().to_string()),
            files_scanned: result.files_scanned,
            nodes: result.registry.len(),
            categories: result.registry.categories(),
            skipped: &result.skipped,
            collisions: &result.collisions,
        }
    }
}

/// Write scan summaries in JSON format.
pub fn write_scan_json(
    language: &str,
    scans: &[(ScanResult, Option<PathBuf>)],
) -> anyhow::Result<()> {
    let report = JsonScanReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        language,
        scans: scans
            .iter()
            .map(|(result, output)| JsonScan::new(result, output.as_deref()))
            .collect(),
    };
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

/// JSON diff report.
#[derive(Serialize)]
pub struct JsonDiffReport<'a> {
    pub version: String,
    pub old: &'a str,
    pub new: &'a str,
    pub added: Vec<&'a str>,
    pub removed: &'a [String],
    pub unchanged: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<String>,
}

/// Write a diff in JSON format.
pub fn write_diff_json(
    old: &str,
    new: &str,
    diff: &NodeDiff,
    saved: Option<&Path>,
) -> anyhow::Result<()> {
    let report = JsonDiffReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        old,
        new,
        added: diff.added_names().collect(),
        removed: &diff.removed,
        unchanged: diff.unchanged,
        saved: saved.map(|p| p.to_string_lossy().to_string()),
    };
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

fn write_header() {
    println!();
    print!("  ");
    print!("{}", "nodescan".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();
}

/// Write a scan summary in pretty (human-readable) format.
pub fn write_scan_pretty(result: &ScanResult, output: Option<&Path>, strict: bool) {
    write_header();

    print!("  {}", "Scanning: ".dimmed());
    println!("{}", result.root.display());
    if let Some(output) = output {
        print!("  {}", "Output:   ".dimmed());
        println!("{}", output.display());
    }
    println!();

    print!("  {}", "✓".green());
    print!(
        "  {} nodes from {} files",
        result.registry.len().to_string().bold(),
        result.files_scanned
    );
    if result.nodes_classified > result.registry.len() {
        print!(
            "  {}",
            format!("({} classified)", result.nodes_classified).dimmed()
        );
    }
    println!();
    println!();

    let categories = result.registry.categories();
    if !categories.is_empty() {
        println!("  {} ({}):", "Categories".bold(), categories.len());
        for category in categories {
            println!("    {}", category);
        }
        println!();
    }

    if !result.skipped.is_empty() {
        write_skipped(&result.skipped);
        println!();
    }

    if !result.collisions.is_empty() {
        write_collisions(&result.collisions);
        println!();
    }

    if strict && !result.skipped.is_empty() {
        println!("  {}", "FAILED (strict: files were skipped)".red());
        println!();
    }
}

fn write_skipped(skipped: &[SkippedFile]) {
    println!("  {} ({}):", "Skipped".bold(), skipped.len());
    println!();
    for s in skipped {
        print!("    {} ", "WARN ".yellow());
        println!("{}", s.path.blue());
        println!("            {}", s.reason);
    }
}

fn write_collisions(collisions: &[Collision]) {
    println!("  {} ({}):", "Collisions".bold(), collisions.len());
    println!();
    for c in collisions {
        print!("    {} ", "WARN ".yellow());
        println!("{}", c.name);
        println!(
            "            {} {} {}",
            c.previous.dimmed(),
            "→".dimmed(),
            c.current.blue()
        );
    }
}

/// Write a diff in pretty (human-readable) format.
pub fn write_diff_pretty(old: &str, new: &str, diff: &NodeDiff, saved: Option<&Path>) {
    write_header();

    print!("  {}", "Old: ".dimmed());
    println!("{}", old);
    print!("  {}", "New: ".dimmed());
    println!("{}", new);
    println!();

    if diff.is_empty() {
        println!("  {}  no added or removed nodes", "✓".green());
        println!();
        return;
    }

    if !diff.added.is_empty() {
        println!("  {} ({}):", "Added".bold(), diff.added.len());
        for name in diff.added_names() {
            println!("    {} {}", "+".green(), name);
        }
        println!();
    }

    if !diff.removed.is_empty() {
        println!("  {} ({}):", "Removed".bold(), diff.removed.len());
        for name in &diff.removed {
            println!("    {} {}", "-".red(), name);
        }
        println!();
    }

    print!("  {}", format!("Unchanged: {}", diff.unchanged).dimmed());
    if let Some(saved) = saved {
        print!("  Saved: {}", saved.display().to_string().blue());
    }
    println!();
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Port;
    use tempfile::TempDir;

    fn sample() -> NodeRegistry {
        let mut record = NodeRecord {
            display_name: "图像混合".to_string(),
            category: "image".to_string(),
            function: "blend".to_string(),
            ..Default::default()
        };
        record
            .inputs
            .insert("image".to_string(), Port::typed("image", "IMAGE"));
        record
            .outputs
            .insert("image".to_string(), Port::typed("image", "IMAGE"));

        let mut registry = NodeRegistry::new();
        registry.insert("Blend", record, "nodes.py");
        registry
    }

    #[test]
    fn test_render_node_defs_shape() {
        let json = render_node_defs(sample().iter(), false).unwrap();
        let expected = r#"{
  "Blend": {
    "display_name": "图像混合",
    "inputs": {
      "image": {
        "name": "image"
      }
    },
    "outputs": {
      "image": {
        "name": "image"
      }
    }
  }
}
"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn test_render_node_defs_with_category() {
        let json = render_node_defs(sample().iter(), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["Blend"]["category"], "image");
        assert!(value["Blend"].get("function").is_none());
    }

    #[test]
    fn test_write_node_defs_location() {
        let temp = TempDir::new().unwrap();
        let path = write_node_defs(temp.path(), "zh", &sample(), false).unwrap();
        assert_eq!(path, temp.path().join("locales/zh/nodeDefs.json"));

        let loaded = NodeRegistry::load_json(&path).unwrap();
        assert_eq!(loaded.get("Blend").unwrap().display_name, "图像混合");
        assert!(loaded.get("Blend").unwrap().inputs.contains_key("image"));
    }
}
