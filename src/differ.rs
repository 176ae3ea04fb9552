//! Version diff of two node registries.
//!
//! Nodes are compared by base name, so renames that only change punctuation
//! or case (`Load-Image` vs `load_image`) do not count as changes.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::registry::{NodeRecord, NodeRegistry};
use crate::report;

/// File name used by [`save_added_nodes`].
pub const ADDED_NODES_FILE: &str = "added_nodes.json";

lazy_static! {
    static ref NON_ALNUM: Regex = Regex::new(r"[^\p{L}\p{N}]+").unwrap();
}

/// Normalize a registered name: non-alphanumerics become separators, words
/// are lower-cased and joined by single spaces.
pub fn base_name(name: &str) -> String {
    NON_ALNUM
        .split(name)
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Differences between an old and a new registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeDiff {
    /// New nodes whose base name is not among the old base names.
    pub added: BTreeMap<String, NodeRecord>,
    /// Old node names whose base name is not among the new base names.
    pub removed: Vec<String>,
    /// New nodes that matched an old base name.
    pub unchanged: usize,
}

impl NodeDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn added_names(&self) -> impl Iterator<Item = &str> {
        self.added.keys().map(String::as_str)
    }
}

fn base_names(registry: &NodeRegistry) -> HashSet<String> {
    registry.names().map(base_name).collect()
}

/// Compare two registries by base name.
pub fn diff_registries(old: &NodeRegistry, new: &NodeRegistry) -> NodeDiff {
    let old_bases = base_names(old);
    let new_bases = base_names(new);

    let mut diff = NodeDiff::default();
    for (name, record) in new.iter() {
        if old_bases.contains(&base_name(name)) {
            diff.unchanged += 1;
        } else {
            diff.added.insert(name.to_string(), record.clone());
        }
    }
    diff.removed = old
        .names()
        .filter(|name| !new_bases.contains(&base_name(name)))
        .map(str::to_string)
        .collect();
    diff
}

/// Write the added nodes to `<dir>/added_nodes.json`.
///
/// Returns `None` without touching the filesystem when nothing was added.
pub fn save_added_nodes(
    diff: &NodeDiff,
    dir: &Path,
    include_category: bool,
) -> anyhow::Result<Option<PathBuf>> {
    if diff.added.is_empty() {
        return Ok(None);
    }
    std::fs::create_dir_all(dir)?;
    let path = dir.join(ADDED_NODES_FILE);
    let document = report::render_node_defs(diff.added.iter(), include_category)?;
    std::fs::write(&path, document)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {}", path.display(), e))?;
    Ok(Some(path))
}
