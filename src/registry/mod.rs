//! Node registry: the canonical output of a scan.
//!
//! Maps registered node names to [`NodeRecord`]s. Keys and nested maps are
//! ordered, so serializing the same registry always yields the same bytes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A named input or output slot of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    /// Best-effort type tag (`"IMAGE"`, `"INT"`, `"Any"`); not serialized.
    #[serde(skip)]
    pub kind: Option<String>,
}

impl Port {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
        }
    }

    pub fn typed(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind.into()),
        }
    }
}

/// Ordered `name -> {name}` map used for inputs and outputs.
pub type PortMap = BTreeMap<String, Port>;

/// Metadata for one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub display_name: String,
    #[serde(default)]
    pub inputs: PortMap,
    #[serde(default)]
    pub outputs: PortMap,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub function: String,
}

/// A key written by two different files; the later file's record was kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collision {
    pub name: String,
    /// File whose record was replaced.
    pub previous: String,
    /// File whose record won.
    pub current: String,
}

/// Registered name -> record, with the file each record came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeRegistry {
    nodes: BTreeMap<String, NodeRecord>,
    origins: BTreeMap<String, String>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any previous record with the same name.
    ///
    /// Returns a [`Collision`] when the replaced record came from a different
    /// file. Replacements within one file are silent.
    pub fn insert(&mut self, name: &str, record: NodeRecord, origin: &str) -> Option<Collision> {
        self.nodes.insert(name.to_string(), record);
        let previous = self.origins.insert(name.to_string(), origin.to_string())?;
        if previous == origin {
            return None;
        }
        Some(Collision {
            name: name.to_string(),
            previous,
            current: origin.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&NodeRecord> {
        self.nodes.get(name)
    }

    /// File a record was produced from.
    pub fn origin(&self, name: &str) -> Option<&str> {
        self.origins.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeRecord)> {
        self.nodes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Distinct non-empty categories, sorted.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self
            .nodes
            .values()
            .map(|n| n.category.as_str())
            .filter(|c| !c.is_empty())
            .collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }

    /// Build a registry from already-serialized records (e.g. a previous
    /// `nodeDefs.json`). Every record gets `origin` as its source.
    pub fn from_records(records: BTreeMap<String, NodeRecord>, origin: &str) -> Self {
        let origins = records
            .keys()
            .map(|k| (k.clone(), origin.to_string()))
            .collect();
        Self {
            nodes: records,
            origins,
        }
    }

    /// Load a `nodeDefs.json` document.
    pub fn load_json<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading {}: {}", path.display(), e))?;
        let records: BTreeMap<String, NodeRecord> = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("parsing {}: {}", path.display(), e))?;
        Ok(Self::from_records(records, &path.to_string_lossy()))
    }
}
