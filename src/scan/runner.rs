//! Scan runner that drives the analysis pipeline over a plugin tree.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{collect_files, relative_label, Result, ScanError};
use crate::analysis::{
    loader_for_extension, InheritanceIndex, MappingTable, NodeClassifier, NodeMetadataBuilder,
    Signal, SourceLoader, SourceUnit,
};
use crate::config::{CollisionPolicy, ScanConfig};
use crate::registry::{Collision, NodeRecord, NodeRegistry};

const UTF8_BOM: &str = "\u{feff}";

/// A file the scan could not use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    /// Path relative to the scan root.
    pub path: String,
    pub reason: String,
}

/// A class that classified as a node, with its built record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedNode {
    pub class_name: String,
    /// Key in the registry: the mapped name, else the class name.
    pub registered_name: String,
    pub record: NodeRecord,
    pub signals: Vec<Signal>,
    /// 1-indexed line of the class definition.
    pub line: usize,
}

/// Outcome of scanning one plugin tree.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub root: PathBuf,
    pub registry: NodeRegistry,
    pub files_scanned: usize,
    /// Classes that classified as nodes, before registry merging.
    pub nodes_classified: usize,
    pub skipped: Vec<SkippedFile>,
    pub collisions: Vec<Collision>,
}

impl ScanResult {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            registry: NodeRegistry::new(),
            files_scanned: 0,
            nodes_classified: 0,
            skipped: Vec::new(),
            collisions: Vec::new(),
        }
    }
}

/// Scans plugin trees into node registries.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    config: ScanConfig,
}

impl Scanner {
    /// Create a scanner with the given configuration.
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Set the collision policy.
    pub fn collisions(mut self, policy: CollisionPolicy) -> Self {
        self.config.collisions = policy;
        self
    }

    /// Set whether files with syntax errors are scanned anyway.
    pub fn allow_partial_parse(mut self, allow: bool) -> Self {
        self.config.allow_partial_parse = allow;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan every matching file under `root`.
    ///
    /// Unreadable entries and unparsable files are skipped and recorded. A
    /// missing or unreadable root, or a collision under
    /// [`CollisionPolicy::Error`], aborts the scan.
    pub fn scan<P: AsRef<Path>>(&self, root: P) -> Result<ScanResult> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(ScanError::RootNotFound {
                path: root.to_path_buf(),
            });
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let walk = collect_files(root, &self.config)?;
        info!(root = %root.display(), files = walk.files.len(), "scanning plugin tree");

        let mut result = ScanResult::new(root);
        for (path, reason) in walk.unreadable {
            let label = relative_label(root, &path);
            warn!(file = %label, error = %reason, "skipping unreadable entry");
            result.skipped.push(SkippedFile {
                path: label,
                reason,
            });
        }

        for path in &walk.files {
            let label = relative_label(root, path);
            let nodes = match self.scan_file(path) {
                Ok(nodes) => nodes,
                Err(e) if e.is_per_file() => {
                    warn!(file = %label, error = %e, "skipping file");
                    result.skipped.push(SkippedFile {
                        path: label,
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            result.files_scanned += 1;
            result.nodes_classified += nodes.len();
            info!(file = %label, nodes = nodes.len(), "scanned file");

            for node in nodes {
                if let Some(collision) =
                    result
                        .registry
                        .insert(&node.registered_name, node.record, &label)
                {
                    self.handle_collision(collision, &mut result.collisions)?;
                }
            }
        }

        info!(
            root = %root.display(),
            files = result.files_scanned,
            skipped = result.skipped.len(),
            nodes = result.registry.len(),
            "scan complete"
        );
        Ok(result)
    }

    fn handle_collision(&self, collision: Collision, seen: &mut Vec<Collision>) -> Result<()> {
        match self.config.collisions {
            CollisionPolicy::Ignore => Ok(()),
            CollisionPolicy::Warn => {
                warn!(
                    node = %collision.name,
                    previous = %collision.previous,
                    current = %collision.current,
                    "node registered by more than one file, keeping the later one"
                );
                seen.push(collision);
                Ok(())
            }
            CollisionPolicy::Error => Err(ScanError::Collision {
                name: collision.name,
                previous: collision.previous,
                current: collision.current,
            }),
        }
    }

    /// Read and analyze a single file.
    pub fn scan_file(&self, path: &Path) -> Result<Vec<ScannedNode>> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let loader = loader_for_extension(ext).ok_or_else(|| ScanError::Language {
            extension: ext.to_string(),
        })?;
        let bytes = std::fs::read(path).map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.scan_source(path, &bytes, loader)
    }

    /// Analyze in-memory source text. `path` is used for diagnostics only.
    pub fn scan_source(
        &self,
        path: &Path,
        bytes: &[u8],
        loader: &dyn SourceLoader,
    ) -> Result<Vec<ScannedNode>> {
        let text = std::str::from_utf8(bytes).map_err(|_| ScanError::Encoding {
            path: path.to_path_buf(),
        })?;
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

        let parse_error = |message: String| ScanError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let parsed = loader
            .parse(path, text.as_bytes())
            .map_err(|e| parse_error(e.to_string()))?;
        if parsed.has_errors() && !self.config.allow_partial_parse {
            let line = parsed.first_error_line().unwrap_or(1);
            return Err(parse_error(format!("syntax error at line {}", line)));
        }

        let unit = loader
            .extract_unit(&parsed)
            .map_err(|e| parse_error(e.to_string()))?;
        if unit.has_parse_errors {
            debug!(file = %path.display(), "scanning file with syntax errors");
        }
        Ok(analyze_unit(&unit))
    }
}

/// Classify every class of a file and build records for the nodes.
pub fn analyze_unit(unit: &SourceUnit) -> Vec<ScannedNode> {
    let tables = MappingTable::from_unit(unit);
    let index = InheritanceIndex::build(unit);
    let classifier = NodeClassifier::new(&index, &tables);
    let builder = NodeMetadataBuilder::new(&index, &tables);

    let mut nodes = Vec::new();
    for class in &unit.classes {
        let classification = classifier.classify(class);
        if !classification.is_node() {
            debug!(file = %unit.path, class = %class.name, "not a node");
            continue;
        }

        let registered = tables.registered_name_or_class(&class.name);
        debug!(
            file = %unit.path,
            class = %class.name,
            node = registered,
            signals = %classification
                .signals
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            "classified node"
        );
        nodes.push(ScannedNode {
            class_name: class.name.clone(),
            registered_name: registered.to_string(),
            record: builder.build(class, registered),
            signals: classification.signals,
            line: class.span.start_line,
        });
    }
    nodes
}
