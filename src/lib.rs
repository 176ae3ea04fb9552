//! nodescan - static metadata extraction for pipeline-node plugins.
//!
//! nodescan reads a tree of Python plugin sources without importing or
//! running them, decides which classes define pipeline nodes, and records
//! each node's inputs, outputs, category and display name.
//!
//! # Architecture
//!
//! The codebase uses tree-sitter for AST-based analysis:
//!
//! - `analysis`: source loading, lookup tables, inheritance, classification
//!   and metadata building for a single file
//! - `scan`: walks a plugin tree and merges per-file results
//! - `registry`: the node registry and its records
//! - `config`: YAML configuration
//! - `report`: nodeDefs.json and summary output (pretty, JSON)
//! - `differ`: base-name diff of two registries
//!
//! # Example
//!
//! ```no_run
//! use nodescan::{ScanConfig, Scanner};
//!
//! let result = Scanner::new(ScanConfig::default()).scan("custom_nodes/my_plugin")?;
//! for (name, node) in result.registry.iter() {
//!     println!("{} -> {}", name, node.display_name);
//! }
//! # Ok::<(), nodescan::ScanError>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod differ;
pub mod registry;
pub mod report;
pub mod scan;

pub use analysis::{Classification, NodeClassifier, PythonLoader, Signal, SourceLoader};
pub use config::{CollisionPolicy, ScanConfig};
pub use differ::{base_name, diff_registries, NodeDiff};
pub use registry::{NodeRecord, NodeRegistry, Port};
pub use scan::{ScanError, ScanResult, Scanner, SkippedFile};
