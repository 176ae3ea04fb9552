//! Static analysis of plugin source files.
//!
//! Every file goes through the same pipeline, and nothing it contains is
//! executed:
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Source file │──▶│ SourceLoader │──▶│  SourceUnit  │
//! └─────────────┘   │ (tree-sitter)│   │ (owned facts)│
//!                   └──────────────┘   └──────┬───────┘
//!                                ┌────────────┴────────────┐
//!                                ▼                         ▼
//!                        ┌──────────────┐          ┌────────────────┐
//!                        │ MappingTable │          │InheritanceIndex│
//!                        └──────┬───────┘          └───────┬────────┘
//!                               └────────────┬─────────────┘
//!                                            ▼
//!                     NodeClassifier ─▶ ParentMetadataResolver
//!                                            │
//!                                            ▼
//!                                  NodeMetadataBuilder ─▶ NodeRecord
//! ```
//!
//! The tables and index borrow from the `SourceUnit` of their file and are
//! dropped with it; nothing is shared across files.

mod classify;
mod facts;
mod inheritance;
mod literal;
mod mapping;
mod metadata;
mod python;
mod resolve;
mod traits;

pub use classify::{
    Classification, Combination, NodeClassifier, Signal, CATEGORY, COMBINATIONS, FUNCTION,
    INPUT_TYPES, RETURN_NAMES, RETURN_TYPES,
};
pub use facts::{
    BaseRef, ClassDeclaration, Member, Method, Param, SourceUnit, Span, TableAssignment,
    TableKind, TableWrite,
};
pub use inheritance::{InheritanceIndex, VisitPath, VisitedSet};
pub use literal::LiteralValue;
pub use mapping::MappingTable;
pub use metadata::{
    declared_outputs, implicit_inputs, input_types_contribution, NodeMetadataBuilder,
};
pub use python::PythonLoader;
pub use resolve::{InheritedDefaults, ParentMetadataResolver};
pub use traits::{ParsedFile, SourceLoader};

use once_cell::sync::OnceCell;

/// Static storage for the Python loader.
static PYTHON_LOADER: OnceCell<PythonLoader> = OnceCell::new();

/// Get a loader for the given file extension (without the dot).
///
/// Returns None if no loader handles the extension.
pub fn loader_for_extension(ext: &str) -> Option<&'static dyn SourceLoader> {
    let python = PYTHON_LOADER.get_or_init(PythonLoader::new);
    if python.handles_extension(ext) {
        return Some(python as &'static dyn SourceLoader);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_lookup() {
        assert_eq!(loader_for_extension("py").unwrap().language_id(), "python");
        assert!(loader_for_extension("pyi").is_some());
        assert!(loader_for_extension("rs").is_none());
    }
}
