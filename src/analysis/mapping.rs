//! File-scoped registration tables.
//!
//! Plugins register node classes with `NODE_CLASS_MAPPINGS` (registered name
//! to class) and label them with `NODE_DISPLAY_NAME_MAPPINGS` (registered name
//! to display name). Both are rebuilt for every file and never shared.

use std::collections::HashMap;

use super::{LiteralValue, SourceUnit, TableKind, TableWrite};

/// The two lookup tables of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    /// Class name -> registered name.
    pub class_to_registered: HashMap<String, String>,
    /// Registered name -> display name.
    pub registered_to_display: HashMap<String, String>,
}

impl MappingTable {
    /// Replay every table write of a file in document order.
    pub fn from_unit(unit: &SourceUnit) -> Self {
        let mut table = Self::default();
        for assignment in &unit.tables {
            match &assignment.write {
                TableWrite::Bulk(value) => {
                    // Non-literal bulk values (function calls, merges) are skipped.
                    if let Some(entries) = value.as_mapping() {
                        for (key, value) in entries {
                            table.insert(assignment.table, key, value);
                        }
                    }
                }
                TableWrite::Item { key, value } => table.insert(assignment.table, key, value),
            }
        }
        table
    }

    /// Apply one entry; entries of the wrong shape are dropped.
    fn insert(&mut self, kind: TableKind, key: &LiteralValue, value: &LiteralValue) {
        let Some(key) = key.as_str() else {
            return;
        };
        match kind {
            TableKind::ClassMappings => {
                if let Some(class_name) = value.as_name() {
                    self.class_to_registered
                        .insert(class_name.to_string(), key.to_string());
                }
            }
            TableKind::DisplayNameMappings => {
                if let Some(display) = value.as_str() {
                    self.registered_to_display
                        .insert(key.to_string(), display.to_string());
                }
            }
        }
    }

    /// Registered name for a class, if the file registers it.
    pub fn registered_name(&self, class_name: &str) -> Option<&str> {
        self.class_to_registered.get(class_name).map(String::as_str)
    }

    /// Registered name for a class, falling back to the class name.
    pub fn registered_name_or_class<'a>(&'a self, class_name: &'a str) -> &'a str {
        self.registered_name(class_name).unwrap_or(class_name)
    }

    /// Whether the class is a value of the class-mapping table.
    pub fn is_registered(&self, class_name: &str) -> bool {
        self.class_to_registered.contains_key(class_name)
    }

    /// Display name for a registered name, falling back to the registered name.
    pub fn display_name(&self, registered: &str) -> String {
        self.registered_to_display
            .get(registered)
            .cloned()
            .unwrap_or_else(|| registered.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.class_to_registered.is_empty() && self.registered_to_display.is_empty()
    }
}
