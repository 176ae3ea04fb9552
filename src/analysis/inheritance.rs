//! Same-file inheritance index.
//!
//! Only bases written as bare identifiers that name a class declared in the
//! same file are resolvable. There is no cross-file linking.

use std::collections::{HashMap, HashSet};

use super::{ClassDeclaration, SourceUnit};

/// Name-indexed view over the class declarations of one file.
#[derive(Debug, Default)]
pub struct InheritanceIndex<'a> {
    classes: HashMap<&'a str, &'a ClassDeclaration>,
    bases: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> InheritanceIndex<'a> {
    /// Index every class of a file. A later definition of the same name
    /// replaces the earlier one, as rebinding does at runtime.
    pub fn build(unit: &'a SourceUnit) -> Self {
        Self::from_classes(&unit.classes)
    }

    pub fn from_classes(classes: &'a [ClassDeclaration]) -> Self {
        let mut index = Self::default();
        for class in classes {
            index.classes.insert(class.name.as_str(), class);
            index
                .bases
                .insert(class.name.as_str(), class.simple_bases().collect());
        }
        index
    }

    /// Look up a class declaration by name.
    pub fn get(&self, name: &str) -> Option<&'a ClassDeclaration> {
        self.classes.get(name).copied()
    }

    /// Simple base names of a class, in declared order.
    pub fn bases_of(&self, name: &str) -> &[&'a str] {
        self.bases.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bases of `class` that resolve to a declaration in this file.
    pub fn resolvable_bases(
        &self,
        class: &'a ClassDeclaration,
    ) -> impl Iterator<Item = &'a ClassDeclaration> + '_ {
        class.simple_bases().filter_map(move |b| self.get(b))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// The chain of class names currently being resolved.
///
/// Used by classification: a name already on the path does not contribute and
/// is never entered again, so mutual and self inheritance terminate.
#[derive(Debug, Default, Clone)]
pub struct VisitPath {
    names: Vec<String>,
}

impl VisitPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `name` onto the path. Returns `false` if it is already on it.
    pub fn enter(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    /// Pop the most recently entered name.
    pub fn leave(&mut self) {
        self.names.pop();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn depth(&self) -> usize {
        self.names.len()
    }
}

/// Every class name expanded so far during one ancestor walk.
///
/// Used by metadata resolution and to prune classification: each ancestor is
/// expanded at most once even when it is reachable along several paths.
#[derive(Debug, Default, Clone)]
pub struct VisitedSet {
    names: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the set, typically with the class whose ancestors are walked.
    pub fn with(name: &str) -> Self {
        let mut set = Self::new();
        set.insert(name);
        set
    }

    /// Mark `name` visited. Returns `false` if it already was.
    pub fn insert(&mut self, name: &str) -> bool {
        self.names.insert(name.to_string())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
