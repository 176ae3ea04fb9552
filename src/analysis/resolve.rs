//! Inherited metadata resolution.

use super::classify::{CATEGORY, FUNCTION, INPUT_TYPES};
use super::metadata::{declared_outputs, implicit_inputs, input_types_contribution, string_attribute};
use super::{ClassDeclaration, InheritanceIndex, VisitedSet};
use crate::registry::PortMap;

/// Metadata collected from a class's ancestors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InheritedDefaults {
    pub inputs: PortMap,
    pub outputs: PortMap,
    pub category: String,
    pub function: String,
}

impl InheritedDefaults {
    /// Merge one ancestor in. Values already resolved are never replaced.
    fn absorb(&mut self, ancestor: &ClassDeclaration) {
        if let Some(method) = ancestor.method(INPUT_TYPES) {
            for (name, port) in input_types_contribution(method) {
                self.inputs.entry(name).or_insert(port);
            }
        }
        for implicit in implicit_inputs(ancestor) {
            self.inputs.entry(implicit.name.clone()).or_insert(implicit);
        }
        if let Some(outputs) = declared_outputs(ancestor) {
            for (name, port) in outputs {
                self.outputs.entry(name).or_insert(port);
            }
        }
        fill_empty(&mut self.category, string_attribute(ancestor, CATEGORY));
        fill_empty(&mut self.function, string_attribute(ancestor, FUNCTION));
    }
}

fn fill_empty(slot: &mut String, value: Option<&str>) {
    if slot.is_empty() {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            *slot = value.to_string();
        }
    }
}

/// Walks same-file ancestors in pre-order, bases in declared order.
pub struct ParentMetadataResolver<'a> {
    index: &'a InheritanceIndex<'a>,
}

impl<'a> ParentMetadataResolver<'a> {
    pub fn new(index: &'a InheritanceIndex<'a>) -> Self {
        Self { index }
    }

    /// Collect the defaults `class` inherits. The class itself contributes
    /// nothing here.
    pub fn resolve(&self, class: &ClassDeclaration) -> InheritedDefaults {
        let mut visited = VisitedSet::with(&class.name);
        let mut defaults = InheritedDefaults::default();
        self.walk(class, &mut visited, &mut defaults);
        defaults
    }

    /// Expand the bases of `class`, skipping names already in `visited`.
    pub fn walk(
        &self,
        class: &ClassDeclaration,
        visited: &mut VisitedSet,
        defaults: &mut InheritedDefaults,
    ) {
        for base in class.simple_bases() {
            let Some(ancestor) = self.index.get(base) else {
                continue;
            };
            if !visited.insert(base) {
                continue;
            }
            defaults.absorb(ancestor);
            self.walk(ancestor, visited, defaults);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{PythonLoader, SourceLoader, SourceUnit};
    use std::path::Path;

    fn unit(source: &str) -> SourceUnit {
        let loader = PythonLoader::new();
        let parsed = loader.parse(Path::new("t.py"), source.as_bytes()).unwrap();
        loader.extract_unit(&parsed).unwrap()
    }

    fn resolve(unit: &SourceUnit, class_name: &str) -> InheritedDefaults {
        let index = InheritanceIndex::build(unit);
        let class = index.get(class_name).unwrap();
        ParentMetadataResolver::new(&index).resolve(class)
    }

    #[test]
    fn test_subclass_inherits_seed() {
        let unit = unit(
            r#"
class Sampler:
    @classmethod
    def INPUT_TYPES(cls):
        return {"required": {"seed": ("INT", {"default": 0})}}

class FastSampler(Sampler):
    CATEGORY = "sampling"
"#,
        );
        let defaults = resolve(&unit, "FastSampler");
        assert!(defaults.inputs.contains_key("seed"));
        assert_eq!(defaults.category, "");
    }

    #[test]
    fn test_first_resolved_wins_in_preorder() {
        let unit = unit(
            r#"
class Root:
    CATEGORY = "root"
    RETURN_TYPES = ("LATENT",)
    RETURN_NAMES = ("out",)

class Left(Root):
    RETURN_TYPES = ("IMAGE",)
    RETURN_NAMES = ("out",)

class Right:
    CATEGORY = "right"
    FUNCTION = "go"

class Leaf(Left, Right):
    pass
"#,
        );
        let defaults = resolve(&unit, "Leaf");
        assert_eq!(defaults.outputs["out"].kind.as_deref(), Some("IMAGE"));
        assert_eq!(defaults.category, "root");
        assert_eq!(defaults.function, "go");
    }

    #[test]
    fn test_empty_category_does_not_block_later_ancestor() {
        let unit = unit(
            r#"
class A:
    CATEGORY = "later"

class B(A):
    CATEGORY = ""

class C(B):
    pass
"#,
        );
        assert_eq!(resolve(&unit, "C").category, "later");
    }

    #[test]
    fn test_cycles_and_diamonds_terminate() {
        let unit = unit(
            r#"
class A(B):
    RETURN_TYPES = ("A",)

class B(A):
    RETURN_TYPES = ("B",)

class Top:
    FUNCTION = "top"

class L(Top):
    pass

class R(Top):
    pass

class D(L, R):
    pass
"#,
        );
        let a = resolve(&unit, "A");
        assert_eq!(a.outputs.keys().collect::<Vec<_>>(), vec!["b"]);
        let b = resolve(&unit, "B");
        assert_eq!(b.outputs.keys().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(resolve(&unit, "D").function, "top");
    }

    #[test]
    fn test_walk_skips_visited_names() {
        let unit = unit(
            r#"
class Base:
    CATEGORY = "base"

class Child(Base):
    pass
"#,
        );
        let index = InheritanceIndex::build(&unit);
        let child = index.get("Child").unwrap();
        let mut visited = VisitedSet::with("Child");
        visited.insert("Base");
        let mut defaults = InheritedDefaults::default();
        ParentMetadataResolver::new(&index).walk(child, &mut visited, &mut defaults);
        assert_eq!(defaults, InheritedDefaults::default());
    }
}
