//! Node classification heuristic.
//!
//! A class is treated as a pipeline node when any of these holds:
//!
//! | Signal | Rule |
//! |---|---|
//! | `InputTypesMethod` | declares a method named `INPUT_TYPES` |
//! | `ReturnTypes` | declares an assignment named `RETURN_TYPES` |
//! | `Registered` | appears as a class in the file's `NODE_CLASS_MAPPINGS` |
//! | `Combination` | matches one of [`COMBINATIONS`] |
//! | `Inherits` | a same-file base classifies as a node |
//!
//! The rules are deliberately over-inclusive: a false positive costs an extra
//! entry in the output, a false negative costs a node nobody can translate.
//! Nothing is evaluated and no types are inferred.

use std::fmt;

use super::{ClassDeclaration, InheritanceIndex, MappingTable, VisitPath, VisitedSet};

pub const INPUT_TYPES: &str = "INPUT_TYPES";
pub const RETURN_TYPES: &str = "RETURN_TYPES";
pub const RETURN_NAMES: &str = "RETURN_NAMES";
pub const CATEGORY: &str = "CATEGORY";
pub const FUNCTION: &str = "FUNCTION";

/// Suffix that, together with `CATEGORY` or `FUNCTION`, marks a node.
const NODE_SUFFIX: &str = "Node";

/// Attribute pairs that mark a node when both are declared.
pub const COMBINATIONS: &[Combination] = &[
    Combination::Pair(CATEGORY, FUNCTION),
    Combination::Pair(RETURN_TYPES, FUNCTION),
    Combination::Pair(RETURN_TYPES, RETURN_NAMES),
    Combination::Pair(CATEGORY, RETURN_TYPES),
    Combination::Pair(INPUT_TYPES, FUNCTION),
    Combination::NodeSuffix,
];

/// An attribute-combination signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combination {
    /// Both attributes are declared.
    Pair(&'static str, &'static str),
    /// Name ends with `Node` and `CATEGORY` or `FUNCTION` is declared.
    NodeSuffix,
}

impl Combination {
    fn matches(&self, class: &ClassDeclaration) -> bool {
        match self {
            Combination::Pair(a, b) => class.declares(a) && class.declares(b),
            Combination::NodeSuffix => {
                class.name.ends_with(NODE_SUFFIX)
                    && (class.declares(CATEGORY) || class.declares(FUNCTION))
            }
        }
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combination::Pair(a, b) => write!(f, "{}+{}", a, b),
            Combination::NodeSuffix => write!(f, "*{}+({}|{})", NODE_SUFFIX, CATEGORY, FUNCTION),
        }
    }
}

/// Why a class was classified as a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    InputTypesMethod,
    ReturnTypes,
    Registered,
    Combination(Combination),
    /// A base class (named) classified as a node.
    Inherits(String),
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::InputTypesMethod => write!(f, "{} method", INPUT_TYPES),
            Signal::ReturnTypes => write!(f, "{}", RETURN_TYPES),
            Signal::Registered => write!(f, "registered in NODE_CLASS_MAPPINGS"),
            Signal::Combination(c) => write!(f, "{}", c),
            Signal::Inherits(base) => write!(f, "inherits node {}", base),
        }
    }
}

/// Outcome of classifying one class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Every direct signal that held, or the first qualifying base.
    pub signals: Vec<Signal>,
}

impl Classification {
    pub fn is_node(&self) -> bool {
        !self.signals.is_empty()
    }
}

/// Classifies the classes of one file.
pub struct NodeClassifier<'a> {
    index: &'a InheritanceIndex<'a>,
    tables: &'a MappingTable,
}

impl<'a> NodeClassifier<'a> {
    pub fn new(index: &'a InheritanceIndex<'a>, tables: &'a MappingTable) -> Self {
        Self { index, tables }
    }

    /// Classify a class declaration of this file.
    pub fn classify(&self, class: &ClassDeclaration) -> Classification {
        self.classify_on_path(class, &mut VisitPath::new())
    }

    /// Classify with an explicit resolution path.
    ///
    /// Classes already on `path` are not consulted again; `path` is restored
    /// before returning.
    pub fn classify_on_path(&self, class: &ClassDeclaration, path: &mut VisitPath) -> Classification {
        self.search(class, path, &mut VisitedSet::new())
    }

    /// Ancestor search. `explored` holds classes whose search already came
    /// back empty, so each class of a diamond lattice is expanded once.
    fn search(
        &self,
        class: &ClassDeclaration,
        path: &mut VisitPath,
        explored: &mut VisitedSet,
    ) -> Classification {
        let mut signals = self.direct_signals(class);
        if !signals.is_empty() {
            return Classification { signals };
        }

        if explored.contains(&class.name) || !path.enter(&class.name) {
            return Classification::default();
        }

        for base in class.simple_bases() {
            if path.contains(base) || explored.contains(base) {
                continue;
            }
            let Some(base_class) = self.index.get(base) else {
                continue;
            };
            if self.search(base_class, path, explored).is_node() {
                signals.push(Signal::Inherits(base.to_string()));
                break;
            }
        }

        path.leave();
        if signals.is_empty() {
            explored.insert(&class.name);
        }
        Classification { signals }
    }

    /// Signals visible on the class itself.
    fn direct_signals(&self, class: &ClassDeclaration) -> Vec<Signal> {
        let mut signals = Vec::new();

        if class.method(INPUT_TYPES).is_some() {
            signals.push(Signal::InputTypesMethod);
        }
        if class.assignment(RETURN_TYPES).is_some() {
            signals.push(Signal::ReturnTypes);
        }
        if self.tables.is_registered(&class.name) {
            signals.push(Signal::Registered);
        }
        for combination in COMBINATIONS {
            if combination.matches(class) {
                signals.push(Signal::Combination(*combination));
            }
        }

        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{BaseRef, LiteralValue, Member, Method, Span};

    fn class(name: &str, bases: &[&str], attrs: &[&str]) -> ClassDeclaration {
        ClassDeclaration {
            name: name.to_string(),
            bases: bases.iter().map(|b| BaseRef::Simple(b.to_string())).collect(),
            members: attrs
                .iter()
                .map(|a| Member::Assignment {
                    name: a.to_string(),
                    value: LiteralValue::Str("x".to_string()),
                    span: Span::default(),
                })
                .collect(),
            span: Span::default(),
        }
    }

    fn with_method(mut class: ClassDeclaration, name: &str) -> ClassDeclaration {
        class.members.push(Member::Method(Method {
            name: name.to_string(),
            decorators: vec!["classmethod".to_string()],
            params: vec![],
            returns: vec![],
            locals: vec![],
            span: Span::default(),
        }));
        class
    }

    fn classify(classes: &[ClassDeclaration], tables: &MappingTable, i: usize) -> Classification {
        let index = InheritanceIndex::from_classes(classes);
        NodeClassifier::new(&index, tables).classify(&classes[i])
    }

    #[test]
    fn test_direct_signals() {
        let tables = MappingTable::default();
        let classes = vec![
            with_method(class("A", &[], &[]), INPUT_TYPES),
            class("B", &[], &[RETURN_TYPES]),
            class("Plain", &[], &["SOMETHING"]),
        ];
        assert_eq!(
            classify(&classes, &tables, 0).signals,
            vec![Signal::InputTypesMethod]
        );
        assert!(classify(&classes, &tables, 1)
            .signals
            .contains(&Signal::ReturnTypes));
        assert!(!classify(&classes, &tables, 2).is_node());
    }

    #[test]
    fn test_input_types_attribute_is_not_a_method() {
        let tables = MappingTable::default();
        let classes = vec![
            class("Attr", &[], &[INPUT_TYPES]),
            class("AttrWithFunction", &[], &[INPUT_TYPES, FUNCTION]),
        ];
        assert!(!classify(&classes, &tables, 0).is_node());
        assert_eq!(
            classify(&classes, &tables, 1).signals,
            vec![Signal::Combination(Combination::Pair(INPUT_TYPES, FUNCTION))]
        );
    }

    #[test]
    fn test_registered_class_is_node() {
        let mut tables = MappingTable::default();
        tables
            .class_to_registered
            .insert("Helper".to_string(), "My Helper".to_string());
        let classes = vec![class("Helper", &[], &[])];
        assert_eq!(
            classify(&classes, &tables, 0).signals,
            vec![Signal::Registered]
        );
    }

    #[test]
    fn test_combinations() {
        let tables = MappingTable::default();
        let classes = vec![
            class("Loader", &[], &[CATEGORY, FUNCTION]),
            class("FooNode", &[], &[CATEGORY]),
            class("FooNode2", &[], &[CATEGORY]),
            class("Bar", &[], &[CATEGORY]),
            class("BarNode", &[], &["OUTPUT_NODE"]),
        ];
        assert!(classify(&classes, &tables, 0).is_node());
        assert_eq!(
            classify(&classes, &tables, 1).signals,
            vec![Signal::Combination(Combination::NodeSuffix)]
        );
        assert!(!classify(&classes, &tables, 2).is_node());
        assert!(!classify(&classes, &tables, 3).is_node());
        assert!(!classify(&classes, &tables, 4).is_node());
    }

    #[test]
    fn test_inherited_classification() {
        let tables = MappingTable::default();
        let classes = vec![
            with_method(class("Base", &[], &[]), INPUT_TYPES),
            class("Middle", &["Base"], &[]),
            class("Leaf", &["Unknown", "Middle"], &[]),
        ];
        assert_eq!(
            classify(&classes, &tables, 2).signals,
            vec![Signal::Inherits("Middle".to_string())]
        );
    }

    #[test]
    fn test_cycles_terminate() {
        let tables = MappingTable::default();
        let classes = vec![
            class("A", &["B"], &[]),
            class("B", &["A"], &[]),
            class("Selfish", &["Selfish"], &[]),
        ];
        assert!(!classify(&classes, &tables, 0).is_node());
        assert!(!classify(&classes, &tables, 1).is_node());
        assert!(!classify(&classes, &tables, 2).is_node());
    }

    #[test]
    fn test_cycle_with_node_member() {
        let tables = MappingTable::default();
        let classes = vec![
            class("A", &["B"], &[]),
            class("B", &["A", "C"], &[]),
            class("C", &[], &[RETURN_TYPES]),
        ];
        assert_eq!(
            classify(&classes, &tables, 0).signals,
            vec![Signal::Inherits("B".to_string())]
        );
    }

    /// `L{i}(A{i}, B{i})`, `A{i}(L{i+1})`, `B{i}(L{i+1})`: 2^depth paths.
    fn diamond_chain(depth: usize, bottom_attrs: &[&str]) -> Vec<ClassDeclaration> {
        let mut classes = Vec::new();
        for i in 0..depth {
            let (a, b, next) = (format!("A{}", i), format!("B{}", i), format!("L{}", i + 1));
            classes.push(class(&format!("L{}", i), &[a.as_str(), b.as_str()], &[]));
            classes.push(class(&a, &[next.as_str()], &[]));
            classes.push(class(&b, &[next.as_str()], &[]));
        }
        classes.push(class(&format!("L{}", depth), &[], bottom_attrs));
        classes
    }

    #[test]
    fn test_deep_diamond_without_signals() {
        let tables = MappingTable::default();
        let classes = diamond_chain(64, &[]);
        assert!(!classify(&classes, &tables, 0).is_node());
    }

    #[test]
    fn test_deep_diamond_with_node_at_bottom() {
        let tables = MappingTable::default();
        let classes = diamond_chain(64, &[RETURN_TYPES]);
        assert_eq!(
            classify(&classes, &tables, 0).signals,
            vec![Signal::Inherits("A0".to_string())]
        );
    }

    #[test]
    fn test_path_is_restored() {
        let tables = MappingTable::default();
        let classes = vec![class("A", &["B"], &[]), class("B", &[], &[])];
        let index = InheritanceIndex::from_classes(&classes);
        let classifier = NodeClassifier::new(&index, &tables);
        let mut path = VisitPath::new();
        classifier.classify_on_path(&classes[0], &mut path);
        assert_eq!(path.depth(), 0);
    }
}
