//! Per-class metadata extraction and the final record builder.

use tracing::debug;

use super::classify::{CATEGORY, FUNCTION, INPUT_TYPES, RETURN_NAMES, RETURN_TYPES};
use super::resolve::{InheritedDefaults, ParentMetadataResolver};
use super::{ClassDeclaration, InheritanceIndex, LiteralValue, MappingTable, Method};
use crate::registry::{NodeRecord, Port, PortMap};

/// Sections of an `INPUT_TYPES` mapping that declare inputs.
const INPUT_SECTIONS: &[&str] = &["required", "optional"];

/// Type tag for a port whose spec is a literal list of choices.
const COMBO: &str = "COMBO";

/// Type tag for an implicit input without a usable annotation.
const ANY: &str = "Any";

/// Inputs declared by an `INPUT_TYPES` method.
///
/// Every return expression is considered. A bare-name return is looked up
/// among the method's top-level assignments. Shapes other than literal
/// mappings contribute nothing.
pub fn input_types_contribution(method: &Method) -> PortMap {
    let mut inputs = PortMap::new();
    for returned in &method.returns {
        let Some(spec) = resolve_local(method, returned).as_mapping() else {
            continue;
        };
        for (section_key, section) in spec {
            let Some(section_name) = section_key.as_str() else {
                continue;
            };
            if !INPUT_SECTIONS.contains(&section_name) {
                continue;
            }
            let Some(entries) = resolve_local(method, section).as_mapping() else {
                continue;
            };
            for (key, port_spec) in entries {
                if let Some(name) = key.as_str() {
                    inputs.insert(name.to_string(), port(name, port_kind(port_spec)));
                }
            }
        }
    }
    inputs
}

/// Follow a bare name to the last assignment of it in the method body.
fn resolve_local<'m>(method: &'m Method, value: &'m LiteralValue) -> &'m LiteralValue {
    match value {
        LiteralValue::Name(name) => method
            .locals
            .iter()
            .rev()
            .find(|(local, _)| local == name)
            .map(|(_, v)| v)
            .unwrap_or(value),
        _ => value,
    }
}

/// Best-effort type of an input spec like `("INT", {...})` or `(["a", "b"],)`.
fn port_kind(spec: &LiteralValue) -> Option<String> {
    let first = match spec {
        LiteralValue::Sequence(items) => items.first()?,
        other => other,
    };
    match first {
        LiteralValue::Str(s) | LiteralValue::Name(s) => Some(s.clone()),
        LiteralValue::Sequence(_) => Some(COMBO.to_string()),
        _ => None,
    }
}

fn port(name: &str, kind: Option<String>) -> Port {
    Port {
        name: name.to_string(),
        kind,
    }
}

/// Parameters of every method other than the constructor and `INPUT_TYPES`.
///
/// Receivers and variadic parameters are already gone from [`Method::params`].
pub fn implicit_inputs(class: &ClassDeclaration) -> impl Iterator<Item = Port> + '_ {
    class
        .methods()
        .filter(|m| !m.is_constructor() && m.name != INPUT_TYPES)
        .flat_map(|m| m.params.iter())
        .map(|p| {
            let kind = p.annotation.clone().unwrap_or_else(|| ANY.to_string());
            Port::typed(&p.name, kind)
        })
}

/// Outputs declared by `RETURN_TYPES`, or `None` when the class has no
/// literal `RETURN_TYPES` sequence.
///
/// Keys come from `RETURN_NAMES` when it is a non-empty literal sequence of
/// strings, otherwise from the lower-cased type entries.
pub fn declared_outputs(class: &ClassDeclaration) -> Option<PortMap> {
    let types = class.assignment(RETURN_TYPES)?.as_sequence()?;

    // Positions are kept so each name pairs with its own type tag.
    let names: Vec<(usize, &str)> = class
        .assignment(RETURN_NAMES)
        .and_then(LiteralValue::as_sequence)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| item.as_str().map(|name| (i, name)))
                .collect()
        })
        .unwrap_or_default();

    let mut outputs = PortMap::new();
    if names.is_empty() {
        for tag in types.iter().filter_map(LiteralValue::as_tag) {
            let key = tag.to_lowercase();
            outputs.insert(key.clone(), Port::typed(key, tag));
        }
    } else {
        for &(i, name) in &names {
            let kind = types.get(i).and_then(LiteralValue::as_tag).map(str::to_string);
            outputs.insert(name.to_string(), port(name, kind));
        }
    }
    Some(outputs)
}

/// A class-level string attribute such as `CATEGORY`.
pub fn string_attribute<'c>(class: &'c ClassDeclaration, name: &str) -> Option<&'c str> {
    class.assignment(name).and_then(LiteralValue::as_str)
}

/// Builds the final [`NodeRecord`] of a node class.
pub struct NodeMetadataBuilder<'a> {
    index: &'a InheritanceIndex<'a>,
    tables: &'a MappingTable,
}

impl<'a> NodeMetadataBuilder<'a> {
    pub fn new(index: &'a InheritanceIndex<'a>, tables: &'a MappingTable) -> Self {
        Self { index, tables }
    }

    /// Resolve ancestors, then overlay the class's own declarations.
    pub fn build(&self, class: &ClassDeclaration, registered_name: &str) -> NodeRecord {
        let inherited = ParentMetadataResolver::new(self.index).resolve(class);
        self.build_with(class, registered_name, inherited)
    }

    /// Overlay the class's own declarations onto already-resolved defaults.
    pub fn build_with(
        &self,
        class: &ClassDeclaration,
        registered_name: &str,
        inherited: InheritedDefaults,
    ) -> NodeRecord {
        let InheritedDefaults {
            mut inputs,
            outputs: inherited_outputs,
            mut category,
            mut function,
        } = inherited;

        if let Some(method) = class.method(INPUT_TYPES) {
            inputs.extend(input_types_contribution(method));
        }
        for implicit in implicit_inputs(class) {
            inputs.entry(implicit.name.clone()).or_insert(implicit);
        }

        let outputs = declared_outputs(class).unwrap_or(inherited_outputs);

        if let Some(value) = string_attribute(class, CATEGORY) {
            category = value.to_string();
        }
        if let Some(value) = string_attribute(class, FUNCTION) {
            function = value.to_string();
        }

        let record = NodeRecord {
            display_name: self.tables.display_name(registered_name),
            inputs,
            outputs,
            category,
            function,
        };
        debug!(
            class = %class.name,
            node = registered_name,
            inputs = record.inputs.len(),
            outputs = record.outputs.len(),
            "built node record"
        );
        record
    }
}
