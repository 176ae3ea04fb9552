//! Python source loader using tree-sitter.

use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use super::literal::{first_named_child, node_text};
use crate::analysis::{
    BaseRef, ClassDeclaration, LiteralValue, Member, Method, Param, ParsedFile, SourceLoader,
    SourceUnit, Span, TableAssignment, TableKind, TableWrite,
};

/// Every class definition, at any depth (decorated ones included).
const CLASS_QUERY: &str = r#"
(class_definition
  name: (identifier) @class_name
) @class
"#;

/// Writes into lookup tables, matched at any nesting depth.
const TABLE_QUERY: &str = r#"
; TABLE = {...}
(assignment
  left: (identifier) @table
  right: (_) @value
) @assign

; TABLE["key"] = value
(assignment
  left: (subscript
    value: (identifier) @item_table
    subscript: (_) @item_key)
  right: (_) @item_value
) @item_assign

; TABLE.update({...})
(call
  function: (attribute
    object: (identifier) @update_table
    attribute: (identifier) @update_method)
  arguments: (argument_list . (dictionary) @update_value)
) @update
"#;

pub struct PythonLoader {
    language: Language,
}

impl PythonLoader {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    fn extract_classes(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<ClassDeclaration>> {
        let query = Query::new(&self.language, CLASS_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let mut classes = Vec::new();

        while let Some(m) = matches.next() {
            let mut name = String::new();
            let mut class_node = None;

            for capture in m.captures {
                match query.capture_names()[capture.index as usize] {
                    "class_name" => name = parsed.node_text(capture.node).to_string(),
                    "class" => class_node = Some(capture.node),
                    _ => {}
                }
            }

            if let (false, Some(node)) = (name.is_empty(), class_node) {
                classes.push(ClassDeclaration {
                    bases: extract_bases(node, &parsed.source),
                    members: extract_members(node, &parsed.source),
                    span: Span::from_node(node),
                    name,
                });
            }
        }

        classes.sort_by_key(|c| c.span.start_byte);
        Ok(classes)
    }

    fn extract_tables(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<TableAssignment>> {
        let query = Query::new(&self.language, TABLE_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);
        let source = &parsed.source[..];

        let mut writes = Vec::new();

        while let Some(m) = matches.next() {
            let mut table = None;
            let mut key = None;
            let mut value = None;
            let mut method = None;
            let mut anchor = None;

            for capture in m.captures {
                let capture_name = query.capture_names()[capture.index as usize];
                match capture_name {
                    "table" | "item_table" | "update_table" => {
                        table = TableKind::from_identifier(parsed.node_text(capture.node));
                    }
                    "item_key" => key = Some(capture.node),
                    "value" | "item_value" | "update_value" => value = Some(capture.node),
                    "update_method" => method = Some(parsed.node_text(capture.node)),
                    "assign" | "item_assign" | "update" => anchor = Some(capture.node),
                    _ => {}
                }
            }

            let (Some(table), Some(value), Some(anchor)) = (table, value, anchor) else {
                continue;
            };
            if method.is_some_and(|m| m != "update") {
                continue;
            }

            // `A = B = {...}` nests the literal one assignment deeper.
            let value = innermost_value(value);

            let write = match key {
                Some(key) => TableWrite::Item {
                    key: LiteralValue::from_node(key, source),
                    value: LiteralValue::from_node(value, source),
                },
                None => TableWrite::Bulk(LiteralValue::from_node(value, source)),
            };

            writes.push(TableAssignment {
                table,
                write,
                span: Span::from_node(anchor),
            });
        }

        writes.sort_by_key(|w| w.span.start_byte);
        Ok(writes)
    }
}

impl Default for PythonLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceLoader for PythonLoader {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse Python source: {}", path.display()))?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_string_lossy().to_string(),
        })
    }

    fn extract_unit(&self, parsed: &ParsedFile) -> anyhow::Result<SourceUnit> {
        Ok(SourceUnit {
            path: parsed.path.clone(),
            classes: self.extract_classes(parsed)?,
            tables: self.extract_tables(parsed)?,
            has_parse_errors: parsed.has_errors(),
        })
    }
}

/// Follow chained assignments down to the assigned expression.
fn innermost_value(mut node: Node) -> Node {
    while node.kind() == "assignment" {
        match node.child_by_field_name("right") {
            Some(right) => node = right,
            None => break,
        }
    }
    node
}

fn extract_bases(class_node: Node, source: &[u8]) -> Vec<BaseRef> {
    let Some(args) = class_node.child_by_field_name("superclasses") else {
        return Vec::new();
    };

    let mut bases = Vec::new();
    let mut cursor = args.walk();
    for arg in args.named_children(&mut cursor) {
        match arg.kind() {
            "identifier" => bases.push(BaseRef::Simple(node_text(arg, source).to_string())),
            // metaclass=..., and other class keywords are not bases
            "keyword_argument" | "comment" => {}
            _ => bases.push(BaseRef::Unresolved(node_text(arg, source).to_string())),
        }
    }
    bases
}

fn extract_members(class_node: Node, source: &[u8]) -> Vec<Member> {
    let Some(body) = class_node.child_by_field_name("body") else {
        return Vec::new();
    };

    let mut members = Vec::new();
    let mut cursor = body.walk();
    for stmt in body.named_children(&mut cursor) {
        match stmt.kind() {
            "function_definition" => {
                members.push(Member::Method(extract_method(stmt, Vec::new(), source)));
            }
            "decorated_definition" => {
                let decorators = decorator_names(stmt, source);
                if let Some(def) = stmt.child_by_field_name("definition") {
                    if def.kind() == "function_definition" {
                        members.push(Member::Method(extract_method(def, decorators, source)));
                    }
                }
            }
            "expression_statement" => {
                for (name, value) in assignment_bindings(stmt, source) {
                    members.push(Member::Assignment {
                        name,
                        value,
                        span: Span::from_node(stmt),
                    });
                }
            }
            _ => {}
        }
    }
    members
}

fn decorator_names(decorated: Node, source: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = decorated.walk();
    for child in decorated.named_children(&mut cursor) {
        if child.kind() == "decorator" {
            if let Some(expr) = first_named_child(child) {
                names.push(node_text(expr, source).to_string());
            }
        }
    }
    names
}

/// Name/value pairs bound by an `expression_statement` holding an assignment.
///
/// Chained assignments bind every simple target to the innermost value;
/// annotation-only declarations and tuple targets bind nothing.
fn assignment_bindings(stmt: Node, source: &[u8]) -> Vec<(String, LiteralValue)> {
    let Some(mut current) = first_named_child(stmt) else {
        return Vec::new();
    };
    if current.kind() != "assignment" {
        return Vec::new();
    }

    let mut targets = Vec::new();
    loop {
        if let Some(left) = current.child_by_field_name("left") {
            if left.kind() == "identifier" {
                targets.push(node_text(left, source).to_string());
            }
        }
        match current.child_by_field_name("right") {
            Some(right) if right.kind() == "assignment" => current = right,
            Some(right) => {
                let value = LiteralValue::from_node(right, source);
                return targets.into_iter().map(|t| (t, value.clone())).collect();
            }
            None => return Vec::new(),
        }
    }
}

fn extract_method(func: Node, decorators: Vec<String>, source: &[u8]) -> Method {
    let name = func
        .child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_default();

    let is_static = decorators.iter().any(|d| d == "staticmethod");
    let params = func
        .child_by_field_name("parameters")
        .map(|p| extract_params(p, is_static, source))
        .unwrap_or_default();

    let mut returns = Vec::new();
    let mut locals = Vec::new();
    if let Some(body) = func.child_by_field_name("body") {
        collect_returns(body, source, &mut returns);

        let mut cursor = body.walk();
        for stmt in body.named_children(&mut cursor) {
            if stmt.kind() == "expression_statement" {
                locals.extend(assignment_bindings(stmt, source));
            }
        }
    }

    Method {
        name,
        decorators,
        params,
        returns,
        locals,
        span: Span::from_node(func),
    }
}

/// Declared parameters, receiver and variadics excluded.
fn extract_params(params: Node, is_static: bool, source: &[u8]) -> Vec<Param> {
    let mut slots: Vec<Option<Param>> = Vec::new();
    let mut cursor = params.walk();
    for p in params.named_children(&mut cursor) {
        let slot = match p.kind() {
            "identifier" => Some(Param {
                name: node_text(p, source).to_string(),
                annotation: None,
            }),
            "typed_parameter" => first_named_child(p)
                .filter(|n| n.kind() == "identifier")
                .map(|n| Param {
                    name: node_text(n, source).to_string(),
                    annotation: p
                        .child_by_field_name("type")
                        .and_then(|t| annotation_text(t, source)),
                }),
            "default_parameter" | "typed_default_parameter" => p
                .child_by_field_name("name")
                .filter(|n| n.kind() == "identifier")
                .map(|n| Param {
                    name: node_text(n, source).to_string(),
                    annotation: p
                        .child_by_field_name("type")
                        .and_then(|t| annotation_text(t, source)),
                }),
            "comment" => continue,
            // *args, **kwargs, `/` and `*` separators
            _ => None,
        };
        slots.push(slot);
    }

    if !is_static && matches!(slots.first(), Some(Some(_))) {
        slots.remove(0);
    }
    slots.into_iter().flatten().collect()
}

/// Render a type annotation; `None` for shapes that are not type-like.
fn annotation_text(node: Node, source: &[u8]) -> Option<String> {
    let expr = if node.kind() == "type" {
        first_named_child(node)?
    } else {
        node
    };

    match expr.kind() {
        "identifier" | "attribute" => Some(node_text(expr, source).to_string()),
        // forward reference: "Image"
        "string" => LiteralValue::from_node(expr, source)
            .as_str()
            .map(str::to_string),
        "subscript" | "generic_type" | "union_type" | "member_type" | "binary_operator"
        | "none" => Some(
            node_text(expr, source)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
        ),
        _ => None,
    }
}

/// Collect return expressions, skipping nested scopes.
fn collect_returns(node: Node, source: &[u8], out: &mut Vec<LiteralValue>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "function_definition" | "class_definition" | "decorated_definition" | "lambda" => {}
            "return_statement" => {
                if let Some(expr) = first_named_child(child) {
                    out.push(LiteralValue::from_node(expr, source));
                }
            }
            _ => collect_returns(child, source, out),
        }
    }
}
