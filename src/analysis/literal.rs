//! Literal expression model.
//!
//! Only the shapes the scanner can read without evaluating anything are
//! modelled; every other expression becomes [`LiteralValue::Unsupported`],
//! which downstream stages treat as "no contribution".

use tree_sitter::Node;

/// A literal (or literal-looking) expression lowered from the syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralValue {
    /// A plain string literal, escapes decoded. f-strings are unsupported.
    Str(String),
    /// A bare identifier.
    Name(String),
    /// An integer or float literal, kept as source text.
    Number(String),
    /// A dict literal, entries in source order. `**splat` entries are dropped.
    Mapping(Vec<(LiteralValue, LiteralValue)>),
    /// A tuple, list, or bare comma-separated expression list.
    Sequence(Vec<LiteralValue>),
    /// Any other expression; carries the syntax node kind for diagnostics.
    Unsupported(String),
}

impl LiteralValue {
    /// Lower a tree-sitter expression node.
    pub fn from_node(node: Node, source: &[u8]) -> Self {
        match node.kind() {
            "string" => match string_value(node, source) {
                Some(s) => LiteralValue::Str(s),
                None => LiteralValue::Unsupported("f-string".to_string()),
            },
            "concatenated_string" => {
                let mut out = String::new();
                let mut cursor = node.walk();
                for part in node.named_children(&mut cursor) {
                    if part.kind() == "comment" {
                        continue;
                    }
                    match string_value(part, source) {
                        Some(s) => out.push_str(&s),
                        None => return LiteralValue::Unsupported("f-string".to_string()),
                    }
                }
                LiteralValue::Str(out)
            }
            "identifier" => LiteralValue::Name(node_text(node, source).to_string()),
            "integer" | "float" => LiteralValue::Number(node_text(node, source).to_string()),
            "unary_operator" => match node.child_by_field_name("argument") {
                Some(arg) if matches!(arg.kind(), "integer" | "float") => {
                    LiteralValue::Number(node_text(node, source).to_string())
                }
                _ => LiteralValue::Unsupported(node.kind().to_string()),
            },
            "parenthesized_expression" => match first_named_child(node) {
                Some(inner) => LiteralValue::from_node(inner, source),
                None => LiteralValue::Unsupported(node.kind().to_string()),
            },
            "dictionary" => {
                let mut entries = Vec::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if child.kind() != "pair" {
                        continue;
                    }
                    if let (Some(key), Some(value)) = (
                        child.child_by_field_name("key"),
                        child.child_by_field_name("value"),
                    ) {
                        entries.push((
                            LiteralValue::from_node(key, source),
                            LiteralValue::from_node(value, source),
                        ));
                    }
                }
                LiteralValue::Mapping(entries)
            }
            "tuple" | "list" | "expression_list" => {
                let mut cursor = node.walk();
                let items = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() != "comment")
                    .map(|c| LiteralValue::from_node(c, source))
                    .collect();
                LiteralValue::Sequence(items)
            }
            other => LiteralValue::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LiteralValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            LiteralValue::Name(n) => Some(n),
            _ => None,
        }
    }

    /// String literal or bare name text; how type tags are written in practice.
    pub fn as_tag(&self) -> Option<&str> {
        match self {
            LiteralValue::Str(s) | LiteralValue::Name(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(LiteralValue, LiteralValue)]> {
        match self {
            LiteralValue::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[LiteralValue]> {
        match self {
            LiteralValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a string-keyed entry in a mapping literal (last entry wins).
    pub fn get(&self, key: &str) -> Option<&LiteralValue> {
        self.as_mapping()?
            .iter()
            .rev()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }
}

/// Get the text content of a node.
pub(crate) fn node_text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// First named child that is not a comment.
pub(crate) fn first_named_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment");
    found
}

/// Decode a `string` node. Returns `None` for f-strings.
fn string_value(node: Node, source: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }

    let mut out = String::new();
    let mut raw = false;
    let mut saw_start = false;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "string_start" => {
                saw_start = true;
                let prefix = node_text(child, source);
                raw = prefix
                    .chars()
                    .take_while(|c| *c != '"' && *c != '\'')
                    .any(|c| c == 'r' || c == 'R');
            }
            "interpolation" => return None,
            "string_content" | "escape_sequence" => {
                let text = node_text(child, source);
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&unescape(text));
                }
            }
            _ => {}
        }
    }

    if !saw_start {
        // Grammar versions without string_start/string_end tokens.
        return Some(strip_quotes(node_text(node, source)));
    }

    Some(out)
}

/// Strip a string prefix and quotes from raw literal text.
fn strip_quotes(text: &str) -> String {
    let body = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return body[quote.len()..body.len() - quote.len()].to_string();
        }
    }
    body.to_string()
}

/// Decode the common Python escape sequences; unknown escapes are kept verbatim.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
