//! Fact structures lowered from a parsed source file.
//!
//! Facts own their data: once a [`SourceUnit`] is built the tree-sitter tree
//! can be dropped, and every later stage works on plain Rust values.

use std::fmt;

use super::literal::LiteralValue;

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// A base class reference from a class header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseRef {
    /// A bare identifier (`class A(Base)`), resolvable within the file.
    Simple(String),
    /// Anything else (`mod.Base`, `Generic[T]`, `make_base()`), kept as raw text.
    Unresolved(String),
}

impl BaseRef {
    /// The identifier when this base can take part in inheritance.
    pub fn simple_name(&self) -> Option<&str> {
        match self {
            BaseRef::Simple(name) => Some(name),
            BaseRef::Unresolved(_) => None,
        }
    }
}

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// Annotation rendered as text, when it has a recognized shape.
    pub annotation: Option<String>,
}

/// A method declared directly in a class body.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    /// Decorator expressions as text, without the leading `@`.
    pub decorators: Vec<String>,
    /// Parameters with the receiver (`self`/`cls`) removed.
    pub params: Vec<Param>,
    /// Return expressions in document order, nested scopes excluded.
    pub returns: Vec<LiteralValue>,
    /// Top-level assignments inside the method body, in document order.
    pub locals: Vec<(String, LiteralValue)>,
    pub span: Span,
}

impl Method {
    /// Whether the method is a static method (no receiver parameter).
    pub fn is_static(&self) -> bool {
        self.decorators.iter().any(|d| d == "staticmethod")
    }

    /// Whether this is the instance constructor.
    pub fn is_constructor(&self) -> bool {
        self.name == "__init__"
    }
}

/// A member of a class body.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Method(Method),
    Assignment {
        name: String,
        value: LiteralValue,
        span: Span,
    },
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Method(m) => &m.name,
            Member::Assignment { name, .. } => name,
        }
    }
}

/// A class definition found anywhere in a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDeclaration {
    pub name: String,
    pub bases: Vec<BaseRef>,
    pub members: Vec<Member>,
    pub span: Span,
}

impl ClassDeclaration {
    /// Base names that can be resolved inside the declaring file.
    pub fn simple_bases(&self) -> impl Iterator<Item = &str> {
        self.bases.iter().filter_map(BaseRef::simple_name)
    }

    /// Whether any member (method or assignment) has the given name.
    pub fn declares(&self, name: &str) -> bool {
        self.members.iter().any(|m| m.name() == name)
    }

    /// Find a method by name (last definition wins, as in Python).
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.members.iter().rev().find_map(|m| match m {
            Member::Method(method) if method.name == name => Some(method),
            _ => None,
        })
    }

    /// All methods in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(method) => Some(method),
            Member::Assignment { .. } => None,
        })
    }

    /// Find the value of a class-level assignment (last binding wins).
    pub fn assignment(&self, name: &str) -> Option<&LiteralValue> {
        self.members.iter().rev().find_map(|m| match m {
            Member::Assignment { name: n, value, .. } if n == name => Some(value),
            _ => None,
        })
    }
}

/// Which lookup table an assignment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// `NODE_CLASS_MAPPINGS`: registered name -> class.
    ClassMappings,
    /// `NODE_DISPLAY_NAME_MAPPINGS`: registered name -> display name.
    DisplayNameMappings,
}

impl TableKind {
    /// Identifier the table is bound to in plugin source.
    pub fn identifier(&self) -> &'static str {
        match self {
            TableKind::ClassMappings => "NODE_CLASS_MAPPINGS",
            TableKind::DisplayNameMappings => "NODE_DISPLAY_NAME_MAPPINGS",
        }
    }

    pub fn from_identifier(ident: &str) -> Option<Self> {
        match ident {
            "NODE_CLASS_MAPPINGS" => Some(TableKind::ClassMappings),
            "NODE_DISPLAY_NAME_MAPPINGS" => Some(TableKind::DisplayNameMappings),
            _ => None,
        }
    }
}

/// One write into a lookup table, in any of the recognized forms.
#[derive(Debug, Clone, PartialEq)]
pub enum TableWrite {
    /// `TABLE = {...}` or `TABLE.update({...})`.
    Bulk(LiteralValue),
    /// `TABLE[key] = value`.
    Item { key: LiteralValue, value: LiteralValue },
}

/// A table write with its location, so writes can be replayed in order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableAssignment {
    pub table: TableKind,
    pub write: TableWrite,
    pub span: Span,
}

/// Everything the scanner needs from one file.
#[derive(Debug, Clone, Default)]
pub struct SourceUnit {
    /// File path (for diagnostics).
    pub path: String,
    /// Class definitions in document order, nested ones included.
    pub classes: Vec<ClassDeclaration>,
    /// Table writes in document order.
    pub tables: Vec<TableAssignment>,
    /// Whether the tree contained syntax errors.
    pub has_parse_errors: bool,
}
