//! Core domain types for TOON values, symbols, and symbol tables.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A named, typed sub-record extracted from a `## Symbol: <id>` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Parsed body of the symbol's section, always a `Value::Map` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    /// Best-effort classification. Advisory only.
    #[serde(rename = "type")]
    pub kind: SymbolKind,
    /// One-based line of the `## Symbol:` header.
    pub line: u32,
    /// Identifier as written after `Symbol:`. Case-sensitive.
    pub symbol: String,
}

/// Inferred symbol type, from keywords near the symbol header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    /// Acceptance criteria block.
    AcceptanceCriteria,
    /// Fallback when no keyword matched.
    Document,
    /// Feature or deliverable.
    Feature,
    /// Workflow or roadmap phase.
    Phase,
    /// Release entry.
    Release,
    /// Timeline entry.
    Timeline,
    /// BDD-style user story.
    UserStory,
}

impl SymbolKind {
    /// The kebab-case name used in reports and JSON.
    pub const fn as_str(self) -> &'static str {
        return match self {
            SymbolKind::AcceptanceCriteria => "acceptance-criteria",
            SymbolKind::Document => "document",
            SymbolKind::Feature => "feature",
            SymbolKind::Phase => "phase",
            SymbolKind::Release => "release",
            SymbolKind::Timeline => "timeline",
            SymbolKind::UserStory => "user-story",
        };
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f.write_str(self.as_str());
    }
}

/// Insertion-ordered mapping from symbol id to symbol.
///
/// Order matters: cycle detection visits start nodes in table order, so two
/// runs over the same input report the same chains.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolTable {
    /// Symbols keyed by id.
    symbols: IndexMap<String, Symbol>,
}

impl SymbolTable {
    /// Whether a symbol with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        return self.symbols.contains_key(id);
    }

    /// Look up a symbol by id.
    pub fn get(&self, id: &str) -> Option<&Symbol> {
        return self.symbols.get(id);
    }

    /// Mutable lookup, used by the parser to attach section bodies.
    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Symbol> {
        return self.symbols.get_mut(id);
    }

    /// Symbol ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        return self.symbols.keys().map(String::as_str);
    }

    /// Insert a symbol. A symbol with the same id is replaced in place and returned.
    pub fn insert(&mut self, symbol: Symbol) -> Option<Symbol> {
        return self.symbols.insert(symbol.symbol.clone(), symbol);
    }

    /// Whether the table holds no symbols.
    pub fn is_empty(&self) -> bool {
        return self.symbols.is_empty();
    }

    /// Symbols in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        return self.symbols.values();
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        return self.symbols.len();
    }

    /// Empty table.
    pub fn new() -> Self {
        return Self::default();
    }
}

impl FromIterator<Symbol> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut table = Self::new();
        for symbol in iter {
            table.insert(symbol);
        }
        return table;
    }
}

/// A field value: the closed set of shapes a TOON bullet can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Bare `true` / `false`.
    Bool(bool),
    /// Bracket list `[a, b]`, or values collected from deep bullets.
    List(Vec<Value>),
    /// Nested record, e.g. a symbol section body.
    Map(IndexMap<String, Value>),
    /// Any finite number.
    Number(f64),
    /// Everything else, quotes stripped. `@ref` values stay verbatim.
    String(String),
}

impl Value {
    /// Borrow as a list, if this is one.
    pub fn as_list(&self) -> Option<&[Value]> {
        return match self {
            Value::List(items) => Some(items),
            _ => None,
        };
    }

    /// Borrow as a map, if this is one.
    pub const fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        return match self {
            Value::Map(map) => Some(map),
            _ => None,
        };
    }

    /// Borrow as a string slice, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        return match self {
            Value::String(s) => Some(s),
            _ => None,
        };
    }

    /// Human-readable name of the variant, used in type errors.
    pub const fn kind_name(&self) -> &'static str {
        return match self {
            Value::Bool(_) => "boolean",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        };
    }

    /// Visit every string reachable from this value, depth first, in order.
    pub fn visit_strings<'a>(&'a self, visit: &mut impl FnMut(&'a str)) {
        match self {
            Value::String(s) => visit(s),
            Value::List(items) => {
                for item in items {
                    item.visit_strings(visit);
                }
            },
            Value::Map(map) => {
                for value in map.values() {
                    value.visit_strings(visit);
                }
            },
            Value::Bool(_) | Value::Number(_) => {},
        }
        return;
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        return Value::String(s.to_string());
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        return Value::String(s);
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        return Value::List(items.into_iter().map(Value::String).collect());
    }
}
