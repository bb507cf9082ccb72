//! `@ref` extraction, resolution against a symbol table, and cycle detection.
//!
//! Everything here is a pure function of its inputs: the symbol table is only
//! read, unresolved references and cycles are reported as data, and nothing
//! fails.

use std::collections::HashMap;
use std::sync::LazyLock;

use indexmap::IndexSet;
use log::{debug, trace};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::types::{SymbolKind, SymbolTable, Value};

/// How deep the no-content fallback searches the document for a symbol's body.
const CONTENT_SEARCH_DEPTH: usize = 10;

/// Default bound on DFS depth.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Object keys never treated as candidate symbols by the fallback heuristic.
const NON_SYMBOL_KEYS: [&str; 4] = ["description", "name", "type", "version"];

/// `@ref(<id>)` or legacy `@ref:<id>`. Group 1 is the separator, group 2 the id.
#[allow(clippy::expect_used, reason = "hardcoded pattern is a compile-time invariant")]
static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"@ref([:(])([a-zA-Z0-9_-]+)\)?").expect("valid regex"));

/// One edge of a reported cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainLink {
    /// Symbol holding the reference.
    pub from: LinkEnd,
    /// Symbol being referenced.
    pub to: LinkEnd,
}

/// A closed loop in the reference graph. `symbols` starts and ends with the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircularChain {
    /// Line of the symbol whose content holds the back-edge, when known.
    pub cycle_detected_at: Option<u32>,
    /// One link per edge of the loop.
    pub path: Vec<ChainLink>,
    /// The loop, with the first id repeated at the end.
    pub symbols: Vec<String>,
}

/// One end of a [`ChainLink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEnd {
    /// Line of the symbol's header or field, when known.
    pub line: Option<u32>,
    /// Symbol id.
    pub symbol: String,
}

/// DFS frame: a node and the index of the next edge to follow.
struct Frame {
    /// Outgoing references, deduplicated, in order.
    edges: Vec<String>,
    /// Node id.
    id: String,
    /// Next edge to follow.
    next: usize,
}

/// Node state during cycle detection. Unvisited nodes have no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    /// Fully explored.
    Done,
    /// On the current DFS stack.
    InProgress,
}

/// A single `@ref` found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceOccurrence {
    /// Dotted path of the field holding the reference.
    pub field: String,
    /// Referenced symbol id.
    pub id: String,
    /// Written in the legacy `@ref:<id>` form.
    pub legacy: bool,
    /// Source line of the field, when known.
    pub line: Option<u32>,
}

/// Output of [`Resolver::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedDocument {
    /// Cycles found by [`Resolver::detect_cycles`].
    pub cycles: Vec<CircularChain>,
    /// The document that was resolved, unchanged.
    pub document: Document,
    /// `true` when `unresolved_refs` is empty.
    pub resolved: bool,
    /// One entry per reference occurrence that names a known symbol.
    pub resolved_refs: Vec<ResolvedReference>,
    /// Ids with no symbol, deduplicated, in first-appearance order.
    pub unresolved_refs: Vec<String>,
}

/// A reference occurrence and the symbol it points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedReference {
    /// Where the reference was written.
    pub from: ReferenceSource,
    /// What it points to.
    pub to: ReferenceTarget,
}

/// Source side of a [`ResolvedReference`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceSource {
    /// Dotted field path.
    pub field: String,
    /// Source line of the field, when known.
    pub line: Option<u32>,
}

/// Target side of a [`ResolvedReference`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceTarget {
    /// Advisory kind of the target symbol.
    #[serde(rename = "type")]
    pub kind: SymbolKind,
    /// Line of the target's `## Symbol:` header.
    pub line: u32,
    /// Target symbol id.
    pub symbol: String,
}

/// Resolves references and detects cycles. Holds only its options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resolver {
    /// Traversal bounds.
    options: ResolverOptions,
}

impl Resolver {
    /// Find every reference cycle reachable from the document.
    ///
    /// With a symbol table, traversal starts from the document's own references
    /// and then every table id, and a node's edges come from its symbol content.
    /// Without one, start nodes are guessed from reference ids and object keys.
    /// That fallback is a heuristic: ordinary field names become candidate
    /// nodes, so treat its output as best effort.
    pub fn detect_cycles(&self, document: &Document, symbols: Option<&SymbolTable>) -> Vec<CircularChain> {
        let fields = Value::Map(document.fields());
        let starts: Vec<String> = match symbols {
            Some(table) => {
                let mut starts = extract_object_references(&fields);
                starts.extend(table.ids().map(str::to_string));
                starts.into_iter().collect()
            },
            None => candidate_symbols(&fields).into_iter().collect(),
        };

        let graph = Graph {
            document,
            fields: &fields,
            symbols,
        };
        let mut state: HashMap<String, NodeState> = HashMap::new();
        let mut cycles = Vec::new();

        for start in starts {
            if state.contains_key(&start) {
                continue;
            }
            self.walk_from(&graph, start, &mut state, &mut cycles);
        }

        debug!(cycles = cycles.len(), nodes = state.len(); "cycle detection finished");
        return cycles;
    }

    /// Resolver with explicit options.
    pub const fn new(options: ResolverOptions) -> Self {
        return Self { options };
    }

    /// Resolve every reference in the document and detect cycles.
    pub fn resolve(&self, document: &Document, symbols: &SymbolTable) -> ResolvedDocument {
        let mut resolved_refs = Vec::new();
        let mut unresolved_refs: Vec<String> = Vec::new();

        for occurrence in reference_occurrences(document) {
            match symbols.get(&occurrence.id) {
                Some(target) => resolved_refs.push(ResolvedReference {
                    from: ReferenceSource {
                        field: occurrence.field,
                        line: occurrence.line,
                    },
                    to: ReferenceTarget {
                        kind: target.kind,
                        line: target.line,
                        symbol: target.symbol.clone(),
                    },
                }),
                None => {
                    if !unresolved_refs.contains(&occurrence.id) {
                        unresolved_refs.push(occurrence.id);
                    }
                },
            }
        }

        let cycles = self.detect_cycles(document, Some(symbols));
        debug!(
            resolved = resolved_refs.len(),
            unresolved = unresolved_refs.len(),
            cycles = cycles.len();
            "references resolved"
        );

        return ResolvedDocument {
            cycles,
            document: document.clone(),
            resolved: unresolved_refs.is_empty(),
            resolved_refs,
            unresolved_refs,
        };
    }

    /// Iterative DFS from one start node.
    fn walk_from(
        &self,
        graph: &Graph<'_>,
        start: String,
        state: &mut HashMap<String, NodeState>,
        cycles: &mut Vec<CircularChain>,
    ) {
        state.insert(start.clone(), NodeState::InProgress);
        let mut stack = vec![Frame {
            edges: graph.edges_of(&start),
            id: start,
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(target) = frame.edges.get(frame.next).cloned() else {
                state.insert(frame.id.clone(), NodeState::Done);
                stack.pop();
                continue;
            };
            frame.next = frame.next.saturating_add(1);
            let holder = frame.id.clone();

            match state.get(&target).copied() {
                Some(NodeState::Done) => {},
                Some(NodeState::InProgress) => {
                    let chain = graph.chain(&stack, &target, &holder);
                    trace!(symbols:? = chain.symbols; "cycle found");
                    cycles.push(chain);
                },
                None => {
                    // A node at this depth is a leaf: not explored, not marked.
                    if stack.len() > self.options.max_depth {
                        continue;
                    }
                    state.insert(target.clone(), NodeState::InProgress);
                    stack.push(Frame {
                        edges: graph.edges_of(&target),
                        id: target,
                        next: 0,
                    });
                },
            }
        }
        return;
    }
}

/// Resolver tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    /// Nodes deeper than this are treated as leaves.
    pub max_depth: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        return Self {
            max_depth: DEFAULT_MAX_DEPTH,
        };
    }
}

/// Read-only view of the reference graph for one detection run.
struct Graph<'a> {
    /// Document, for field lines.
    document: &'a Document,
    /// The document's fields as one map value.
    fields: &'a Value,
    /// Symbol table, when supplied.
    symbols: Option<&'a SymbolTable>,
}

impl Graph<'_> {
    /// Build the chain closed by a back-edge from `holder` to `target`.
    fn chain(&self, stack: &[Frame], target: &str, holder: &str) -> CircularChain {
        let start = stack.iter().position(|f| return f.id == target).unwrap_or(0);
        let mut symbols: Vec<String> = stack
            .get(start..)
            .unwrap_or_default()
            .iter()
            .map(|f| return f.id.clone())
            .collect();
        symbols.push(target.to_string());

        let path = symbols
            .windows(2)
            .filter_map(|pair| {
                let (from, to) = (pair.first()?, pair.get(1)?);
                return Some(ChainLink {
                    from: self.link_end(from),
                    to: self.link_end(to),
                });
            })
            .collect();

        return CircularChain {
            cycle_detected_at: self.line_of(holder),
            path,
            symbols,
        };
    }

    /// Outgoing references of a node.
    fn edges_of(&self, id: &str) -> Vec<String> {
        if let Some(content) = self.symbols.and_then(|t| return t.get(id)).and_then(|s| return s.content.as_ref()) {
            return extract_object_references(content).into_iter().collect();
        }

        let mut edges = IndexSet::new();
        collect_keyed_content(self.fields, id, 0, &mut edges);
        return edges.into_iter().collect();
    }

    /// Line of a symbol: its header when in the table, else its document field.
    fn line_of(&self, id: &str) -> Option<u32> {
        return self
            .symbols
            .and_then(|t| return t.get(id))
            .map(|s| return s.line)
            .or_else(|| return self.document.line_of(id));
    }

    /// A chain endpoint for `id`.
    fn link_end(&self, id: &str) -> LinkEnd {
        return LinkEnd {
            line: self.line_of(id),
            symbol: id.to_string(),
        };
    }
}

/// Fallback start nodes: reference ids and object keys, in first-appearance order.
fn candidate_symbols(value: &Value) -> IndexSet<String> {
    let mut found = IndexSet::new();
    collect_candidates(value, &mut found);
    return found;
}

/// Recursive step of [`candidate_symbols`].
fn collect_candidates(value: &Value, found: &mut IndexSet<String>) {
    match value {
        Value::String(text) => found.extend(extract_references(text)),
        Value::List(items) => {
            for item in items {
                collect_candidates(item, found);
            }
        },
        Value::Map(map) => {
            for (key, inner) in map {
                if !NON_SYMBOL_KEYS.contains(&key.as_str()) {
                    found.insert(key.clone());
                }
                collect_candidates(inner, found);
            }
        },
        Value::Bool(_) | Value::Number(_) => {},
    }
    return;
}

/// References inside any map stored under key `id`, searched to a bounded depth.
fn collect_keyed_content(value: &Value, id: &str, depth: usize, edges: &mut IndexSet<String>) {
    if depth > CONTENT_SEARCH_DEPTH {
        return;
    }
    let Some(map) = value.as_map() else {
        return;
    };
    for (key, inner) in map {
        if key == id && inner.as_map().is_some() {
            edges.extend(extract_object_references(inner));
        } else {
            collect_keyed_content(inner, id, depth.saturating_add(1), edges);
        }
    }
    return;
}

/// Every reference id in `text`, in order, duplicates kept.
pub fn extract_references(text: &str) -> Vec<String> {
    return REFERENCE
        .captures_iter(text)
        .filter_map(|caps| return caps.get(2))
        .map(|m| return m.as_str().to_string())
        .collect();
}

/// Every reference id in every string reachable from `value`, deduplicated,
/// in first-appearance order.
pub fn extract_object_references(value: &Value) -> IndexSet<String> {
    let mut found = IndexSet::new();
    value.visit_strings(&mut |text| found.extend(extract_references(text)));
    return found;
}

/// Every reference occurrence in the document, with its field path and line.
///
/// List items share the path of their list. Nested map keys extend the path
/// with `.`.
pub fn reference_occurrences(document: &Document) -> Vec<ReferenceOccurrence> {
    let mut found = Vec::new();
    for (key, value) in &document.fields() {
        collect_occurrences(document, value, key, &mut found);
    }
    return found;
}

/// Recursive step of [`reference_occurrences`].
fn collect_occurrences(document: &Document, value: &Value, path: &str, found: &mut Vec<ReferenceOccurrence>) {
    match value {
        Value::String(text) => {
            for caps in REFERENCE.captures_iter(text) {
                let (Some(sep), Some(id)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                found.push(ReferenceOccurrence {
                    field: path.to_string(),
                    id: id.as_str().to_string(),
                    legacy: sep.as_str() == ":",
                    line: document.line_of(path),
                });
            }
        },
        Value::List(items) => {
            for item in items {
                collect_occurrences(document, item, path, found);
            }
        },
        Value::Map(map) => {
            for (key, inner) in map {
                collect_occurrences(document, inner, &format!("{path}.{key}"), found);
            }
        },
        Value::Bool(_) | Value::Number(_) => {},
    }
    return;
}
