//! TOON document engine.
//!
//! Parses TOON markdown (headers, `- key: value` bullets, `## Symbol: <id>`
//! sections) into a typed [`Document`] and a [`SymbolTable`], resolves
//! `@ref(<id>)` references with cycle detection, and validates documents
//! against built-in schemas.
//!
//! ```
//! use toondoc::{Parser, Validator};
//!
//! let text = "# Auth\n## Document Overview\n- name: \"auth\"\n- description: \"Login\"\n";
//! let parsed = Parser::default().parse(text);
//! let report = Validator::default().validate(&parsed.document);
//! assert!(report.is_valid());
//! ```

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod header;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod schema;
pub mod sections;
pub mod symbols;
pub mod tokens;
pub mod types;
pub mod validator;

pub use crate::config::Config;
pub use crate::convert::{ConversionResult, Format};
pub use crate::document::Document;
pub use crate::error::Error;
pub use crate::loader::{LoadedTemplate, TemplateLoader, TemplateMetadata};
pub use crate::parser::{IssueCode, ParseIssue, ParseOptions, ParseResult, Parser};
pub use crate::resolver::{CircularChain, ResolvedDocument, Resolver, ResolverOptions};
pub use crate::tokens::{CharRatioCounter, TokenComparison, TokenCounter};
pub use crate::types::{Symbol, SymbolKind, SymbolTable, Value};
pub use crate::validator::{DocumentType, ErrorCode, ValidationError, ValidationResult, Validator};
