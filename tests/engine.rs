use indexmap::IndexMap;
use proptest::prelude::*;
use toondoc::convert::document_to_toon;
use toondoc::resolver::{self, ResolverOptions};
use toondoc::validator::ErrorCode;
use toondoc::{Document, Parser, Resolver, Symbol, SymbolKind, SymbolTable, Validator, Value};

/// A symbol whose body holds one `ref_<n>` field per reference.
fn symbol(id: &str, refs: &[&str], line: u32) -> Symbol {
    let mut body = IndexMap::new();
    for (i, r) in refs.iter().enumerate() {
        body.insert(format!("ref_{i}"), Value::from(format!("@ref({r})")));
    }
    return Symbol {
        content: Some(Value::Map(body)),
        kind: SymbolKind::Document,
        line,
        symbol: id.to_string(),
    };
}

fn table(entries: &[(&str, &[&str])]) -> SymbolTable {
    return entries
        .iter()
        .zip(1_u32..)
        .map(|((id, refs), line)| return symbol(id, refs, line))
        .collect();
}

#[test]
fn minimal_document_parses_and_validates() {
    let text = "# TOON Document\n\n## Document Overview\n\n- name: \"demo\"\n- description: \"d\"\n- version: \"1.0.0\"\n- status: \"draft\"\n- created_at: \"2026-01-01T00:00:00Z\"\n";
    let parsed = Parser::default().parse(text);

    assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
    assert_eq!(parsed.document.name.as_deref(), Some("demo"));
    assert_eq!(parsed.metadata.line_count, 10);

    let result = Validator::default().validate(&parsed.document);
    assert!(result.is_valid(), "{:?}", result.errors());
}

#[test]
fn missing_reference_is_unresolved_and_reported() {
    let mut document = Document::default();
    document.extra.insert("depends_on".to_string(), Value::from("@ref(missing)"));
    let symbols = SymbolTable::new();

    let resolved = Resolver::default().resolve(&document, &symbols);
    assert_eq!(resolved.unresolved_refs, vec!["missing".to_string()]);
    assert!(!resolved.resolved);

    let report = Validator::default().validate_references(&document, &symbols);
    assert_eq!(report.errors().len(), 1);
    assert_eq!(report.errors().first().map(|e| e.code), Some(ErrorCode::RefNotFound));
    assert_eq!(report.errors().first().map(|e| e.field.as_str()), Some("depends_on"));
}

#[test]
fn three_symbol_cycle_is_closed() {
    let symbols = table(&[("A", &["B"]), ("B", &["C"]), ("C", &["A"])]);
    let cycles = Resolver::default().detect_cycles(&Document::default(), Some(&symbols));

    assert!(!cycles.is_empty());
    for chain in &cycles {
        assert_eq!(chain.symbols.first(), chain.symbols.last());
    }
    let first = cycles.first().unwrap();
    for id in ["A", "B", "C"] {
        assert!(first.symbols.iter().any(|s| s == id), "{:?}", first.symbols);
    }
}

#[test]
fn acyclic_table_has_no_cycles() {
    let symbols = table(&[("A", &["B"]), ("B", &[])]);
    assert!(Resolver::default().detect_cycles(&Document::default(), Some(&symbols)).is_empty());
}

#[test]
fn long_chain_respects_depth_bound() {
    let ids: Vec<String> = (0..200).map(|i| format!("n{i}")).collect();
    let symbols: SymbolTable = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let next: Vec<&str> = ids.get(i + 1).map(String::as_str).into_iter().collect();
            return symbol(id, &next, u32::try_from(i + 1).unwrap());
        })
        .collect();

    let resolver = Resolver::new(ResolverOptions { max_depth: 100 });
    assert!(resolver.detect_cycles(&Document::default(), Some(&symbols)).is_empty());
}

#[test]
fn parsed_symbols_carry_true_lines() {
    let text = "# Plan\n## Document Overview\n- name: \"plan\"\n\n## Symbol: alpha\n- next: @ref(beta)\n\n## Symbol: beta\n- next: @ref(alpha)\n";
    let parsed = Parser::default().parse(text);

    assert_eq!(parsed.symbols.get("alpha").map(|s| s.line), Some(5));
    assert_eq!(parsed.symbols.get("beta").map(|s| s.line), Some(8));

    let cycles = Resolver::default().detect_cycles(&parsed.document, Some(&parsed.symbols));
    assert_eq!(cycles.len(), 1);
    let chain = cycles.first().unwrap();
    assert_eq!(chain.symbols.len(), 3);
    assert_eq!(chain.symbols.first(), chain.symbols.last());
    assert!(chain.symbols.iter().any(|s| s == "alpha") && chain.symbols.iter().any(|s| s == "beta"));
    assert!(chain.cycle_detected_at.is_some());
}

#[test]
fn oversized_input_is_rejected() {
    let text = format!("# Big\n{}", "x".repeat(200 * 1024));
    let parsed = Parser::default().parse(&text);
    assert_eq!(parsed.errors.len(), 1);
    assert_eq!(parsed.errors.first().map(|e| e.code.as_str()), Some("FILE_TOO_LARGE"));
    assert!(parsed.document.is_empty());
}

#[test]
fn schema_boundaries_through_parsing() {
    let render = |version: &str, status: &str| {
        return format!(
            "# D\n## Document Overview\n- name: \"demo\"\n- description: \"d\"\n- version: \"{version}\"\n- status: \"{status}\"\n- created_at: \"2026-01-01T00:00:00Z\"\n"
        );
    };
    let parser = Parser::default();
    let validator = Validator::default();
    let codes = |text: String| {
        let parsed = parser.parse(&text);
        return validator
            .validate(&parsed.document)
            .errors()
            .iter()
            .map(|e| (e.field.clone(), e.code, e.line))
            .collect::<Vec<_>>();
    };

    assert!(codes(render("1.0.0", "draft")).is_empty());
    assert_eq!(codes(render("1.0", "draft")), vec![("version".to_string(), ErrorCode::InvalidFormat, Some(5))]);
    assert_eq!(
        codes(render("1.0.0-beta", "draft")),
        vec![("version".to_string(), ErrorCode::InvalidFormat, Some(5))]
    );
    assert_eq!(codes(render("1.0.0", "pending")), vec![("status".to_string(), ErrorCode::InvalidEnum, Some(6))]);
}

/// Slug-shaped names, as the base schema demands.
fn slug() -> impl Strategy<Value = String> {
    return "[a-z][a-z0-9-]{0,20}";
}

/// Free text without quotes, possibly spanning several lines.
fn text() -> impl Strategy<Value = String> {
    return "[A-Za-z0-9 ,.\n]{1,60}".prop_map(|s| s.trim().to_string()).prop_filter("non-empty", |s| !s.is_empty());
}

/// What a single TOON bullet can hold of `text`: its lines folded onto one.
fn folded(text: &str) -> String {
    return text.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join(" ");
}

proptest! {
    #[test]
    fn header_fields_round_trip(
        name in slug(),
        description in text(),
        version in (0_u32..100, 0_u32..100, 0_u32..100).prop_map(|(a, b, c)| format!("{a}.{b}.{c}")),
        status in prop::sample::select(vec!["draft", "active", "deprecated", "superseded"]),
        tags in prop::collection::vec(slug(), 0..5),
    ) {
        let document = Document {
            created_at: Some("2026-03-04T05:06:07Z".to_string()),
            description: Some(description),
            name: Some(name),
            status: Some(status.to_string()),
            tags: Some(tags),
            version: Some(version),
            ..Document::default()
        };

        let rendered = document_to_toon(&document);
        let multi_line = document.description.as_deref().is_some_and(|d| d.contains('\n'));
        prop_assert_eq!(rendered.warnings.len(), usize::from(multi_line));

        let parsed = Parser::default().parse(&rendered.content).document;
        prop_assert_eq!(&parsed.name, &document.name);
        prop_assert_eq!(parsed.description, document.description.as_deref().map(folded));
        prop_assert_eq!(&parsed.version, &document.version);
        prop_assert_eq!(&parsed.status, &document.status);
        prop_assert_eq!(&parsed.created_at, &document.created_at);
        prop_assert_eq!(&parsed.tags, &document.tags);
    }

    #[test]
    fn validation_is_idempotent(status in "[a-z]{1,10}", version in "[0-9.]{1,8}") {
        let document = Document {
            name: Some("demo".to_string()),
            status: Some(status),
            version: Some(version),
            ..Document::default()
        };
        let validator = Validator::default();
        prop_assert_eq!(validator.validate(&document), validator.validate(&document));
    }

    #[test]
    fn every_reference_resolves_or_is_unresolved(
        fields in prop::collection::vec((slug(), prop::collection::vec(0_usize..6, 0..4)), 0..6),
        known in prop::collection::vec(0_usize..6, 0..6),
    ) {
        let ids = ["a", "b", "c", "d", "e", "f"];
        let mut document = Document::default();
        for (key, refs) in &fields {
            let text: Vec<String> = refs
                .iter()
                .filter_map(|i| ids.get(*i))
                .map(|id| format!("see @ref({id})"))
                .collect();
            document.extra.insert(format!("x_{key}"), Value::from(text.join(" and ")));
        }
        let symbols: SymbolTable = known
            .iter()
            .filter_map(|i| ids.get(*i))
            .zip(1_u32..)
            .map(|(id, line)| symbol(id, &[], line))
            .collect();

        let resolved = Resolver::default().resolve(&document, &symbols);
        let mentioned = resolver::extract_object_references(&Value::Map(document.fields()));
        for id in &mentioned {
            let is_resolved = resolved.resolved_refs.iter().any(|r| &r.to.symbol == id);
            let is_unresolved = resolved.unresolved_refs.contains(id);
            prop_assert!(is_resolved != is_unresolved, "{id} resolved={is_resolved} unresolved={is_unresolved}");
        }
        prop_assert_eq!(resolved.resolved, resolved.unresolved_refs.is_empty());
    }
}
