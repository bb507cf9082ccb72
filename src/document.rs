//! The assembled document: typed header fields plus an ordered bag of extras.

use indexmap::IndexMap;
use serde::ser::SerializeMap as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::header::Header;
use crate::parser::{IssueCode, Issues};
use crate::sections::Section;
use crate::types::Value;

/// Status applied when the header has none.
pub const DEFAULT_STATUS: &str = "draft";

/// Version applied when the header has none.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Header fields with a typed slot on [`Document`], in canonical order.
pub const KNOWN_FIELDS: [&str; 7] = [
    "name",
    "description",
    "version",
    "status",
    "created_at",
    "updated_at",
    "tags",
];

/// One logical TOON document.
///
/// Known header fields are typed. Symbol bodies and any other fields live in
/// `extra`, in the order they were added. Serializes as one flat JSON object
/// with known fields first. Deserializes from any JSON object; a known field
/// of the wrong shape stays in `extra` under its own name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Creation timestamp.
    pub created_at: Option<String>,
    /// Short description.
    pub description: Option<String>,
    /// Symbol bodies and fields without a typed slot.
    pub extra: IndexMap<String, Value>,
    /// Source line per dotted field path. Empty for documents not parsed from text.
    pub locations: IndexMap<String, u32>,
    /// Document identifier.
    pub name: Option<String>,
    /// Lifecycle status.
    pub status: Option<String>,
    /// Free-form tags.
    pub tags: Option<Vec<String>>,
    /// Last update timestamp.
    pub updated_at: Option<String>,
    /// Semantic version.
    pub version: Option<String>,
}

impl Document {
    /// Ordered view of every present field: known fields first, then extras.
    pub fn fields(&self) -> IndexMap<String, Value> {
        let mut fields = IndexMap::new();
        for name in KNOWN_FIELDS {
            if let Some(value) = self.known(name) {
                fields.insert(name.to_string(), value);
            }
        }
        for (key, value) in &self.extra {
            fields.insert(key.clone(), value.clone());
        }
        return fields;
    }

    /// Whether the document has no fields at all.
    pub fn is_empty(&self) -> bool {
        return self.extra.is_empty() && KNOWN_FIELDS.iter().all(|name| return self.known(name).is_none());
    }

    /// Value of a typed field, converted to a [`Value`].
    fn known(&self, name: &str) -> Option<Value> {
        let text = match name {
            "created_at" => &self.created_at,
            "description" => &self.description,
            "name" => &self.name,
            "status" => &self.status,
            "tags" => return self.tags.clone().map(Value::from),
            "updated_at" => &self.updated_at,
            "version" => &self.version,
            _ => return None,
        };
        return text.clone().map(Value::String);
    }

    /// Source line of a dotted field path, when the document was parsed from text.
    pub fn line_of(&self, path: &str) -> Option<u32> {
        return self.locations.get(path).copied();
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = IndexMap::<String, Option<Value>>::deserialize(deserializer)?;
        return Ok(fields
            .into_iter()
            .filter_map(|(key, value)| return value.map(|v| return (key, v)))
            .collect());
    }
}

impl FromIterator<(String, Value)> for Document {
    /// Known fields of the right shape fill their typed slot. Anything else lands in `extra`.
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut doc = Self::default();
        for (key, value) in iter {
            if key == "tags"
                && let Some(tags) = string_list(&value)
            {
                doc.tags = Some(tags);
                continue;
            }
            let slot = match key.as_str() {
                "created_at" => Some(&mut doc.created_at),
                "description" => Some(&mut doc.description),
                "name" => Some(&mut doc.name),
                "status" => Some(&mut doc.status),
                "updated_at" => Some(&mut doc.updated_at),
                "version" => Some(&mut doc.version),
                _ => None,
            };
            match (slot, value) {
                (Some(slot), Value::String(text)) => *slot = Some(text),
                (_, value) => {
                    doc.extra.insert(key, value);
                },
            }
        }
        return doc;
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.fields();
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for (key, value) in &fields {
            map.serialize_entry(key, value)?;
        }
        return map.end();
    }
}

/// Every item of a list, when all of them are strings.
fn string_list(value: &Value) -> Option<Vec<String>> {
    return value
        .as_list()?
        .iter()
        .map(|item| return item.as_str().map(str::to_string))
        .collect();
}

/// Merge header fields, defaults, and symbol section bodies into a document.
///
/// Missing timestamps default to `now`. Sections are applied in order, so a
/// later section with the same symbol replaces an earlier one. A symbol named
/// like a known header field is skipped with a `SYMBOL_SHADOWS_FIELD` warning.
pub(crate) fn assemble(header: Header, sections: Vec<Section>, now: &str, issues: &mut Issues) -> Document {
    let mut doc = Document {
        created_at: Some(header.created_at.unwrap_or_else(|| return now.to_string())),
        description: header.description,
        extra: IndexMap::new(),
        locations: header.lines,
        name: header.name,
        status: Some(header.status.unwrap_or_else(|| return DEFAULT_STATUS.to_string())),
        tags: Some(header.tags.unwrap_or_default()),
        updated_at: Some(header.updated_at.unwrap_or_else(|| return now.to_string())),
        version: Some(header.version.unwrap_or_else(|| return DEFAULT_VERSION.to_string())),
    };

    for section in sections {
        let Some(symbol) = section.symbol else {
            continue;
        };
        if KNOWN_FIELDS.contains(&symbol.as_str()) {
            issues.warning(
                IssueCode::SymbolShadowsField,
                section.line,
                format!("symbol `{symbol}` has the same name as a header field and was not merged"),
            );
            continue;
        }

        doc.locations.insert(symbol.clone(), section.line);
        for (key, line) in section.body_lines {
            doc.locations.insert(format!("{symbol}.{key}"), line);
        }
        doc.extra.insert(symbol, Value::Map(section.body));
    }

    return doc;
}
