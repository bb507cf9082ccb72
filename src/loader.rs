//! Template discovery and loading from a directory of `.toon.md` / `.md` files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::convert::Format;
use crate::document::Document;
use crate::error::Error;
use crate::parser::Parser;

/// `description: "..."` anywhere in the raw text.
#[allow(clippy::expect_used, reason = "static regex literal is known valid")]
static DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r#"(?i)description:\s*["']([^"']+)["']"#).expect("valid regex"));

/// `version: 1.2.3`, optionally quoted.
#[allow(clippy::expect_used, reason = "static regex literal is known valid")]
static VERSION: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r#"(?i)version:\s*["']?(\d+\.\d+\.\d+)["']?"#).expect("valid regex"));

/// A template read from disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedTemplate {
    /// Raw file contents.
    pub content: String,
    /// Parsed document, for TOON templates only.
    pub document: Option<Document>,
    /// Which file variant was loaded.
    pub format: Format,
    /// File facts and scanned header values.
    pub metadata: TemplateMetadata,
    /// Template name without extension.
    pub name: String,
}

/// One entry of [`TemplateLoader::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateInfo {
    /// Available variants, TOON first.
    pub formats: Vec<Format>,
    /// Template name without extension.
    pub name: String,
}

/// Loads templates by name from one directory.
///
/// Every call reads the filesystem; nothing is cached between calls.
#[derive(Debug, Default)]
pub struct TemplateLoader {
    /// Directory holding the template files.
    dir: PathBuf,
    /// Parser for TOON templates.
    parser: Parser,
}

/// Facts about a template file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateMetadata {
    /// First `description: "..."` value in the file.
    pub description: Option<String>,
    /// File modification time.
    pub last_modified: DateTime<Utc>,
    /// Template name without extension.
    pub name: String,
    /// File size in bytes.
    pub size: u64,
    /// Estimated token count of the contents.
    pub tokens: usize,
    /// First `version: X.Y.Z` value in the file.
    pub version: Option<String>,
}

impl TemplateLoader {
    /// Stat the file and scan the text for description and version.
    fn describe(&self, name: &str, path: &Path, content: &str) -> Result<TemplateMetadata, Error> {
        let stat = fs::metadata(path)?;
        let capture = |regex: &Regex| {
            return regex
                .captures(content)
                .and_then(|caps| return caps.get(1))
                .map(|m| return m.as_str().to_string());
        };

        return Ok(TemplateMetadata {
            description: capture(&DESCRIPTION),
            last_modified: stat.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| return Utc::now()),
            name: name.to_string(),
            size: stat.len(),
            tokens: self.parser.counter().count(content),
            version: capture(&VERSION),
        });
    }

    /// The template directory.
    pub fn dir(&self) -> &Path {
        return &self.dir;
    }

    /// Locate the file for `name`, trying the preferred format first.
    fn find(&self, name: &str, preferred: Option<Format>) -> Option<(PathBuf, Format)> {
        let order = match preferred {
            Some(Format::Markdown) => [Format::Markdown, Format::Toon],
            Some(Format::Toon) | None => [Format::Toon, Format::Markdown],
        };
        return order
            .into_iter()
            .map(|format| return (self.dir.join(format!("{name}{}", format.extension())), format))
            .find(|(path, _)| return path.is_file());
    }

    /// Whether a template with this name exists in either format.
    pub fn has(&self, name: &str) -> bool {
        return self.find(name, None).is_some();
    }

    /// All templates in the directory, sorted by name.
    ///
    /// A missing directory lists nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub fn list(&self, format: Option<Format>) -> Result<Vec<TemplateInfo>, Error> {
        if !self.dir.is_dir() {
            debug!(dir:? = self.dir; "template directory missing");
            return Ok(Vec::new());
        }

        let mut templates: Vec<TemplateInfo> = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some((name, entry_format)) = split_template_name(&file_name) else {
                continue;
            };
            if format.is_some_and(|wanted| return wanted != entry_format) {
                continue;
            }

            match templates.iter_mut().find(|info| return info.name == name) {
                Some(info) => {
                    if !info.formats.contains(&entry_format) {
                        info.formats.push(entry_format);
                    }
                },
                None => templates.push(TemplateInfo {
                    formats: vec![entry_format],
                    name: name.to_string(),
                }),
            }
        }

        for info in &mut templates {
            info.formats.sort_by_key(|f| return *f != Format::Toon);
        }
        templates.sort_by(|a, b| return a.name.cmp(&b.name));
        return Ok(templates);
    }

    /// Read and, for TOON files, parse a template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateNotFound`] if neither `<name>.toon.md` nor
    /// `<name>.md` exists, or an I/O error if the file cannot be read.
    pub fn load(&self, name: &str, preferred: Option<Format>) -> Result<LoadedTemplate, Error> {
        let (path, format) = self.find(name, preferred).ok_or_else(|| {
            return Error::TemplateNotFound {
                format: preferred.map(|f| return f.to_string()),
                name: name.to_string(),
            };
        })?;
        debug!(path:? = path, format:% = format; "loading template");

        let content = fs::read_to_string(&path)?;
        let metadata = self.describe(name, &path, &content)?;
        let document = match format {
            Format::Toon => Some(self.parser.parse(&content).document),
            Format::Markdown => None,
        };

        return Ok(LoadedTemplate {
            content,
            document,
            format,
            metadata,
            name: name.to_string(),
        });
    }

    /// File facts for a template without parsing it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateNotFound`] if no file matches, or an I/O error.
    pub fn metadata(&self, name: &str) -> Result<TemplateMetadata, Error> {
        let (path, _) = self.find(name, None).ok_or_else(|| {
            return Error::TemplateNotFound {
                format: None,
                name: name.to_string(),
            };
        })?;
        let content = fs::read_to_string(&path)?;
        return self.describe(name, &path, &content);
    }

    /// Loader for `dir` with a default parser.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        return Self {
            dir: dir.into(),
            parser: Parser::default(),
        };
    }
}

/// `auth.toon.md` -> `("auth", Toon)`, `auth.md` -> `("auth", Markdown)`.
fn split_template_name(file_name: &str) -> Option<(&str, Format)> {
    if let Some(name) = file_name.strip_suffix(Format::Toon.extension()) {
        return Some((name, Format::Toon));
    }
    return file_name
        .strip_suffix(Format::Markdown.extension())
        .map(|name| return (name, Format::Markdown));
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOON: &str = "# Req\n\n## Document Overview\n\n- name: \"req\"\n- description: \"Requirements template\"\n- version: \"1.2.0\"\n";

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("req.toon.md"), TOON).unwrap();
        fs::write(dir.path().join("req.md"), "# Req\n\nplain\n").unwrap();
        fs::write(dir.path().join("notes.md"), "# Notes\n").unwrap();
        fs::write(dir.path().join("ignored.txt"), "x").unwrap();
        return dir;
    }

    #[test]
    fn load_prefers_toon_by_default() {
        let dir = fixture();
        let loader = TemplateLoader::new(dir.path());
        let template = loader.load("req", None).unwrap();

        assert_eq!(template.format, Format::Toon);
        assert_eq!(template.document.as_ref().and_then(|d| d.name.as_deref()), Some("req"));
        assert_eq!(template.metadata.description.as_deref(), Some("Requirements template"));
        assert_eq!(template.metadata.version.as_deref(), Some("1.2.0"));
        assert_eq!(template.metadata.size, u64::try_from(TOON.len()).unwrap());
        assert_eq!(template.metadata.tokens, TOON.chars().count().div_ceil(4));
    }

    #[test]
    fn load_honors_preferred_format() {
        let dir = fixture();
        let loader = TemplateLoader::new(dir.path());
        let template = loader.load("req", Some(Format::Markdown)).unwrap();
        assert_eq!(template.format, Format::Markdown);
        assert!(template.document.is_none());

        let fallback = loader.load("notes", Some(Format::Toon)).unwrap();
        assert_eq!(fallback.format, Format::Markdown);
    }

    #[test]
    fn missing_template_is_an_error() {
        let dir = fixture();
        let err = TemplateLoader::new(dir.path()).load("nope", Some(Format::Toon)).unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound { ref name, .. } if name == "nope"));
    }

    #[test]
    fn list_groups_formats_by_name() {
        let dir = fixture();
        let loader = TemplateLoader::new(dir.path());

        let all = loader.list(None).unwrap();
        let names: Vec<&str> = all.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["notes", "req"]);
        assert_eq!(all.get(1).map(|t| t.formats.clone()), Some(vec![Format::Toon, Format::Markdown]));

        let toon_only = loader.list(Some(Format::Toon)).unwrap();
        assert_eq!(toon_only.len(), 1);
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let loader = TemplateLoader::new("/definitely/not/here");
        assert!(loader.list(None).unwrap().is_empty());
        assert!(!loader.has("req"));
    }

    #[test]
    fn metadata_without_loading() {
        let dir = fixture();
        let loader = TemplateLoader::new(dir.path());
        assert!(loader.has("notes"));
        let meta = loader.metadata("notes").unwrap();
        assert_eq!(meta.name, "notes");
        assert_eq!(meta.description, None);
        assert_eq!(meta.tokens, 2);
    }
}
