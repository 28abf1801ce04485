//! Document context handed to every unit: raw lines, parsed structure, attributes.
//!
//! Parsing is deliberately shallow. It understands the AsciiDoc header
//! (title and `:name: value` entries), section titles and `include::`
//! directives, and skips delimited listing blocks.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use docs_toolchain_shared::{Result, ToolchainError};
use regex::Regex;
use tracing::{debug, instrument, warn};

static ATTRIBUTE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:(!?)([A-Za-z0-9_][A-Za-z0-9_-]*)(!?):(?:\s+(.*))?$").unwrap()
});
static SECTION_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(={2,6})\s+(\S.*)$").unwrap());
static INCLUDE_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^include::([^\[]+)\[[^\]]*\]\s*$").unwrap());

const DOCUMENT_EXTENSION: &str = "adoc";

// ---------------------------------------------------------------------------
// Parsed structure
// ---------------------------------------------------------------------------

/// A section title found in the document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// 1 for `==`, 2 for `===`, ...
    pub level: usize,
    pub title: String,
    /// 1-based source line.
    pub line: usize,
}

/// Structural view of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    pub docfile: String,
    pub title: Option<String>,
    pub sections: Vec<Section>,
    /// Raw `include::` targets in source order.
    pub includes: Vec<String>,
}

// ---------------------------------------------------------------------------
// DocumentContext
// ---------------------------------------------------------------------------

/// Input for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct DocumentContext {
    original_source: Vec<String>,
    parsed: ParsedDocument,
    attributes: BTreeMap<String, String>,
}

impl DocumentContext {
    /// Read and parse a document from disk. Invalid UTF-8 is replaced with
    /// U+FFFD so the rest of the document can still be checked.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| ToolchainError::io(path, e))?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(valid_up_to = e.utf8_error().valid_up_to(), "document is not valid UTF-8");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        let document = Self::from_source(path.to_string_lossy(), &text);
        debug!(
            lines = document.original_source.len(),
            sections = document.parsed.sections.len(),
            "document loaded"
        );
        Ok(document)
    }

    /// Parse an in-memory document that claims to live at `docfile`.
    pub fn from_source(docfile: impl Into<String>, text: &str) -> Self {
        let docfile = docfile.into();
        let original_source: Vec<String> = text.lines().map(str::to_string).collect();

        let mut attributes = BTreeMap::new();
        let mut parsed = ParsedDocument {
            docfile: docfile.clone(),
            ..ParsedDocument::default()
        };

        parse_header(&original_source, &mut parsed, &mut attributes);
        parse_body(&original_source, &mut parsed);

        attributes.insert("docfile".to_string(), docfile.clone());
        if let Some(dir) = Path::new(&docfile).parent() {
            attributes.insert("docdir".to_string(), dir.to_string_lossy().into_owned());
        }
        if let Some(title) = &parsed.title {
            attributes.insert("doctitle".to_string(), title.clone());
        }

        Self {
            original_source,
            parsed,
            attributes,
        }
    }

    /// A context without source, for stages that do not operate on a document.
    pub fn detached(attributes: BTreeMap<String, String>) -> Self {
        Self {
            attributes,
            ..Self::default()
        }
    }

    pub fn docfile(&self) -> &str {
        &self.parsed.docfile
    }

    pub fn original_source(&self) -> &[String] {
        &self.original_source
    }

    /// 1-based line lookup.
    pub fn line(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|index| self.original_source.get(index))
            .map(String::as_str)
    }

    /// Source lines paired with their 1-based numbers.
    pub fn numbered_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.original_source
            .iter()
            .enumerate()
            .map(|(index, line)| (index + 1, line.as_str()))
    }

    pub fn parsed(&self) -> &ParsedDocument {
        &self.parsed
    }

    pub fn parsed_mut(&mut self) -> &mut ParsedDocument {
        &mut self.parsed
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.attributes
    }

    /// `include::` targets resolved against the document's directory.
    pub fn include_paths(&self) -> Vec<PathBuf> {
        let base = Path::new(&self.parsed.docfile)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.parsed
            .includes
            .iter()
            .map(|target| base.join(target))
            .collect()
    }
}

/// The header runs from the first line to the first blank line.
fn parse_header(
    lines: &[String],
    parsed: &mut ParsedDocument,
    attributes: &mut BTreeMap<String, String>,
) {
    for line in lines {
        if line.trim().is_empty() {
            break;
        }
        if let Some(title) = line.strip_prefix("= ") {
            if parsed.title.is_none() {
                parsed.title = Some(title.trim().to_string());
            }
            continue;
        }
        let Some(caps) = ATTRIBUTE_ENTRY.captures(line) else {
            continue;
        };
        let name = caps[2].to_string();
        let unset = !caps[1].is_empty() || !caps[3].is_empty();
        if unset {
            attributes.remove(&name);
        } else {
            let value = caps.get(4).map(|m| m.as_str().trim()).unwrap_or_default();
            attributes.insert(name, value.to_string());
        }
    }
}

fn parse_body(lines: &[String], parsed: &mut ParsedDocument) {
    let mut open_block: Option<&str> = None;

    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim_end();

        if let Some(delimiter) = open_block {
            if trimmed == delimiter {
                open_block = None;
            }
            continue;
        }
        if is_block_delimiter(trimmed) {
            open_block = Some(trimmed);
            continue;
        }

        if let Some(caps) = SECTION_TITLE.captures(trimmed) {
            parsed.sections.push(Section {
                level: caps[1].len() - 1,
                title: caps[2].trim().to_string(),
                line: index + 1,
            });
        } else if let Some(caps) = INCLUDE_DIRECTIVE.captures(trimmed) {
            parsed.includes.push(caps[1].trim().to_string());
        }
    }
}

fn is_block_delimiter(line: &str) -> bool {
    matches!(line, "----" | "...." | "////" | "++++") || line.starts_with("```")
}

/// Every `*.adoc` file under `dir`, sorted by path.
pub fn discover_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    collect_documents(dir, &mut found)?;
    found.sort();
    Ok(found)
}

fn collect_documents(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| ToolchainError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| ToolchainError::io(dir, e))?.path();
        if path.is_dir() {
            collect_documents(&path, found)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext == DOCUMENT_EXTENSION)
        {
            found.push(path);
        }
    }
    Ok(())
}
