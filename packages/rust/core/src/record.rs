//! Problem reports produced by processing units.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// Where a problem was found.
///
/// `line` is 1-based and optional: some checks are file-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Location {
    /// A file-scoped location.
    pub fn file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
        }
    }

    /// A location pointing at a specific 1-based line.
    pub fn line(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}", self.file),
            None => write!(f, "{}", self.file),
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorRecord
// ---------------------------------------------------------------------------

/// A uniquely identified problem report.
///
/// Records are only minted by [`Registry::create_error`](crate::Registry::create_error),
/// which issues the id and builds the record in one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    id: u64,
    #[serde(rename = "type")]
    error_type: String,
    msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extras: Option<serde_json::Value>,
}

impl ErrorRecord {
    /// Assemble a record around an already-issued id.
    pub(crate) fn new(id: u64, error_type: String, draft: NewError) -> Self {
        Self {
            id,
            error_type,
            msg: draft.msg,
            location: draft.location,
            extras: draft.extras,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn error_type(&self) -> &str {
        &self.error_type
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn extras(&self) -> Option<&serde_json::Value> {
        self.extras.as_ref()
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} [{}]", self.id, self.error_type)?;
        if let Some(location) = &self.location {
            write!(f, " {location}")?;
        }
        write!(f, " {}", self.msg)
    }
}

// ---------------------------------------------------------------------------
// NewError
// ---------------------------------------------------------------------------

/// The caller-supplied part of an [`ErrorRecord`], before an id is issued.
///
/// `error_type` defaults to the name of the unit creating the record.
#[derive(Debug, Clone, Default)]
pub struct NewError {
    msg: String,
    error_type: Option<String>,
    location: Option<Location>,
    extras: Option<serde_json::Value>,
}

impl NewError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            ..Self::default()
        }
    }

    /// Override the record type.
    pub fn error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Free-form payload for reporters.
    pub fn extras(mut self, extras: serde_json::Value) -> Self {
        self.extras = Some(extras);
        self
    }

    pub(crate) fn error_type_or(&self, default: &str) -> String {
        self.error_type
            .clone()
            .unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_with_reporting_field_names() {
        let record = ErrorRecord::new(
            7,
            "pattern-blacklist".into(),
            NewError::new("Illegal pattern in line 1: /bar/").at(Location::line("index.adoc", 1)),
        );

        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["id"], 7);
        assert_eq!(json["type"], "pattern-blacklist");
        assert_eq!(json["location"]["file"], "index.adoc");
        assert_eq!(json["location"]["line"], 1);
        assert!(json.get("extras").is_none());
    }

    #[test]
    fn file_scoped_location_omits_line() {
        let json = serde_json::to_value(Location::file("a.adoc")).expect("serialize");
        assert!(json.get("line").is_none());
        assert_eq!(Location::file("a.adoc").to_string(), "a.adoc");
        assert_eq!(Location::line("a.adoc", 3).to_string(), "a.adoc:3");
    }

    #[test]
    fn explicit_type_beats_default() {
        let draft = NewError::new("broken").error_type("links");
        assert_eq!(draft.error_type_or("pattern-blacklist"), "links");
        assert_eq!(NewError::new("broken").error_type_or("pattern-blacklist"), "pattern-blacklist");
    }

    #[test]
    fn record_display_includes_location() {
        let record = ErrorRecord::new(
            1,
            "check".into(),
            NewError::new("broken")
                .at(Location::line("a.adoc", 2))
                .extras(serde_json::json!({"hint": "fix it"})),
        );
        assert_eq!(record.to_string(), "#1 [check] a.adoc:2 broken");
        assert_eq!(record.extras().and_then(|e| e["hint"].as_str()), Some("fix it"));
    }
}
