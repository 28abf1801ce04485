//! Pattern blacklist checker.
//!
//! Flags every source line matching one of the patterns in the configured
//! blacklist file. The file holds one `/regex/` per line; anything else in
//! it is ignored.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docs_toolchain_core::{ErrorRecord, Location, NewError, Unit, UnitContext, UnitKind};
use docs_toolchain_shared::{Result, ToolchainError};
use regex::Regex;
use tracing::{debug, instrument};

/// Config key holding the blacklist path, relative to the content directory.
pub const BLACKLIST_KEY: &str = "checkers.pattern.blacklist";

/// Rejects lines matching a blacklisted pattern.
#[derive(Debug, Default)]
pub struct PatternBlacklist {
    /// Overrides the configured file.
    blacklist_file: Option<PathBuf>,
}

impl PatternBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `path` instead of looking the file up in config.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            blacklist_file: Some(path.into()),
        }
    }

    pub fn factory() -> Arc<dyn Unit> {
        Arc::new(Self::new())
    }

    fn blacklist_path(&self, ctx: &UnitContext<'_>) -> Option<PathBuf> {
        if let Some(path) = &self.blacklist_file {
            return Some(path.clone());
        }
        ctx.config()
            .get_str(BLACKLIST_KEY)
            .map(|relative| ctx.content_dir().join(relative))
    }
}

impl Unit for PatternBlacklist {
    fn name(&self) -> &str {
        "pattern-blacklist"
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Extension
    }

    #[instrument(skip_all, fields(document = %ctx.document().docfile()))]
    fn run(&self, ctx: &mut UnitContext<'_>) -> Result<Vec<ErrorRecord>> {
        let Some(path) = self.blacklist_path(ctx) else {
            debug!(key = BLACKLIST_KEY, "no blacklist configured, skipping");
            return Ok(Vec::new());
        };
        if !path.is_file() {
            debug!(path = %path.display(), "blacklist file not found, skipping");
            return Ok(Vec::new());
        }
        debug!(path = %path.display(), "using blacklist file");

        let patterns = load_patterns(&path)?;
        let docfile = ctx.document().docfile().to_string();

        let mut hits = Vec::new();
        for (number, line) in ctx.document().numbered_lines() {
            for pattern in &patterns {
                if pattern.is_match(line) {
                    hits.push((number, pattern.as_str().to_string()));
                }
            }
        }

        let errors = hits
            .into_iter()
            .map(|(number, pattern)| {
                ctx.create_error(
                    NewError::new(format!("Illegal pattern in line {number}: /{pattern}/"))
                        .at(Location::line(&docfile, number)),
                )
            })
            .collect();
        Ok(errors)
    }
}

/// Read `/regex/` lines from `path` in file order.
fn load_patterns(path: &Path) -> Result<Vec<Regex>> {
    let content = std::fs::read_to_string(path).map_err(|e| ToolchainError::io(path, e))?;
    content
        .lines()
        .filter_map(pattern_body)
        .map(|body| {
            Regex::new(body).map_err(|e| ToolchainError::Pattern {
                pattern: body.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

fn pattern_body(line: &str) -> Option<&str> {
    line.strip_prefix('/')?
        .strip_suffix('/')
        .filter(|body| !body.is_empty())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use docs_toolchain_core::{DocumentContext, FaultPolicy, PipelineRunner, Registry};
    use docs_toolchain_shared::ToolchainConfig;
    use tempfile::TempDir;

    use super::*;

    fn content_with_blacklist(patterns: &str) -> TempDir {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("blacklist.txt"), patterns).expect("write blacklist");
        dir
    }

    fn check(
        content: &Path,
        config: &ToolchainConfig,
        source: &str,
    ) -> std::result::Result<Vec<ErrorRecord>, String> {
        let mut registry = Registry::new(UnitKind::Extension);
        registry.register(PatternBlacklist::new());
        let mut document = DocumentContext::from_source("index.adoc", source);
        PipelineRunner::new(config, content)
            .policy(FaultPolicy::Abort)
            .run(&mut registry, &mut document)
            .map(|result| result.into_errors())
            .map_err(|aborted| aborted.source.to_string())
    }

    #[test]
    fn flags_matching_line() {
        let content = content_with_blacklist("/bar/\n");
        let errors = check(
            content.path(),
            &ToolchainConfig::defaults(),
            "foo bar\nbaz",
        )
        .expect("run");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].msg(), "Illegal pattern in line 1: /bar/");
        assert_eq!(errors[0].error_type(), "pattern-blacklist");
        assert_eq!(errors[0].location(), Some(&Location::line("index.adoc", 1)));
    }

    #[test]
    fn orders_by_line_then_pattern() {
        let content = content_with_blacklist("/b/\n# comment\n/a/\nnot a pattern\n");
        let errors = check(
            content.path(),
            &ToolchainConfig::defaults(),
            "a b\nb\nzzz\na",
        )
        .expect("run");

        let messages: Vec<&str> = errors.iter().map(ErrorRecord::msg).collect();
        assert_eq!(
            messages,
            vec![
                "Illegal pattern in line 1: /b/",
                "Illegal pattern in line 1: /a/",
                "Illegal pattern in line 2: /b/",
                "Illegal pattern in line 4: /a/",
            ]
        );
        let ids: Vec<u64> = errors.iter().map(ErrorRecord::id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn missing_file_skips_quietly() {
        let content = TempDir::new().expect("tempdir");
        let errors = check(
            content.path(),
            &ToolchainConfig::defaults(),
            "foo bar",
        )
        .expect("run");
        assert!(errors.is_empty());
    }

    #[test]
    fn missing_config_key_skips_quietly() {
        let content = content_with_blacklist("/bar/\n");
        let config = ToolchainConfig::from_table(Default::default());
        let errors = check(content.path(), &config, "foo bar").expect("run");
        assert!(errors.is_empty());
    }

    #[test]
    fn configured_path_is_relative_to_content() {
        let content = TempDir::new().expect("tempdir");
        fs::create_dir_all(content.path().join("rules")).expect("mkdir");
        fs::write(content.path().join("rules/forbidden.txt"), "/TODO/\n").expect("write");
        let config =
            ToolchainConfig::from_toml_str("[checkers.pattern]\nblacklist = \"rules/forbidden.txt\"\n")
                .expect("parse");

        let errors = check(content.path(), &config, "ok\nTODO: write this").expect("run");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].location().and_then(|l| l.line), Some(2));
    }

    #[test]
    fn invalid_pattern_is_a_fault() {
        let content = content_with_blacklist("/(unclosed/\n");
        let fault = check(
            content.path(),
            &ToolchainConfig::defaults(),
            "anything",
        )
        .unwrap_err();
        assert!(fault.contains("invalid pattern"));
    }

    #[test]
    fn explicit_file_overrides_config() {
        let content = content_with_blacklist("/foo/\n");
        let other = TempDir::new().expect("tempdir");
        let explicit = other.path().join("mine.txt");
        fs::write(&explicit, "/baz/\n").expect("write");

        let mut registry = Registry::new(UnitKind::Extension);
        registry.register(PatternBlacklist::with_file(&explicit));
        let mut document = DocumentContext::from_source("index.adoc", "foo\nbaz");
        let config = ToolchainConfig::defaults();
        let result = PipelineRunner::new(&config, content.path())
            .run(&mut registry, &mut document)
            .expect("run");

        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].msg(), "Illegal pattern in line 2: /baz/");
    }

    #[test]
    fn pattern_body_requires_slashes() {
        assert_eq!(pattern_body("/foo/"), Some("foo"));
        assert_eq!(pattern_body("//"), None);
        assert_eq!(pattern_body("/foo"), None);
        assert_eq!(pattern_body("foo/"), None);
    }
}
