//! Toolchain configuration.
//!
//! Configuration is an untyped TOML table addressed by dotted keys
//! (`checkers.pattern.blacklist`). A lookup returns a value or nothing;
//! deciding what a missing key means is up to the caller.
//!
//! Built-in defaults are merged beneath whichever user file is found first:
//! `--config` flag, `$TOOLCHAIN_CONFIG`, `<content>/toolchain.toml`,
//! `~/.docs-toolchain/toolchain.toml`.

use std::path::{Path, PathBuf};

use toml::{Table, Value};

use crate::error::{Result, ToolchainError};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "toolchain.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "TOOLCHAIN_CONFIG";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docs-toolchain";

const DEFAULT_CONFIG: &str = r#"
[checkers.pattern]
blacklist = "blacklist.txt"

[pre.js]
header = "docinfo.html"
footer = "docinfo-footer.html"

[plugins]
disabled = []
"#;

// ---------------------------------------------------------------------------
// ToolchainConfig
// ---------------------------------------------------------------------------

/// Resolved configuration: built-in defaults with the user file merged on top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolchainConfig {
    table: Table,
}

impl ToolchainConfig {
    /// Built-in defaults only.
    pub fn defaults() -> Self {
        // The embedded document is covered by tests; an empty table is the
        // only sensible fallback.
        let table = DEFAULT_CONFIG.parse::<Table>().unwrap_or_default();
        Self { table }
    }

    /// A config holding exactly `table`, without defaults.
    pub fn from_table(table: Table) -> Self {
        Self { table }
    }

    /// Parse a user TOML document and merge it over the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let overlay = content
            .parse::<Table>()
            .map_err(|e| ToolchainError::config(format!("invalid TOML: {e}")))?;
        let mut config = Self::defaults();
        config.merge(overlay);
        Ok(config)
    }

    /// Look up a value by dotted key. Returns `None` when any segment is missing
    /// or an intermediate value is not a table.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut segments = key.split('.');
        let mut current = self.table.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    /// String array lookup. Non-string elements are ignored.
    pub fn get_str_list(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Deep-merge `overlay` into this config. Tables merge key by key; any other
    /// value in `overlay` replaces the existing one.
    pub fn merge(&mut self, overlay: Table) {
        merge_tables(&mut self.table, overlay);
    }

    /// Render the resolved configuration as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(&self.table).map_err(|e| ToolchainError::config(e.to_string()))
    }
}

fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match value {
            Value::Table(incoming) => {
                if let Some(Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                    continue;
                }
                base.insert(key, Value::Table(incoming));
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the user config directory (`~/.docs-toolchain/`).
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME))
}

/// Pick the config file to load.
///
/// An explicit path or `$TOOLCHAIN_CONFIG` is returned as-is, even if it does
/// not exist, so the loader can report it. The fallbacks are only returned
/// when the file is present.
pub fn resolve_config_path(explicit: Option<&Path>, content_dir: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let local = content_dir.join(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

/// Load the configuration for a run. Returns defaults if no file is found.
pub fn load_config(explicit: Option<&Path>, content_dir: &Path) -> Result<ToolchainConfig> {
    match resolve_config_path(explicit, content_dir) {
        Some(path) => load_config_from(&path),
        None => {
            tracing::debug!(content = ?content_dir, "no config file found, using defaults");
            Ok(ToolchainConfig::defaults())
        }
    }
}

/// Load the configuration from a specific file path, merged over the defaults.
pub fn load_config_from(path: &Path) -> Result<ToolchainConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ToolchainError::io(path, e))?;

    let config = ToolchainConfig::from_toml_str(&content).map_err(|e| {
        ToolchainError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    tracing::debug!(?path, "loaded config file");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let config = ToolchainConfig::defaults();
        assert_eq!(
            config.get_str("checkers.pattern.blacklist"),
            Some("blacklist.txt")
        );
        assert_eq!(config.get_str("pre.js.header"), Some("docinfo.html"));
        assert!(config.get_str_list("plugins.disabled").is_empty());
    }

    #[test]
    fn dotted_lookup_returns_none_for_missing_keys() {
        let config = ToolchainConfig::defaults();
        assert!(config.get("checkers.pattern.whitelist").is_none());
        assert!(config.get("nonexistent").is_none());
        assert!(config.get("").is_none());
        // Walking through a non-table value yields nothing.
        assert!(config.get("checkers.pattern.blacklist.deeper").is_none());
    }

    #[test]
    fn user_file_merges_over_defaults() {
        let config = ToolchainConfig::from_toml_str(
            r#"
[checkers.pattern]
blacklist = "rules/forbidden.txt"

[notify.slack]
file = "/tmp/slack.json"
"#,
        )
        .expect("parse");

        assert_eq!(
            config.get_str("checkers.pattern.blacklist"),
            Some("rules/forbidden.txt")
        );
        // Untouched defaults survive the merge.
        assert_eq!(config.get_str("pre.js.footer"), Some("docinfo-footer.html"));
        assert_eq!(config.get_str("notify.slack.file"), Some("/tmp/slack.json"));
    }

    #[test]
    fn scalar_overlay_replaces_table() {
        let mut config = ToolchainConfig::defaults();
        let overlay: Table = "pre = false".parse().expect("parse");
        config.merge(overlay);
        assert_eq!(config.get_bool("pre"), Some(false));
        assert!(config.get("pre.js.header").is_none());
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = ToolchainConfig::from_toml_str("[checkers").unwrap_err();
        assert!(matches!(err, ToolchainError::Config { .. }));
    }

    #[test]
    fn content_local_file_is_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[plugins]\ndisabled = [\"combine-js\"]\n",
        )
        .expect("write config");

        let config = load_config_from(&dir.path().join(CONFIG_FILE_NAME)).expect("load");
        assert_eq!(config.get_str_list("plugins.disabled"), vec!["combine-js"]);
    }

    #[test]
    fn explicit_missing_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        let err = load_config(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(err, ToolchainError::Io { .. }));
    }

    #[test]
    fn resolved_config_renders_as_toml() {
        let rendered = ToolchainConfig::defaults().to_toml_string().expect("render");
        assert!(rendered.contains("blacklist"));
    }
}
