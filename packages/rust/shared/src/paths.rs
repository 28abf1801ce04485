//! Content directory resolution.

use std::path::{Path, PathBuf};

use crate::error::{Result, ToolchainError};

/// Resolve the content directory for this process.
///
/// Precedence, highest first:
/// 1. `explicit` (the `--content` flag)
/// 2. `$CONTENT_PATH`
/// 3. `$GITHUB_WORKSPACE`, when `$TOOLCHAIN_TEST` or `$GITHUB_ACTIONS` is set
/// 4. `<cwd>/../content` when the working directory is named `toolchain`
/// 5. `<cwd>/content`
pub fn content_path(explicit: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(|e| ToolchainError::io(".", e))?;
    Ok(content_path_with(explicit, &cwd, |key| std::env::var(key).ok()))
}

/// [`content_path`] with the working directory and environment supplied by the caller.
pub fn content_path_with(
    explicit: Option<&Path>,
    cwd: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(path) = env("CONTENT_PATH") {
        return PathBuf::from(path);
    }
    if env("TOOLCHAIN_TEST").is_some() || env("GITHUB_ACTIONS").is_some() {
        if let Some(workspace) = env("GITHUB_WORKSPACE") {
            return PathBuf::from(workspace);
        }
    }
    if cwd.file_name().is_some_and(|name| name == "toolchain") {
        return cwd.join("..").join("content");
    }
    cwd.join("content")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_content_under_cwd() {
        let path = content_path_with(None, Path::new("/repo"), env_of(&[]));
        assert_eq!(path, PathBuf::from("/repo/content"));
    }

    #[test]
    fn toolchain_checkout_looks_at_sibling() {
        let path = content_path_with(None, Path::new("/repo/toolchain"), env_of(&[]));
        assert_eq!(path, PathBuf::from("/repo/toolchain/../content"));
    }

    #[test]
    fn ci_workspace_requires_ci_marker() {
        let env = env_of(&[("GITHUB_WORKSPACE", "/github/workspace")]);
        assert_eq!(
            content_path_with(None, Path::new("/repo"), env),
            PathBuf::from("/repo/content")
        );

        let env = env_of(&[
            ("GITHUB_WORKSPACE", "/github/workspace"),
            ("GITHUB_ACTIONS", "true"),
        ]);
        assert_eq!(
            content_path_with(None, Path::new("/repo"), env),
            PathBuf::from("/github/workspace")
        );
    }

    #[test]
    fn content_path_env_beats_ci_and_explicit_beats_all() {
        let env = env_of(&[
            ("CONTENT_PATH", "/docs"),
            ("GITHUB_WORKSPACE", "/github/workspace"),
            ("TOOLCHAIN_TEST", "1"),
        ]);
        assert_eq!(
            content_path_with(None, Path::new("/repo"), &env),
            PathBuf::from("/docs")
        );
        assert_eq!(
            content_path_with(Some(Path::new("/explicit")), Path::new("/repo"), &env),
            PathBuf::from("/explicit")
        );
    }
}
