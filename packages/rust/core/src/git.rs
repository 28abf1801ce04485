//! Git metadata for the content repository, attached to reports.

use std::path::Path;
use std::process::Command;

use chrono::DateTime;
use docs_toolchain_shared::{Result, ToolchainError};
use serde::Serialize;
use tracing::{debug, instrument};

/// Commit time format used in reports.
pub const TIME_FORMAT: &str = "%H:%M:%S %d.%m.%Y";

const UNAVAILABLE: &str = "<N/A>";
const FIELD_SEPARATOR: char = '\u{1f}';

/// Latest-commit information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitInfo {
    /// `Name <email>`
    pub author: String,
    pub commit: String,
    /// Branch or tag.
    pub branch: String,
    pub time: String,
}

impl GitInfo {
    /// Every field set to `<N/A>`.
    pub fn unavailable() -> Self {
        Self {
            author: UNAVAILABLE.into(),
            commit: UNAVAILABLE.into(),
            branch: UNAVAILABLE.into(),
            time: UNAVAILABLE.into(),
        }
    }

    /// Read HEAD of the repository at `repo`. Never fails; anything that goes
    /// wrong yields [`GitInfo::unavailable`].
    #[instrument]
    pub fn generate(repo: &Path) -> Self {
        match Self::read(repo) {
            Ok(info) => info,
            Err(e) => {
                debug!(error = %e, "error opening git repository");
                Self::unavailable()
            }
        }
    }

    fn read(repo: &Path) -> Result<Self> {
        let log = git(repo, &["log", "-1", "--format=%an%x1f%ae%x1f%H%x1f%cI"])?;
        let current = git(repo, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        let github_ref = std::env::var("GITHUB_REF").ok();
        let branch = parse_ref(github_ref.as_deref(), Some(current.as_str()))
            .unwrap_or_else(|| UNAVAILABLE.into());
        parse_log_line(&log, branch)
    }
}

fn git(repo: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .output()
        .map_err(|e| ToolchainError::io(repo, e))?;

    if !output.status.success() {
        return Err(ToolchainError::parse(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn parse_log_line(line: &str, branch: String) -> Result<GitInfo> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    let [name, email, commit, date] = fields.as_slice() else {
        return Err(ToolchainError::parse(format!("unexpected git log output: {line:?}")));
    };
    let time = DateTime::parse_from_rfc3339(date)
        .map_err(|e| ToolchainError::parse(format!("invalid commit date {date:?}: {e}")))?
        .format(TIME_FORMAT)
        .to_string();

    Ok(GitInfo {
        author: format!("{name} <{email}>"),
        commit: commit.to_string(),
        branch,
        time,
    })
}

/// Reduce a git reference such as `refs/heads/main` to its last segment.
/// Returns `fallback` when there is no reference.
pub fn parse_ref(reference: Option<&str>, fallback: Option<&str>) -> Option<String> {
    match reference {
        Some(reference) => reference.rsplit('/').next().map(str::to_string),
        None => fallback.map(str::to_string),
    }
}
