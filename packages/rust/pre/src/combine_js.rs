//! Combine JavaScript referenced from the docinfo HTML files into one blob.
//!
//! For each of the header and footer docinfo files, every external
//! `<script src>` is read and concatenated into `js/<stem>_blob.js` next to
//! the HTML file. The last script tag is then pointed at the blob and the
//! other script tags are dropped.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use docs_toolchain_core::{ErrorRecord, Location, NewError, Unit, UnitContext, UnitKind};
use docs_toolchain_shared::{Result, ToolchainError};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};

/// Config key for the header docinfo file, relative to the content directory.
pub const HEADER_KEY: &str = "pre.js.header";
/// Config key for the footer docinfo file, relative to the content directory.
pub const FOOTER_KEY: &str = "pre.js.footer";

const BLOB_DIR: &str = "js";
const BLOB_SEPARATOR: &str = "\n\n";

static SCRIPT_SRC_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<script\s[^>]*src=['"]([a-zA-Z0-9_./-]+)['"][^>]*>"#).unwrap()
});

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

/// Pre-build process bundling docinfo scripts.
#[derive(Debug, Default)]
pub struct CombineJs;

impl CombineJs {
    pub fn factory() -> Arc<dyn Unit> {
        Arc::new(Self)
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    fn combine_file(&self, ctx: &mut UnitContext<'_>, path: &Path) -> Result<Vec<ErrorRecord>> {
        let html = std::fs::read_to_string(path).map_err(|e| ToolchainError::io(path, e))?;
        let base = path.parent().unwrap_or(Path::new("."));
        let scan = scan_scripts(&html, base)?;

        let file = path.to_string_lossy().into_owned();
        let errors: Vec<ErrorRecord> = scan
            .missing
            .iter()
            .map(|src| {
                ctx.create_error(
                    NewError::new(format!("script source not found: {src}"))
                        .at(Location::file(&file)),
                )
            })
            .collect();

        if scan.sources.is_empty() {
            debug!("no external scripts, leaving file untouched");
            return Ok(errors);
        }

        let mut blob = Vec::with_capacity(scan.sources.len());
        for source in &scan.sources {
            blob.push(std::fs::read_to_string(source).map_err(|e| ToolchainError::io(source, e))?);
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| ctx.fault(format!("no file name in {}", path.display())))?;
        let blob_relative = format!("{BLOB_DIR}/{stem}_blob.js");
        let blob_path = base.join(&blob_relative);
        if let Some(dir) = blob_path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| ToolchainError::io(dir, e))?;
        }
        std::fs::write(&blob_path, format!("{}\n", blob.join(BLOB_SEPARATOR)))
            .map_err(|e| ToolchainError::io(&blob_path, e))?;

        match replace_script_tags(&html, &scan.tags, &blob_relative) {
            Some(rewritten) => {
                std::fs::write(path, rewritten).map_err(|e| ToolchainError::io(path, e))?;
                info!(
                    scripts = scan.sources.len(),
                    blob = %blob_path.display(),
                    "inserted blob script tag"
                );
            }
            None => warn!("script tags span lines, html left unchanged"),
        }
        Ok(errors)
    }
}

impl Unit for CombineJs {
    fn name(&self) -> &str {
        "combine-js"
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Process
    }

    fn run(&self, ctx: &mut UnitContext<'_>) -> Result<Vec<ErrorRecord>> {
        let mut errors = Vec::new();
        for key in [HEADER_KEY, FOOTER_KEY] {
            let Some(relative) = ctx.config().get_str(key) else {
                debug!(key, "not configured, skipping");
                continue;
            };
            let path = ctx.content_dir().join(relative);
            if !path.is_file() {
                debug!(path = %path.display(), "docinfo file not found, skipping");
                continue;
            }
            info!(path = %path.display(), "combining scripts");
            errors.extend(self.combine_file(ctx, &path)?);
        }
        Ok(errors)
    }
}

// ---------------------------------------------------------------------------
// Scanning and rewriting
// ---------------------------------------------------------------------------

/// External scripts referenced by an HTML file.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScriptScan {
    /// Existing script files in document order, resolved against the HTML directory.
    pub sources: Vec<PathBuf>,
    /// `src` values that do not resolve to a file.
    pub missing: Vec<String>,
    /// Every `src` value of a live external script tag, in document order.
    pub tags: Vec<String>,
}

/// Collect the `src` of every `<script>` in `html`. Tags without `src`, or
/// with an inline body, are skipped.
pub fn scan_scripts(html: &str, base: &Path) -> Result<ScriptScan> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script")
        .map_err(|e| ToolchainError::parse(format!("script selector: {e}")))?;

    let mut scan = ScriptScan::default();
    for script in document.select(&selector) {
        let Some(src) = script.value().attr("src") else {
            debug!("skipping script tag without src attribute");
            continue;
        };
        if script.children().next().is_some() {
            debug!(src, "skipping script tag with inline body");
            continue;
        }
        scan.tags.push(src.to_string());
        let resolved = base.join(src);
        if resolved.is_file() {
            scan.sources.push(resolved);
        } else {
            debug!(src, "script source not found");
            scan.missing.push(src.to_string());
        }
    }
    Ok(scan)
}

/// Point the last single-line `<script src>` tag at `blob_src` and drop the
/// others. Only tags outside HTML comments whose `src` is in `live` count.
/// Returns `None` when no such tag exists.
fn replace_script_tags(html: &str, live: &[String], blob_src: &str) -> Option<String> {
    let lines: Vec<&str> = html.lines().collect();
    let mut in_comment = false;
    let mut tagged = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let text = uncommented(line, &mut in_comment);
        let is_live_tag = SCRIPT_SRC_TAG
            .captures_iter(&text)
            .any(|caps| live.iter().any(|src| *src == caps[1]));
        if is_live_tag {
            tagged.push(index);
        }
    }
    let last = *tagged.last()?;

    let blob_tag = format!(r#"<script src="{blob_src}"></script>"#);
    let mut out = String::with_capacity(html.len());
    for (index, line) in lines.iter().enumerate() {
        if index == last {
            out.push_str(&blob_tag);
        } else if tagged.contains(&index) {
            continue;
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    Some(out)
}

/// The parts of `line` outside HTML comments. `in_comment` carries the
/// comment state from one line to the next.
fn uncommented(line: &str, in_comment: &mut bool) -> String {
    let mut text = String::new();
    let mut rest = line;
    loop {
        if *in_comment {
            let Some(end) = rest.find(COMMENT_CLOSE) else {
                return text;
            };
            rest = &rest[end + COMMENT_CLOSE.len()..];
            *in_comment = false;
        } else {
            let Some(start) = rest.find(COMMENT_OPEN) else {
                text.push_str(rest);
                return text;
            };
            text.push_str(&rest[..start]);
            rest = &rest[start + COMMENT_OPEN.len()..];
            *in_comment = true;
        }
    }
}
