//! Run report consumed by console output and CI tooling.

use docs_toolchain_shared::{Result, ToolchainError};
use serde::Serialize;

use crate::git::GitInfo;
use crate::pipeline::{PipelineAborted, PipelineResult, RunStatus, UnitReport};
use crate::record::ErrorRecord;

/// Everything a reporter needs about a finished (or aborted) stage.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub git: GitInfo,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted_in: Option<&'a str>,
    pub units: &'a [UnitReport],
    pub errors: &'a [ErrorRecord],
}

impl<'a> Report<'a> {
    pub fn completed(git: GitInfo, result: &'a PipelineResult) -> Self {
        Self {
            git,
            status: result.status(),
            aborted_in: None,
            units: result.units(),
            errors: result.errors(),
        }
    }

    pub fn aborted(git: GitInfo, aborted: &'a PipelineAborted) -> Self {
        Self {
            git,
            status: aborted.status(),
            aborted_in: Some(aborted.unit.as_str()),
            units: aborted.partial.units(),
            errors: aborted.partial.errors(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ToolchainError::parse(format!("failed to serialize report: {e}")))
    }

    /// One line per record, then a summary line.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for record in self.errors {
            out.push_str(&format!("[{}]", record.error_type()));
            if let Some(location) = record.location() {
                out.push_str(&format!(" {location}"));
            }
            out.push_str(&format!(" {}\n", record.msg()));
        }

        let faults = self.units.iter().filter(|u| u.fault.is_some()).count();
        out.push_str(&format!(
            "{} error(s), {} unit run(s), {} fault(s)",
            self.errors.len(),
            self.units.len(),
            faults
        ));
        if let Some(unit) = self.aborted_in {
            out.push_str(&format!(", aborted in '{unit}'"));
        }
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use docs_toolchain_shared::ToolchainConfig;

    use super::*;
    use crate::document::DocumentContext;
    use crate::pipeline::{FaultPolicy, PipelineRunner};
    use crate::record::{Location, NewError};
    use crate::registry::Registry;
    use crate::unit::{Unit, UnitContext, UnitKind};

    struct Flags;
    struct Breaks;

    impl Unit for Flags {
        fn name(&self) -> &str {
            "flags"
        }

        fn kind(&self) -> UnitKind {
            UnitKind::Extension
        }

        fn run(&self, ctx: &mut UnitContext<'_>) -> Result<Vec<ErrorRecord>> {
            let docfile = ctx.document().docfile().to_string();
            Ok(vec![
                ctx.create_error(NewError::new("first").at(Location::line(&docfile, 1))),
                ctx.create_error(NewError::new("whole file").at(Location::file(&docfile))),
            ])
        }
    }

    impl Unit for Breaks {
        fn name(&self) -> &str {
            "breaks"
        }

        fn kind(&self) -> UnitKind {
            UnitKind::Extension
        }

        fn run(&self, ctx: &mut UnitContext<'_>) -> Result<Vec<ErrorRecord>> {
            Err(ctx.fault("cannot continue"))
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new(UnitKind::Extension);
        registry.register(Flags);
        registry.register(Breaks);
        registry
    }

    #[test]
    fn text_report_lists_records_and_summary() {
        let config = ToolchainConfig::defaults();
        let mut document = DocumentContext::from_source("index.adoc", "line");
        let result = PipelineRunner::new(&config, Path::new("."))
            .run(&mut registry(), &mut document)
            .expect("run");

        let text = Report::completed(GitInfo::unavailable(), &result).render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "[flags] index.adoc:1 first");
        assert_eq!(lines[1], "[flags] index.adoc whole file");
        assert_eq!(lines[2], "2 error(s), 2 unit run(s), 1 fault(s)");
    }

    #[test]
    fn json_report_carries_status_and_git() {
        let config = ToolchainConfig::defaults();
        let mut document = DocumentContext::from_source("index.adoc", "line");
        let aborted = PipelineRunner::new(&config, Path::new("."))
            .policy(FaultPolicy::Abort)
            .run(&mut registry(), &mut document)
            .unwrap_err();

        let json = Report::aborted(GitInfo::unavailable(), &aborted)
            .to_json()
            .expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["status"], "failure");
        assert_eq!(value["aborted_in"], "breaks");
        assert_eq!(value["git"]["commit"], "<N/A>");
        assert_eq!(value["errors"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["errors"][0]["id"], 1);
    }
}
