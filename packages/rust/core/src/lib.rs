//! Plugin registry and pipeline engine for the docs toolchain.
//!
//! Processing units register with a [`Registry`]; the [`PipelineRunner`]
//! executes them in registration order against a [`DocumentContext`],
//! aggregates their [`ErrorRecord`]s and derives a single pass/fail status.

pub mod document;
pub mod git;
pub mod manifest;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod report;
pub mod unit;

pub use document::{DocumentContext, ParsedDocument, Section, discover_documents};
pub use git::GitInfo;
pub use manifest::{PluginEntry, PluginManifest, Toolchain, UnitFactory};
pub use pipeline::{
    FaultPolicy, PipelineAborted, PipelineResult, PipelineRunner, RunObserver, RunStatus,
    SilentObserver, UnitReport,
};
pub use record::{ErrorRecord, Location, NewError};
pub use registry::Registry;
pub use report::Report;
pub use unit::{Unit, UnitContext, UnitKind, UnitOutcome};
