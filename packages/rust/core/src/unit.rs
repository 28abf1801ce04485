//! The contract every processing unit satisfies.

use std::path::Path;

use docs_toolchain_shared::{Result, ToolchainConfig, ToolchainError};
use serde::Serialize;

use crate::document::DocumentContext;
use crate::record::{ErrorRecord, NewError};
use crate::registry::Registry;

// ---------------------------------------------------------------------------
// UnitKind
// ---------------------------------------------------------------------------

/// Which registry a unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Runs once per document during the check stage and only reports records.
    Extension,
    /// Top-level pre-build step; its outcome also decides the stage exit code.
    Process,
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extension => write!(f, "extension"),
            Self::Process => write!(f, "process"),
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A registered processing step.
///
/// Problems found in document content must be returned as records built with
/// [`UnitContext::create_error`]. Returning `Err` (or panicking) signals an
/// internal fault; whether that aborts the run is the runner's decision.
pub trait Unit: Send + Sync {
    /// Stable identity used for listing, config and as the default record type.
    ///
    /// Defaults to the implementing type's name.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    fn kind(&self) -> UnitKind;

    fn run(&self, ctx: &mut UnitContext<'_>) -> Result<Vec<ErrorRecord>>;
}

// ---------------------------------------------------------------------------
// UnitContext
// ---------------------------------------------------------------------------

/// Everything a unit sees during one invocation.
///
/// The document is handed out mutably: a unit that rewrites parsed state
/// changes what every later unit in the same run observes.
pub struct UnitContext<'a> {
    unit_name: &'a str,
    registry: &'a mut Registry,
    document: &'a mut DocumentContext,
    config: &'a ToolchainConfig,
    content_dir: &'a Path,
}

impl<'a> UnitContext<'a> {
    pub fn new(
        unit_name: &'a str,
        registry: &'a mut Registry,
        document: &'a mut DocumentContext,
        config: &'a ToolchainConfig,
        content_dir: &'a Path,
    ) -> Self {
        Self {
            unit_name,
            registry,
            document,
            config,
            content_dir,
        }
    }

    pub fn unit_name(&self) -> &str {
        self.unit_name
    }

    pub fn document(&self) -> &DocumentContext {
        &*self.document
    }

    pub fn document_mut(&mut self) -> &mut DocumentContext {
        &mut *self.document
    }

    pub fn config(&self) -> &ToolchainConfig {
        self.config
    }

    pub fn content_dir(&self) -> &Path {
        self.content_dir
    }

    /// Issue a record. The type defaults to this unit's name.
    pub fn create_error(&mut self, draft: NewError) -> ErrorRecord {
        self.registry.create_error(self.unit_name, draft)
    }

    /// Build a fault attributed to this unit.
    pub fn fault(&self, msg: impl Into<String>) -> ToolchainError {
        ToolchainError::unit(self.unit_name, msg)
    }
}

// ---------------------------------------------------------------------------
// UnitOutcome
// ---------------------------------------------------------------------------

/// Typed result of one unit invocation.
#[derive(Debug)]
pub enum UnitOutcome {
    /// Ran to completion and found nothing.
    Passed,
    /// Ran to completion and reported records.
    Failed(Vec<ErrorRecord>),
    /// Internal fault; nothing it produced is kept.
    Faulted(ToolchainError),
}

impl UnitOutcome {
    /// Process-style exit code for this invocation alone.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Passed => 0,
            Self::Failed(_) | Self::Faulted(_) => 1,
        }
    }
}

impl From<Result<Vec<ErrorRecord>>> for UnitOutcome {
    fn from(result: Result<Vec<ErrorRecord>>) -> Self {
        match result {
            Ok(errors) if errors.is_empty() => Self::Passed,
            Ok(errors) => Self::Failed(errors),
            Err(fault) => Self::Faulted(fault),
        }
    }
}
