//! Pipeline runner: executes every registered unit against one document.
//!
//! Units run strictly in registration order, one at a time. Records from all
//! units are aggregated; an earlier unit's findings never skip a later unit.
//! A unit fault is either recovered (logged, contributes nothing) or fatal,
//! depending on the [`FaultPolicy`] the runner was built with.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

use docs_toolchain_shared::{ToolchainConfig, ToolchainError};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::document::DocumentContext;
use crate::record::ErrorRecord;
use crate::registry::Registry;
use crate::unit::{Unit, UnitContext, UnitKind, UnitOutcome};

// ---------------------------------------------------------------------------
// Policy and status
// ---------------------------------------------------------------------------

/// What to do when a unit faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
    /// Log the fault, treat the unit as having found nothing, keep going.
    #[default]
    Recover,
    /// Stop the run at the faulting unit and hand the fault to the caller.
    Abort,
}

impl FaultPolicy {
    /// `--debug` turns faults fatal.
    pub fn from_debug(debug: bool) -> Self {
        if debug { Self::Abort } else { Self::Recover }
    }
}

/// Overall outcome of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
    /// Units were enumerated, nothing ran.
    Listed,
}

impl RunStatus {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Listed => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Per-unit summary of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub name: String,
    pub kind: UnitKind,
    pub document: String,
    pub error_count: usize,
    /// Process-style exit code of this invocation alone.
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(elapsed: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(elapsed.as_millis())
}

/// Aggregated records of one or more runs, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineResult {
    errors: Vec<ErrorRecord>,
    units: Vec<UnitReport>,
}

impl PipelineResult {
    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ErrorRecord> {
        self.errors
    }

    pub fn units(&self) -> &[UnitReport] {
        &self.units
    }

    /// Failure iff any record was reported.
    pub fn status(&self) -> RunStatus {
        if self.errors.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::Failure
        }
    }

    /// Failure iff any unit exited nonzero, recovered faults included.
    /// Process stages decide continuation from this.
    pub fn unit_status(&self) -> RunStatus {
        if self.units.iter().all(|unit| unit.exit_code == 0) {
            RunStatus::Success
        } else {
            RunStatus::Failure
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == RunStatus::Success
    }

    pub fn exit_code(&self) -> i32 {
        self.status().exit_code()
    }

    /// Append another run's output after this one's.
    pub fn merge(&mut self, other: PipelineResult) {
        self.errors.extend(other.errors);
        self.units.extend(other.units);
    }
}

/// A fault that stopped the run under [`FaultPolicy::Abort`].
#[derive(Debug, thiserror::Error)]
#[error("pipeline aborted in unit '{unit}'")]
pub struct PipelineAborted {
    pub unit: String,
    #[source]
    pub source: ToolchainError,
    /// Everything gathered before the faulting unit.
    pub partial: PipelineResult,
}

impl PipelineAborted {
    pub fn status(&self) -> RunStatus {
        RunStatus::Failure
    }
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Progress callbacks. Purely observational.
pub trait RunObserver {
    /// Called before the first unit of a run.
    fn document_started(&self, document: &str);
    /// Called before a unit is invoked.
    fn unit_started(&self, kind: UnitKind, name: &str);
    /// Called once a unit has returned, faulted or panicked.
    fn unit_finished(&self, report: &UnitReport);
}

/// No-op observer for headless/test usage.
pub struct SilentObserver;

impl RunObserver for SilentObserver {
    fn document_started(&self, _document: &str) {}
    fn unit_started(&self, _kind: UnitKind, _name: &str) {}
    fn unit_finished(&self, _report: &UnitReport) {}
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Runs a registry's units against a document.
pub struct PipelineRunner<'a> {
    config: &'a ToolchainConfig,
    content_dir: &'a Path,
    policy: FaultPolicy,
    observer: &'a dyn RunObserver,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(config: &'a ToolchainConfig, content_dir: &'a Path) -> Self {
        Self {
            config,
            content_dir,
            policy: FaultPolicy::default(),
            observer: &SilentObserver,
        }
    }

    pub fn policy(mut self, policy: FaultPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn observer(mut self, observer: &'a dyn RunObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Run every unit registered at call time, in order.
    ///
    /// Records issued by a unit that then faults are discarded with the rest
    /// of its output, so ids in the result may skip.
    #[instrument(skip_all, fields(kind = %registry.kind(), document = %document.docfile()))]
    pub fn run(
        &self,
        registry: &mut Registry,
        document: &mut DocumentContext,
    ) -> Result<PipelineResult, PipelineAborted> {
        let units = registry.snapshot();
        let mut result = PipelineResult::default();
        let docfile = document.docfile().to_string();

        info!(units = units.len(), "starting pipeline run");
        self.observer.document_started(&docfile);

        for unit in units {
            let name = unit.name().to_string();
            self.observer.unit_started(unit.kind(), &name);

            let start = Instant::now();
            let outcome = {
                let mut ctx =
                    UnitContext::new(&name, registry, document, self.config, self.content_dir);
                invoke(&unit, &name, &mut ctx)
            };
            let mut report = UnitReport {
                name: name.clone(),
                kind: unit.kind(),
                document: docfile.clone(),
                error_count: 0,
                exit_code: outcome.exit_code(),
                fault: None,
                elapsed: start.elapsed(),
            };

            match outcome {
                UnitOutcome::Passed => {
                    debug!(unit = %name, "unit passed");
                }
                UnitOutcome::Failed(errors) => {
                    debug!(unit = %name, errors = errors.len(), "unit reported errors");
                    report.error_count = errors.len();
                    result.errors.extend(errors);
                }
                UnitOutcome::Faulted(fault) => {
                    report.fault = Some(fault.to_string());
                    self.observer.unit_finished(&report);
                    result.units.push(report);

                    match self.policy {
                        FaultPolicy::Recover => {
                            warn!(unit = %name, error = %fault, "unit fault recovered, no errors kept");
                            continue;
                        }
                        FaultPolicy::Abort => {
                            error!(unit = %name, error = %fault, "unit fault is fatal, aborting run");
                            return Err(PipelineAborted {
                                unit: name,
                                source: fault,
                                partial: result,
                            });
                        }
                    }
                }
            }

            self.observer.unit_finished(&report);
            result.units.push(report);
        }

        info!(
            errors = result.errors.len(),
            status = ?result.status(),
            "pipeline run complete"
        );
        Ok(result)
    }
}

thread_local! {
    static IN_UNIT: Cell<bool> = const { Cell::new(false) };
}

static QUIET_HOOK: Once = Once::new();

/// Install, once per process, a panic hook that stays silent while a unit
/// runs on this thread. A caught unit panic is reported as a fault instead.
/// Panics anywhere else still reach the previous hook.
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !in_unit() {
                previous(info);
            }
        }));
    });
}

/// Whether the current thread is inside a unit's `run`.
fn in_unit() -> bool {
    IN_UNIT.with(Cell::get)
}

/// Call a unit, turning a panic into a fault.
fn invoke(unit: &Arc<dyn Unit>, name: &str, ctx: &mut UnitContext<'_>) -> UnitOutcome {
    install_quiet_hook();
    IN_UNIT.with(|flag| flag.set(true));
    let caught = catch_unwind(AssertUnwindSafe(|| unit.run(ctx)));
    IN_UNIT.with(|flag| flag.set(false));

    match caught {
        Ok(result) => UnitOutcome::from(result),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            UnitOutcome::Faulted(ToolchainError::Panicked {
                unit: name.to_string(),
                message,
            })
        }
    }
}
