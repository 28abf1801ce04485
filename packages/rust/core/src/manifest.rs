//! Plugin manifest and the per-invocation toolchain context.
//!
//! Membership and order of the pipeline are fixed by an explicit manifest
//! built at startup instead of whatever happens to be loaded. The manifest
//! feeds a [`Toolchain`], which owns exactly one [`Registry`] per unit kind.

use std::sync::Arc;

use docs_toolchain_shared::ToolchainConfig;
use tracing::{debug, info};

use crate::registry::Registry;
use crate::unit::{Unit, UnitKind};

/// Config key listing plugin names to leave out.
pub const DISABLED_PLUGINS_KEY: &str = "plugins.disabled";

/// Builds a unit instance.
pub type UnitFactory = fn() -> Arc<dyn Unit>;

/// One manifest line. `kind` picks the registry without running the factory.
#[derive(Clone)]
pub struct PluginEntry {
    pub name: &'static str,
    pub kind: UnitKind,
    pub factory: UnitFactory,
}

impl std::fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginEntry")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Ordered list of plugin factories.
#[derive(Debug, Clone, Default)]
pub struct PluginManifest {
    entries: Vec<PluginEntry>,
}

impl PluginManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Duplicates are kept.
    pub fn with(mut self, name: &'static str, kind: UnitKind, factory: UnitFactory) -> Self {
        self.entries.push(PluginEntry {
            name,
            kind,
            factory,
        });
        self
    }

    pub fn entries(&self) -> &[PluginEntry] {
        &self.entries
    }

    /// Declared names of `kind`, in manifest order, disabled ones included.
    pub fn names(&self, kind: UnitKind) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.name)
            .collect()
    }

    /// Instantiate every enabled entry in order and register it with the
    /// registry of its kind. Returns how many units were registered.
    pub fn register_all(&self, toolchain: &mut Toolchain, config: &ToolchainConfig) -> usize {
        let disabled = config.get_str_list(DISABLED_PLUGINS_KEY);
        let mut registered = 0;

        for entry in &self.entries {
            if disabled.contains(&entry.name) {
                debug!(plugin = entry.name, "plugin disabled by config");
                continue;
            }
            let unit = (entry.factory)();
            toolchain.registry_mut(entry.kind).register_shared(unit);
            registered += 1;
        }

        info!(
            registered,
            extensions = toolchain.extensions.len(),
            processes = toolchain.processes.len(),
            "plugins loaded"
        );
        registered
    }
}

// ---------------------------------------------------------------------------
// Toolchain
// ---------------------------------------------------------------------------

/// Registries for one process invocation. Construct a fresh one for an
/// isolated run instead of clearing a shared instance.
#[derive(Debug)]
pub struct Toolchain {
    extensions: Registry,
    processes: Registry,
}

impl Toolchain {
    pub fn new() -> Self {
        Self {
            extensions: Registry::new(UnitKind::Extension),
            processes: Registry::new(UnitKind::Process),
        }
    }

    /// Build a toolchain populated from `manifest`.
    pub fn from_manifest(manifest: &PluginManifest, config: &ToolchainConfig) -> Self {
        let mut toolchain = Self::new();
        manifest.register_all(&mut toolchain, config);
        toolchain
    }

    pub fn registry(&self, kind: UnitKind) -> &Registry {
        match kind {
            UnitKind::Extension => &self.extensions,
            UnitKind::Process => &self.processes,
        }
    }

    pub fn registry_mut(&mut self, kind: UnitKind) -> &mut Registry {
        match kind {
            UnitKind::Extension => &mut self.extensions,
            UnitKind::Process => &mut self.processes,
        }
    }

    /// Names of the registered units of `kind`, in execution order.
    pub fn list(&self, kind: UnitKind) -> Vec<String> {
        self.registry(kind)
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Reset both registries.
    pub fn clear(&mut self) {
        self.extensions.clear();
        self.processes.clear();
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::new()
    }
}
