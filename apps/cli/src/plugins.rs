//! Built-in plugin manifest. Order here is execution order.

use docs_toolchain_core::{PluginManifest, UnitKind};
use docs_toolchain_extensions::PatternBlacklist;
use docs_toolchain_pre::CombineJs;

pub(crate) fn builtin() -> PluginManifest {
    PluginManifest::new()
        .with("pattern-blacklist", UnitKind::Extension, PatternBlacklist::factory)
        .with("combine-js", UnitKind::Process, CombineJs::factory)
}
