//! Built-in extensions, run once per document during the check stage.

mod pattern_blacklist;

pub use pattern_blacklist::{BLACKLIST_KEY, PatternBlacklist};
