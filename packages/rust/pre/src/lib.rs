//! Built-in processes for the pre-build stage.

mod combine_js;

pub use combine_js::{CombineJs, FOOTER_KEY, HEADER_KEY, ScriptScan, scan_scripts};
