//! Console reporting for sweep results.

pub mod table;

pub use table::{format_ms, render_records, render_table};
