//! Display formatting shared by front ends.

pub mod format;

pub use format::{format_date, format_value, progress_bar, truncate_string};
