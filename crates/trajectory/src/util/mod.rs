//! Shared utility functions for the trajectory CLI

pub mod format;
pub mod io;

pub use format::{format_currency_short, format_percentage, format_percentile_label};
pub use io::atomic_write;
