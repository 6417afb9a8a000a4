//! Command-line front end for the trajectory engine
//!
//! Loads scenario and price-history files, runs `trajectory_core` and writes
//! the ensemble summary as JSON and as a text table.

pub mod history_file;
pub mod logging;
pub mod report;
pub mod run;
pub mod scenario;
pub mod util;

pub use logging::init_logging;
pub use run::{RunOptions, run_scenario};
