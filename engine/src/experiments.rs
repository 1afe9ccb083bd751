//! Harnesses around the simulation for design space exploration and adaptive sample counts.
//!
//! Everything a run measures is returned to the caller.
//! The harnesses hold no global state, the binaries decide what to report.

use crate::{
    import::{self, Dataset, LoadError},
    report::*,
};
use std::path::Path;

pub mod autotuning;
pub mod profiling;

/// Load the route and report what was loaded under `load`.
pub fn setup(segments_file: &Path, profile_dir: &Path) -> Result<Dataset, LoadError> {
    let _load_ctx = push_context("load".to_string());
    let (data, _diagnostics) = report_time("loading data", || import::load(segments_file, profile_dir))?;
    report!("route_length_m", data.route.length());
    report!("freeflow_travel_time_s", data.route.freeflow_travel_time());
    Ok(data)
}
