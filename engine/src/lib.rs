//! Probabilistic time-dependent routing.
//!
//! Predicts travel time distributions along a fixed route of road segments.
//! Each segment carries a speed profile which maps every (day of week, time interval)
//! to an empirical speed distribution. The sampling engine composes random speed draws
//! into end-to-end travel time samples and the statistics module summarizes them.
//!
//! The usual flow is
//!
//! ```no_run
//! use ptdr::{algo::{monte_carlo::Simulation, statistics::SummaryStatistics}, datastr::time::DepartureTime, import};
//!
//! let (data, _diagnostics) = import::load("edges.csv", "profiles")?;
//! let simulation = Simulation::new(&data.route, &data.profiles);
//! let mut samples = simulation.run_monte_carlo_simulation(1000, DepartureTime::new(0, 8, 0)?, false);
//! let stats = SummaryStatistics::new(&mut samples, &ptdr::algo::statistics::DEFAULT_PERCENTILES)?;
//! println!("{}", stats);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[macro_use]
pub mod report;
pub mod algo;
pub mod cli;
pub mod config;
pub mod datastr;
pub mod experiments;
pub mod export;
pub mod import;

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
