//! Choosing the sample count from the unpredictability of the route.
//!
//! A first batch of samples yields the coefficient of variation,
//! a `SampleCountTuner` maps it to the number of samples the answer should be based on
//! and only the missing samples are drawn afterwards.

use crate::{
    algo::{
        monte_carlo::Simulation,
        statistics::{StatisticsError, SummaryStatistics},
    },
    datastr::time::DepartureTime,
};

/// Used when no bands are configured
pub const DEFAULT_SAMPLE_BANDS: [(f64, usize); 3] = [(0.02, 100), (0.05, 500), (0.1, 1000)];

pub trait SampleCountTuner {
    /// Requested number of samples for the given coefficient of variation.
    /// `None` when the feature could not be computed.
    fn sample_count(&mut self, unpredictability: Option<f64>) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSampleCount(pub usize);

impl SampleCountTuner for FixedSampleCount {
    fn sample_count(&mut self, _: Option<f64>) -> usize {
        self.0
    }
}

/// Picks the sample count of the first band whose threshold is not below the feature.
/// Beyond the last band, and without a feature, `fallback` is used.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientBands {
    bands: Vec<(f64, usize)>,
    fallback: usize,
}

impl CoefficientBands {
    pub fn new(bands: Vec<(f64, usize)>, fallback: usize) -> CoefficientBands {
        assert!(bands.windows(2).all(|pair| pair[0].0 < pair[1].0), "bands must be ascending");
        CoefficientBands { bands, fallback }
    }
}

impl SampleCountTuner for CoefficientBands {
    fn sample_count(&mut self, unpredictability: Option<f64>) -> usize {
        unpredictability
            .and_then(|cv| self.bands.iter().find(|&&(threshold, _)| cv <= threshold))
            .map_or(self.fallback, |&(_, samples)| samples)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutotuningContext {
    pub feature_samples: usize,
    pub percentiles: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutotuningResult {
    pub unpredictability: Option<f64>,
    pub requested_samples: usize,
    /// Additional samples first, then the feature samples
    pub travel_times: Vec<f64>,
    pub stats: SummaryStatistics,
}

impl AutotuningContext {
    pub fn run(&self, simulation: &Simulation, tuner: &mut impl SampleCountTuner, departure: DepartureTime) -> Result<AutotuningResult, StatisticsError> {
        let feature_travel_times = simulation.run_monte_carlo_simulation(self.feature_samples, departure, false);
        let unpredictability = SummaryStatistics::new(&mut feature_travel_times.clone(), &[])?.variation_coefficient;

        let requested_samples = tuner.sample_count(unpredictability);
        let mut travel_times = simulation.run_monte_carlo_simulation(requested_samples.saturating_sub(self.feature_samples), departure, false);
        travel_times.extend(feature_travel_times);

        let mut sorted = travel_times.clone();
        let stats = SummaryStatistics::new(&mut sorted, &self.percentiles)?;

        Ok(AutotuningResult {
            unpredictability,
            requested_samples,
            travel_times,
            stats,
        })
    }
}
