//! Repeated simulations to measure the accuracy and cost of a sample count.
//!
//! The error of a configuration is the largest coefficient of variation
//! any requested percentile shows over the repetitions.
//! The unpredictability of a route is the median coefficient of variation of many small runs.

use crate::{
    algo::{
        monte_carlo::Simulation,
        statistics::{coefficient_of_variation, OnePassMoments, StatisticsError, SummaryStatistics},
    },
    datastr::time::DepartureTime,
    report::benchmark::measure,
};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ProfilingContext {
    pub repetitions: usize,
    /// Samples per run for the unpredictability feature
    pub feature_samples: usize,
    pub percentiles: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfilingResult {
    /// Percentile values of every repetition, per requested percentile
    pub series: Vec<(f64, Vec<f64>)>,
    /// `None` if no series had a meaningful coefficient of variation
    pub error: Option<f64>,
    pub unpredictability: Option<f64>,
    pub time_per_repetition: Duration,
    /// Segments times repetitions per second
    pub throughput: f64,
}

impl ProfilingContext {
    pub fn run(&self, simulation: &Simulation, samples: usize, departure: DepartureTime) -> Result<ProfilingResult, StatisticsError> {
        assert!(self.repetitions > 0);
        let mut series: Vec<(f64, Vec<f64>)> = Vec::new();

        let (runs, elapsed) = measure(|| -> Result<(), StatisticsError> {
            for _ in 0..self.repetitions {
                let mut travel_times = simulation.run_monte_carlo_simulation(samples, departure, false);
                let stats = SummaryStatistics::new(&mut travel_times, &self.percentiles)?;
                if series.is_empty() {
                    series = stats.percentiles.iter().map(|&(p, _)| (p, Vec::with_capacity(self.repetitions))).collect();
                }
                for ((_, values), &(_, value)) in series.iter_mut().zip(&stats.percentiles) {
                    values.push(value);
                }
            }
            Ok(())
        });
        runs?;

        let error = series
            .iter()
            .filter_map(|(_, values)| series_variation(values))
            .max_by(f64::total_cmp);

        let mut features = Vec::with_capacity(self.repetitions);
        for _ in 0..self.repetitions {
            features.push(extract_feature(simulation, self.feature_samples, departure)?);
        }

        let seconds = elapsed.as_secs_f64();
        Ok(ProfilingResult {
            series,
            error,
            unpredictability: median(features.into_iter().flatten().collect()),
            time_per_repetition: elapsed / self.repetitions as u32,
            throughput: (simulation.route().num_segments() * self.repetitions) as f64 / seconds,
        })
    }
}

fn series_variation(values: &[f64]) -> Option<f64> {
    let moments: OnePassMoments = values.iter().copied().collect();
    coefficient_of_variation(moments.sample_deviation(), moments.mean()?)
}

/// Coefficient of variation of one simulation run, the input of the sample count control.
pub fn extract_feature(simulation: &Simulation, samples: usize, departure: DepartureTime) -> Result<Option<f64>, StatisticsError> {
    let mut travel_times = simulation.run_monte_carlo_simulation(samples, departure, false);
    Ok(SummaryStatistics::new(&mut travel_times, &[])?.variation_coefficient)
}

/// Element at index `len / 2` after sorting
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f64::total_cmp);
    Some(values[values.len() / 2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_upper_half() {
        assert_eq!(median(vec![]), None);
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(vec![4.0, 1.0, 3.0, 2.0]), Some(3.0));
    }

    #[test]
    fn constant_series_has_no_error() {
        assert_eq!(series_variation(&[5.0, 5.0, 5.0]), Some(0.0));
        assert_eq!(series_variation(&[]), None);
    }
}
