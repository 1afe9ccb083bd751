//! Summary statistics of travel time samples.

use serde::Serialize;
use std::{error::Error, fmt};

pub const DEFAULT_PERCENTILES: [f64; 7] = [0.05, 0.1, 0.25, 0.5, 0.75, 0.9, 0.95];

/// Streaming mean and variance in a single pass
/// (Hoemmen, "Computing the standard deviation efficiently", 2007).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OnePassMoments {
    count: usize,
    mean: f64,
    q: f64,
}

impl OnePassMoments {
    pub fn new() -> OnePassMoments {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, x: f64) {
        if self.count == 0 {
            self.mean = x;
        } else {
            let i = self.count as f64;
            let delta = x - self.mean;
            self.q += i * delta * delta / (i + 1.0);
            self.mean += delta / (i + 1.0);
        }
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// `None` for zero samples
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.mean)
        }
    }

    /// Zero for less than two samples
    pub fn sample_deviation(&self) -> f64 {
        if self.count > 1 {
            (self.q / (self.count - 1) as f64).sqrt()
        } else {
            0.0
        }
    }
}

impl Extend<f64> for OnePassMoments {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for x in iter {
            self.push(x);
        }
    }
}

impl FromIterator<f64> for OnePassMoments {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut moments = OnePassMoments::new();
        moments.extend(iter);
        moments
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatisticsError {
    Empty,
    /// Percentiles have to be in (0, 1]
    InvalidPercentile(f64),
}

impl fmt::Display for StatisticsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StatisticsError::Empty => write!(f, "no samples"),
            StatisticsError::InvalidPercentile(p) => write!(f, "invalid percentile {} (expected value in (0, 1])", p),
        }
    }
}

impl Error for StatisticsError {}

/// Ratio of deviation and mean, `None` where this is no meaningful number.
pub fn coefficient_of_variation(sample_deviation: f64, mean: f64) -> Option<f64> {
    let cv = sample_deviation / mean;
    if mean == 0.0 || !cv.is_finite() {
        None
    } else {
        Some(cv)
    }
}

/// Nearest rank percentile of sorted samples, no interpolation.
pub fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let idx = ((sorted.len() as f64 * p) as usize).min(sorted.len() - 1);
    sorted[idx]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub num_samples: usize,
    pub mean: f64,
    pub sample_deviation: f64,
    pub variation_coefficient: Option<f64>,
    /// (p, value) pairs ascending by p
    pub percentiles: Vec<(f64, f64)>,
}

impl SummaryStatistics {
    /// Computes moments in the given order, then sorts `samples` for the percentiles.
    /// With no requested percentiles the samples are left untouched.
    pub fn new(samples: &mut [f64], percentiles: &[f64]) -> Result<SummaryStatistics, StatisticsError> {
        if let Some(&p) = percentiles.iter().find(|&&p| !(p > 0.0 && p <= 1.0)) {
            return Err(StatisticsError::InvalidPercentile(p));
        }
        let moments: OnePassMoments = samples.iter().copied().collect();
        let mean = moments.mean().ok_or(StatisticsError::Empty)?;
        let sample_deviation = moments.sample_deviation();

        let mut requested = percentiles.to_vec();
        requested.sort_by(f64::total_cmp);
        requested.dedup();

        if !requested.is_empty() {
            samples.sort_unstable_by(f64::total_cmp);
        }

        Ok(SummaryStatistics {
            num_samples: samples.len(),
            mean,
            sample_deviation,
            variation_coefficient: coefficient_of_variation(sample_deviation, mean),
            percentiles: requested.into_iter().map(|p| (p, nearest_rank(samples, p))).collect(),
        })
    }

    pub fn percentile(&self, p: f64) -> Option<f64> {
        self.percentiles.iter().find(|&&(q, _)| q == p).map(|&(_, value)| value)
    }
}

impl fmt::Display for SummaryStatistics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "sample dev: {}  mean: {}  variation coeff.: ", self.sample_deviation, self.mean)?;
        match self.variation_coefficient {
            Some(cv) => writeln!(f, "{}", cv)?,
            None => writeln!(f, "undefined")?,
        }
        writeln!(f, "Percentiles: ")?;
        for &(p, value) in &self.percentiles {
            writeln!(f, "{}% {}", (p * 100.0) as f32, value)?;
        }
        Ok(())
    }
}
