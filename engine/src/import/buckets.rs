//! Conversion of one profile row into probability buckets.

use crate::datastr::{
    profile::{is_installable, SegmentProfile},
    route::kmh_to_ms,
};
use std::fmt;

/// Upper bound for plausible velocities in km/h
pub const MAX_VELOCITY_KMH: f64 = 300.0;

/// A (velocity [km/h], probability) pair of a profile row.
/// `None` for pairs marked as missing in the file.
pub type SpeedProbability = Option<(f64, f64)>;

/// Data quality findings while assigning the buckets of a row.
/// None of them is fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum RowIssue {
    /// The pair is skipped
    InvalidVelocity(f64),
    /// The pair is skipped
    InvalidProbability(f64),
    ProbabilitySum(f64),
    /// The probability is too small to get a bucket of its own
    IncreaseResolution(f64),
    /// More buckets than the resolution were requested, the rest was cut off
    Overflow(usize),
    /// Fewer buckets than the resolution were assigned, the rest holds the freeflow speed
    Incomplete(usize),
    /// No valid pair at all, every bucket holds the freeflow speed
    NoValidData,
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RowIssue::InvalidVelocity(velocity) => write!(f, "invalid velocity value: {} km/h", velocity),
            RowIssue::InvalidProbability(probability) => write!(f, "invalid probability value: {}", probability),
            RowIssue::ProbabilitySum(sum) => write!(f, "invalid probability sum: {}", sum),
            RowIssue::IncreaseResolution(probability) => write!(f, "increase index resolution! (min. p: {})", probability),
            RowIssue::Overflow(buckets) => write!(f, "{} buckets requested, cut off at resolution", buckets),
            RowIssue::Incomplete(buckets) => write!(f, "only {} buckets assigned, rest uses freeflow speed", buckets),
            RowIssue::NoValidData => write!(f, "no speed profile, using freeflow speed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowAssignment {
    /// Number of buckets which received a velocity from the row's pairs
    pub assigned: usize,
    pub issues: Vec<RowIssue>,
}

/// Assign the buckets of one interval of a profile.
///
/// Every valid pair gets `floor(probability * resolution)` consecutive buckets.
/// The fractional remainders are accumulated over the row and the rounded sum is added to the last valid pair,
/// so that a row whose probabilities sum up to one covers exactly `resolution` buckets.
/// Missing pairs contribute nothing.
/// `freeflow_speed` is in m/s and fills everything the row leaves uncovered.
pub fn assign_row(profile: &mut SegmentProfile, week_interval: usize, pairs: &[SpeedProbability], freeflow_speed: f64) -> RowAssignment {
    let resolution = profile.resolution();
    let mut issues = Vec::new();

    let valid: Vec<(f64, f64)> = pairs
        .iter()
        .flatten()
        .filter_map(|&(velocity, probability)| {
            if !(velocity > 0.0 && velocity <= MAX_VELOCITY_KMH && is_installable(kmh_to_ms(velocity))) {
                issues.push(RowIssue::InvalidVelocity(velocity));
                return None;
            }
            if !(0.0..=1.0).contains(&probability) {
                issues.push(RowIssue::InvalidProbability(probability));
                return None;
            }
            Some((kmh_to_ms(velocity), probability))
        })
        .collect();

    let mut offset = 0;
    let mut remainder_sum = 0.0;
    let mut probability_sum = 0.0;
    let mut overflow = false;

    for (i, &(velocity, probability)) in valid.iter().enumerate() {
        let scaled = probability * resolution as f64;
        let mut length = scaled.floor();
        if length < 1.0 && probability > 0.0 {
            issues.push(RowIssue::IncreaseResolution(probability));
        }
        remainder_sum += scaled - length;
        if i == valid.len() - 1 {
            length += remainder_sum.round();
        }

        let end = offset + length as usize;
        if end > resolution && !overflow {
            overflow = true;
            issues.push(RowIssue::Overflow(end));
        }
        let end = end.min(resolution);
        if end > offset {
            profile.fill(week_interval, offset..end, velocity);
        }
        offset = end;
        probability_sum += probability;
    }

    if !valid.is_empty() && (1.0 - probability_sum).abs() > f64::from(f32::EPSILON) {
        issues.push(RowIssue::ProbabilitySum(probability_sum));
    }

    if offset == 0 {
        issues.push(RowIssue::NoValidData);
    } else if offset < resolution {
        issues.push(RowIssue::Incomplete(offset));
    }
    if offset < resolution {
        profile.fill(week_interval, offset..resolution, freeflow_speed);
    }

    RowAssignment { assigned: offset, issues }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastr::time::Intervals;

    fn profile(resolution: usize) -> SegmentProfile {
        SegmentProfile::uniform(Intervals::new(3600).unwrap(), resolution, 25.0)
    }

    #[test]
    fn assigns_buckets_proportional_to_probability() {
        let mut profile = profile(10);
        let result = assign_row(&mut profile, 5, &[Some((36.0, 0.3)), Some((72.0, 0.7))], 25.0);

        assert_eq!(result, RowAssignment { assigned: 10, issues: vec![] });
        assert_eq!(profile.buckets(5), &[10.0, 10.0, 10.0, 20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 20.0]);
        assert_eq!(profile.buckets(4), &[25.0; 10]);
    }

    #[test]
    fn rounding_remainder_goes_to_last_pair() {
        let mut profile = profile(100);
        // 33.3 + 33.3 + 33.4 buckets
        let pairs = [Some((36.0, 0.333)), Some((54.0, 0.333)), Some((72.0, 0.334))];
        let result = assign_row(&mut profile, 0, &pairs, 25.0);

        assert_eq!(result.assigned, 100);
        assert!(result.issues.is_empty(), "{:?}", result.issues);
        let buckets = profile.buckets(0);
        assert_eq!(buckets.iter().filter(|&&v| v == 10.0).count(), 33);
        assert_eq!(buckets.iter().filter(|&&v| v == 15.0).count(), 33);
        assert_eq!(buckets.iter().filter(|&&v| v == 20.0).count(), 34);
    }

    #[test]
    fn remainder_is_applied_to_last_valid_pair_when_trailing_pairs_are_missing() {
        let mut profile = profile(100);
        let pairs = [Some((36.0, 0.295)), Some((54.0, 0.705)), None, None];
        let result = assign_row(&mut profile, 0, &pairs, 25.0);

        assert_eq!(result.assigned, 100);
        assert_eq!(profile.buckets(0)[99], 15.0);
    }

    #[test]
    fn all_missing_falls_back_to_freeflow() {
        let mut profile = profile(10);
        profile.fill(2, 0..10, 3.0);
        let result = assign_row(&mut profile, 2, &[None, None, None], 25.0);

        assert_eq!(result.assigned, 0);
        assert_eq!(result.issues, vec![RowIssue::NoValidData]);
        assert_eq!(profile.buckets(2), &[25.0; 10]);
    }

    #[test]
    fn rejects_non_positive_and_implausible_velocities() {
        let mut profile = profile(10);
        let pairs = [Some((0.0, 0.2)), Some((-5.0, 0.2)), Some((301.0, 0.1)), Some((36.0, 0.5))];
        let result = assign_row(&mut profile, 1, &pairs, 25.0);

        assert_eq!(result.assigned, 5);
        assert!(result.issues.contains(&RowIssue::InvalidVelocity(0.0)));
        assert!(result.issues.contains(&RowIssue::InvalidVelocity(-5.0)));
        assert!(result.issues.contains(&RowIssue::InvalidVelocity(301.0)));
        assert!(result.issues.contains(&RowIssue::ProbabilitySum(0.5)));
        assert!(result.issues.contains(&RowIssue::Incomplete(5)));
        assert!(profile.buckets(1).iter().all(|&v| v > 0.0));
        assert_eq!(&profile.buckets(1)[5..], &[25.0; 5]);
    }

    #[test]
    fn rejects_out_of_range_probabilities() {
        let mut profile = profile(10);
        let pairs = [Some((36.0, 1.5)), Some((36.0, -0.1)), Some((72.0, 1.0))];
        let result = assign_row(&mut profile, 0, &pairs, 25.0);

        assert_eq!(result.assigned, 10);
        assert!(result.issues.contains(&RowIssue::InvalidProbability(1.5)));
        assert!(result.issues.contains(&RowIssue::InvalidProbability(-0.1)));
        assert_eq!(profile.buckets(0), &[20.0; 10]);
    }

    #[test]
    fn warns_about_coarse_resolution() {
        let mut profile = profile(10);
        let pairs = [Some((36.0, 0.05)), Some((72.0, 0.95))];
        let result = assign_row(&mut profile, 0, &pairs, 25.0);

        assert_eq!(result.assigned, 10);
        assert_eq!(result.issues, vec![RowIssue::IncreaseResolution(0.05)]);
    }

    #[test]
    fn cuts_off_overflowing_rows() {
        let mut profile = profile(10);
        let pairs = [Some((36.0, 0.8)), Some((72.0, 0.8))];
        let result = assign_row(&mut profile, 0, &pairs, 25.0);

        assert_eq!(result.assigned, 10);
        assert!(result.issues.contains(&RowIssue::Overflow(16)));
        assert!(matches!(result.issues.last(), Some(RowIssue::ProbabilitySum(_))));
    }
}
