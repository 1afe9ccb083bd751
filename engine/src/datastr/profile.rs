//! Dense storage of probabilistic speed profiles.
//!
//! For every segment, day of week and time interval a profile holds a row of `resolution` buckets.
//! Each bucket contains a velocity in m/s.
//! Velocities occur in a row proportional to their probability, so drawing a bucket index
//! uniformly at random from `[0, resolution)` samples the empirical speed distribution of the interval.
//!
//! All rows of all segments live in one contiguous buffer indexed by `(segment, week interval, bucket)`.

use super::time::Intervals;
use std::ops::Range;

/// Number of probability buckets per profile row.
/// Can be overriden through the PTDR_INDEX_RESOLUTION env var at compile time.
#[cfg(not(override_ptdr_index_resolution))]
pub const INDEX_RESOLUTION: usize = 100;
#[cfg(override_ptdr_index_resolution)]
pub const INDEX_RESOLUTION: usize = include!(concat!(env!("OUT_DIR"), "/PTDR_INDEX_RESOLUTION"));

/// Whether a velocity in m/s can be stored in a profile.
/// Stored velocities have to be strictly positive (also after conversion to `f32`), the sampling engine divides by them.
#[inline]
pub fn is_installable(velocity: f64) -> bool {
    velocity.is_finite() && velocity as f32 > 0.0 && (velocity as f32).is_finite()
}

#[inline]
fn assert_valid_velocity(velocity: f64) {
    assert!(is_installable(velocity), "refusing to install velocity {}", velocity);
}

/// The profile of a single segment under construction.
/// Starts out with a single velocity (usually the freeflow speed) in every bucket.
#[derive(Debug, Clone)]
pub struct SegmentProfile {
    resolution: usize,
    velocities: Vec<f32>,
}

impl SegmentProfile {
    pub fn uniform(intervals: Intervals, resolution: usize, velocity: f64) -> SegmentProfile {
        assert!(resolution > 0);
        assert_valid_velocity(velocity);
        SegmentProfile {
            resolution,
            velocities: vec![velocity as f32; intervals.per_week() * resolution],
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn num_intervals(&self) -> usize {
        self.velocities.len() / self.resolution
    }

    /// Assign `velocity` to a range of buckets of one interval.
    /// Panics for velocities which are not installable.
    pub fn fill(&mut self, week_interval: usize, buckets: Range<usize>, velocity: f64) {
        assert_valid_velocity(velocity);
        assert!(buckets.end <= self.resolution);
        let offset = week_interval * self.resolution;
        for bucket in &mut self.velocities[offset + buckets.start..offset + buckets.end] {
            *bucket = velocity as f32;
        }
    }

    pub fn buckets(&self, week_interval: usize) -> &[f32] {
        let offset = week_interval * self.resolution;
        &self.velocities[offset..offset + self.resolution]
    }
}

/// Immutable speed profiles for all segments of a route.
/// Segment `i` of the route belongs to profile `i`.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    intervals: Intervals,
    resolution: usize,
    num_segments: usize,
    velocities: Vec<f32>,
}

impl ProfileStore {
    pub fn new(intervals: Intervals) -> ProfileStore {
        ProfileStore::with_resolution(intervals, INDEX_RESOLUTION)
    }

    pub fn with_resolution(intervals: Intervals, resolution: usize) -> ProfileStore {
        assert!(resolution > 0);
        ProfileStore {
            intervals,
            resolution,
            num_segments: 0,
            velocities: Vec::new(),
        }
    }

    /// Append the profile of the next segment and return its index.
    pub fn push(&mut self, profile: SegmentProfile) -> usize {
        assert_eq!(profile.resolution, self.resolution);
        assert_eq!(profile.num_intervals(), self.intervals.per_week());
        self.velocities.extend_from_slice(&profile.velocities);
        self.num_segments += 1;
        self.num_segments - 1
    }

    /// An empty profile for the next segment, with `velocity` in every bucket.
    pub fn new_profile(&self, velocity: f64) -> SegmentProfile {
        SegmentProfile::uniform(self.intervals, self.resolution, velocity)
    }

    pub fn intervals(&self) -> Intervals {
        self.intervals
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    #[inline(always)]
    fn row_offset(&self, segment: usize, week_interval: usize) -> usize {
        debug_assert!(segment < self.num_segments);
        debug_assert!(week_interval < self.intervals.per_week());
        (segment * self.intervals.per_week() + week_interval) * self.resolution
    }

    /// All buckets of one (segment, interval) row.
    pub fn buckets(&self, segment: usize, week_interval: usize) -> &[f32] {
        let offset = self.row_offset(segment, week_interval);
        &self.velocities[offset..offset + self.resolution]
    }

    /// Velocity in m/s, always strictly positive.
    #[inline(always)]
    pub fn velocity(&self, segment: usize, week_interval: usize, bucket: usize) -> f64 {
        debug_assert!(bucket < self.resolution);
        f64::from(self.velocities[self.row_offset(segment, week_interval) + bucket])
    }
}
