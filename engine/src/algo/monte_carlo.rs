//! Monte Carlo simulation of travel times along a route.
//!
//! One trial walks the route once. For every segment a bucket index is drawn,
//! the segment is driven at the velocity of that bucket in the current interval.
//! When the projected arrival falls into another interval, only the part up to the interval boundary
//! is driven at this velocity and the rest of the segment gets a fresh draw.
//!
//! Trials are independent and run in parallel on fixed size chunks of the output buffer.
//! Each chunk gets its own generator seeded from the base seed, the chunk index and the number of
//! previous runs of the same `Simulation`. For a fixed seed and chunk size the samples of the n-th run
//! don't depend on the number of threads, while repeated runs still draw fresh samples.

use super::random::*;
use crate::datastr::{
    profile::ProfileStore,
    route::Route,
    time::{wrap_week, DepartureTime, Seconds},
};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Base seed for the generators of all chunks
    pub seed: u64,
    pub rng: RngBackend,
    /// Size of a dedicated thread pool, `None` runs on the global rayon pool
    pub num_threads: Option<usize>,
    /// Trials per chunk
    pub chunk_size: usize,
    /// Pin the threads of the dedicated pool to cores
    pub pin_threads: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            seed: 0,
            rng: RngBackend::default(),
            num_threads: None,
            chunk_size: 64,
            pin_threads: false,
        }
    }
}

pub struct Simulation<'a> {
    route: &'a Route,
    profiles: &'a ProfileStore,
    config: SimulationConfig,
    pool: Option<rayon::ThreadPool>,
    runs: AtomicU64,
    pool_extensions: AtomicU64,
}

/// Odd constant spreading the seeds of consecutive runs apart
const RUN_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

impl<'a> Simulation<'a> {
    pub fn new(route: &'a Route, profiles: &'a ProfileStore) -> Simulation<'a> {
        assert_eq!(route.num_segments(), profiles.num_segments(), "every segment needs a profile");
        Simulation {
            route,
            profiles,
            config: SimulationConfig::default(),
            pool: None,
            runs: AtomicU64::new(0),
            pool_extensions: AtomicU64::new(0),
        }
    }

    pub fn with_config(route: &'a Route, profiles: &'a ProfileStore, config: SimulationConfig) -> Result<Simulation<'a>, rayon::ThreadPoolBuildError> {
        assert!(config.chunk_size > 0);
        let pool = match config.num_threads {
            Some(num_threads) => {
                let mut builder = rayon::ThreadPoolBuilder::new().num_threads(num_threads);
                if config.pin_threads {
                    if let Some(core_ids) = core_affinity::get_core_ids().filter(|ids| !ids.is_empty()) {
                        builder = builder.start_handler(move |thread_idx| core_affinity::set_for_current(core_ids[thread_idx % core_ids.len()]));
                    }
                }
                Some(builder.build()?)
            }
            None => None,
        };

        Ok(Simulation {
            config,
            pool,
            ..Simulation::new(route, profiles)
        })
    }

    pub fn route(&self) -> &Route {
        self.route
    }

    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// How often trials needed more draws than pre-drawn, summed over all runs so far
    pub fn draw_pool_extensions(&self) -> u64 {
        self.pool_extensions.load(Ordering::Relaxed)
    }

    fn execute<T: Send>(&self, f: impl FnOnce() -> T + Send) -> T {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }

    fn start_times(&self, departure: DepartureTime, all_intervals: bool) -> Vec<Seconds> {
        if all_intervals {
            self.profiles.intervals().week_starts().collect()
        } else {
            vec![departure.seconds_of_week()]
        }
    }

    /// Draw `samples` travel times for the departure,
    /// or for every (day, interval) of the week when `all_intervals` is set.
    /// In the latter case the result is ordered by day, interval and sample.
    pub fn run_monte_carlo_simulation(&self, samples: usize, departure: DepartureTime, all_intervals: bool) -> Vec<Seconds> {
        let starts = self.start_times(departure, all_intervals);
        let mut travel_times = vec![0.0; starts.len() * samples];
        if travel_times.is_empty() {
            return travel_times;
        }

        let SimulationConfig { seed, rng, chunk_size, .. } = self.config;
        let run = self.runs.fetch_add(1, Ordering::Relaxed);
        let seed = seed.wrapping_add(run.wrapping_mul(RUN_SEED_STRIDE));
        let num_segments = self.route.num_segments();
        let resolution = self.profiles.resolution();

        let extensions: u64 = self.execute(|| {
            travel_times
                .par_chunks_mut(chunk_size)
                .enumerate()
                .map(|(chunk_idx, chunk)| {
                    let mut source = WorkerRng::new(rng, seed.wrapping_add(chunk_idx as u64));
                    let mut pool = DrawPool::for_route(num_segments, resolution);

                    for (i, travel_time) in chunk.iter_mut().enumerate() {
                        let start = starts[(chunk_idx * chunk_size + i) / samples];
                        *travel_time = self.random_travel_time(start, &mut pool.refill(&mut source));
                    }
                    pool.extensions()
                })
                .sum()
        });
        self.pool_extensions.fetch_add(extensions, Ordering::Relaxed);

        travel_times
    }

    /// One trial departing at `start` seconds of the week.
    pub fn random_travel_time(&self, start: Seconds, draws: &mut impl UniformSource) -> Seconds {
        let intervals = self.profiles.intervals();
        let interval_seconds = f64::from(intervals.seconds());
        let resolution = self.profiles.resolution();

        let mut current_seconds = wrap_week(start);
        let mut travel_time = 0.0;

        for (segment_idx, segment) in self.route.segments().iter().enumerate() {
            let mut remaining_length = segment.length();

            while remaining_length > 0.0 {
                let current_interval = intervals.interval_of(current_seconds);
                let velocity = self.profiles.velocity(segment_idx, current_interval, draws.draw(resolution));
                let time_at_velocity = remaining_length / velocity;
                let projected_seconds = current_seconds + time_at_velocity;
                let projected_interval = (projected_seconds / interval_seconds) as usize;

                if projected_interval == current_interval {
                    remaining_length = 0.0;
                    travel_time += time_at_velocity;
                    current_seconds = projected_seconds;
                } else {
                    let secs_to_boundary = (current_interval + 1) as f64 * interval_seconds - current_seconds;
                    remaining_length -= velocity * secs_to_boundary;
                    travel_time += secs_to_boundary;
                    current_seconds = wrap_week(projected_seconds);
                }
            }
        }

        travel_time
    }

    /// Best case reference: every segment at the velocity of bucket 0 of the start interval.
    pub fn optimal_travel_time(&self, start: Seconds) -> Seconds {
        let interval = self.profiles.intervals().interval_of(wrap_week(start));
        self.route
            .segments()
            .iter()
            .enumerate()
            .map(|(segment_idx, segment)| segment.length() / self.profiles.velocity(segment_idx, interval, 0))
            .sum()
    }

    /// One optimal travel time for the departure or one per (day, interval) of the week.
    pub fn compute_optimal_travel_time(&self, departure: DepartureTime, all_intervals: bool) -> Vec<Seconds> {
        let starts = self.start_times(departure, all_intervals);
        self.execute(|| starts.par_iter().map(|&start| self.optimal_travel_time(start)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastr::{
        route::Segment,
        time::{Intervals, SECONDS_PER_WEEK},
    };

    fn single_segment(length: f64, velocity: f64, intervals: Intervals) -> (Route, ProfileStore) {
        let route = Route::new(vec![Segment::new("s".to_string(), length, velocity)]);
        let mut profiles = ProfileStore::with_resolution(intervals, 4);
        profiles.push(profiles.new_profile(velocity));
        (route, profiles)
    }

    #[test]
    fn constant_speed_within_interval() {
        let (route, profiles) = single_segment(1000.0, 10.0, Intervals::new(3600).unwrap());
        let simulation = Simulation::new(&route, &profiles);
        let mut draws = SequenceSource::new(vec![0, 1, 2, 3]);
        assert_eq!(simulation.random_travel_time(0.0, &mut draws), 100.0);
        assert_eq!(draws.consumed(), 1);
    }

    #[test]
    fn crossing_takes_fresh_draw_for_next_interval() {
        let intervals = Intervals::new(3600).unwrap();
        let route = Route::new(vec![Segment::new("s".to_string(), 1000.0, 10.0)]);
        let mut profiles = ProfileStore::with_resolution(intervals, 2);
        let mut profile = profiles.new_profile(10.0);
        profile.fill(1, 0..2, 20.0);
        profiles.push(profile);
        let simulation = Simulation::new(&route, &profiles);

        // 40s before the boundary: 400m at 10 m/s, jump to the projected 3660s, rest at 20 m/s
        let mut draws = SequenceSource::new(vec![0]);
        assert_eq!(simulation.random_travel_time(3560.0, &mut draws), 40.0 + 30.0);
        assert_eq!(draws.consumed(), 2);
    }

    #[test]
    fn wraps_at_end_of_week() {
        let intervals = Intervals::new(900).unwrap();
        let (route, profiles) = single_segment(2000.0, 10.0, intervals);
        let simulation = Simulation::new(&route, &profiles);
        let mut draws = SequenceSource::new(vec![3]);
        let start = f64::from(SECONDS_PER_WEEK) - 100.0;
        assert_eq!(simulation.random_travel_time(start, &mut draws), 100.0 + 100.0);
        assert_eq!(draws.consumed(), 2);
    }

    #[test]
    fn optimal_uses_first_bucket_of_start_interval() {
        let intervals = Intervals::new(86_400).unwrap();
        let route = Route::new(vec![Segment::new("a".to_string(), 100.0, 10.0), Segment::new("b".to_string(), 300.0, 30.0)]);
        let mut profiles = ProfileStore::with_resolution(intervals, 2);
        let mut a = profiles.new_profile(10.0);
        a.fill(2, 0..1, 50.0);
        profiles.push(a);
        profiles.push(profiles.new_profile(30.0));
        let simulation = Simulation::new(&route, &profiles);

        assert_eq!(simulation.optimal_travel_time(0.0), 20.0);
        assert_eq!(simulation.optimal_travel_time(2.0 * 86_400.0 + 5.0), 12.0);
        let all = simulation.compute_optimal_travel_time(DepartureTime::default(), true);
        assert_eq!(all, vec![20.0, 20.0, 12.0, 20.0, 20.0, 20.0, 20.0]);
        assert_eq!(simulation.compute_optimal_travel_time(DepartureTime::new(2, 1, 0).unwrap(), false), vec![12.0]);
    }

    #[test]
    fn independent_of_thread_count() {
        let (route, profiles) = single_segment(5000.0, 10.0, Intervals::new(3600).unwrap());
        let config = |num_threads| SimulationConfig {
            seed: 7,
            num_threads: Some(num_threads),
            chunk_size: 3,
            ..Default::default()
        };
        let one = Simulation::with_config(&route, &profiles, config(1)).unwrap();
        let four = Simulation::with_config(&route, &profiles, config(4)).unwrap();
        let departure = DepartureTime::new(3, 17, 30).unwrap();
        assert_eq!(
            one.run_monte_carlo_simulation(50, departure, false),
            four.run_monte_carlo_simulation(50, departure, false)
        );
    }

    #[test]
    fn no_samples() {
        let (route, profiles) = single_segment(100.0, 10.0, Intervals::new(3600).unwrap());
        let simulation = Simulation::new(&route, &profiles);
        assert!(simulation.run_monte_carlo_simulation(0, DepartureTime::default(), true).is_empty());
    }

    #[test]
    fn repeated_runs_draw_fresh_samples() {
        let intervals = Intervals::new(3600).unwrap();
        let route = Route::new(vec![Segment::new("s".to_string(), 1000.0, 10.0)]);
        let mut profiles = ProfileStore::with_resolution(intervals, 100);
        let mut profile = profiles.new_profile(10.0);
        for week_interval in 0..intervals.per_week() {
            for bucket in 0..100 {
                profile.fill(week_interval, bucket..bucket + 1, 1.0 + bucket as f64);
            }
        }
        profiles.push(profile);

        let simulation = Simulation::new(&route, &profiles);
        let first = simulation.run_monte_carlo_simulation(20, DepartureTime::default(), false);
        let second = simulation.run_monte_carlo_simulation(20, DepartureTime::default(), false);
        assert_ne!(first, second);

        let replay = Simulation::new(&route, &profiles);
        assert_eq!(replay.run_monte_carlo_simulation(20, DepartureTime::default(), false), first);
    }
}
