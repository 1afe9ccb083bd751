extern crate ptdr;

use ptdr::{
    algo::{
        monte_carlo::{Simulation, SimulationConfig},
        random::{RngBackend, SequenceSource},
        statistics::{SummaryStatistics, DEFAULT_PERCENTILES},
    },
    datastr::time::{DepartureTime, DAY_NAMES, SECONDS_PER_WEEK},
    experiments::{
        autotuning::{AutotuningContext, FixedSampleCount},
        profiling::ProfilingContext,
    },
    import::{load_from_source, Dataset, MemorySource, ProfileRow, SegmentRecord},
};

fn row(day: usize, hour: u32, minute: u32, pairs: &[(f64, f64)]) -> ProfileRow {
    ProfileRow {
        day: DAY_NAMES[day].to_string(),
        hour,
        minute,
        pairs: pairs.iter().map(|&pair| Some(pair)).collect(),
    }
}

fn segment(id: &str, length: f64, freeflow_kmh: f64) -> SegmentRecord {
    SegmentRecord {
        id: id.to_string(),
        length,
        freeflow_kmh,
    }
}

/// Quarter hour profiles, every day starts with its own constant speed.
fn daily_speeds() -> Dataset {
    let mut source = MemorySource {
        segments: vec![segment("short", 100.0, 50.0)],
        ..Default::default()
    };
    let mut rows = vec![row(0, 0, 0, &[(10.0, 1.0)]), row(0, 0, 15, &[(10.0, 1.0)])];
    rows.extend((1..7).map(|day| row(day, 0, 0, &[(10.0 + 10.0 * day as f64, 1.0)])));
    source.profiles.insert("short".to_string(), rows);
    load_from_source(&source).unwrap().0
}

/// Two segments with spread out speeds in every slot.
fn spread_speeds() -> Dataset {
    let mut source = MemorySource {
        segments: vec![segment("a", 2500.0, 80.0), segment("b", 4000.0, 100.0)],
        ..Default::default()
    };
    for id in ["a", "b"] {
        let rows = (0..7)
            .flat_map(|day| (0..24).map(move |hour| row(day, hour, 0, &[(20.0, 0.25), (50.0, 0.5), (90.0, 0.25)])))
            .collect();
        source.profiles.insert(id.to_string(), rows);
    }
    load_from_source(&source).unwrap().0
}

#[test]
fn all_intervals_are_ordered_by_day_interval_and_sample() {
    let data = daily_speeds();
    let intervals = data.profiles.intervals();
    assert_eq!(intervals.per_day(), 96);

    let simulation = Simulation::new(&data.route, &data.profiles);
    let samples = 3;
    let result = simulation.run_monte_carlo_simulation(samples, DepartureTime::default(), true);
    assert_eq!(result.len(), 7 * 96 * samples);

    for (week_interval, start) in intervals.week_starts().enumerate() {
        let expected = simulation.optimal_travel_time(start);
        for s in 0..samples {
            assert_eq!(result[week_interval * samples + s], expected);
        }
    }

    // first interval of thursday runs at 40 km/h
    let thursday = 3 * 96 * samples;
    assert!((result[thursday] - 100.0 / (40.0 / 3.6)).abs() < 1e-4);
    // the rest of the day at freeflow speed
    assert!((result[thursday + samples] - 100.0 / (50.0 / 3.6)).abs() < 1e-4);
}

#[test]
fn trips_wrap_around_the_end_of_the_week() {
    let mut source = MemorySource {
        segments: vec![segment("long", 1200.0, 36.0)],
        ..Default::default()
    };
    source
        .profiles
        .insert("long".to_string(), vec![row(0, 0, 0, &[(72.0, 1.0)]), row(0, 0, 15, &[(72.0, 1.0)])]);
    let (data, _) = load_from_source(&source).unwrap();
    let simulation = Simulation::new(&data.route, &data.profiles);

    // one minute at 10 m/s on sunday, the remaining 600m at 20 m/s on monday morning
    let sunday = DepartureTime::new(6, 23, 59).unwrap();
    let mut draws = SequenceSource::new(vec![0]);
    assert_eq!(simulation.random_travel_time(sunday.seconds_of_week(), &mut draws), 90.0);
    assert_eq!(draws.consumed(), 2);

    let result = simulation.run_monte_carlo_simulation(10, sunday, false);
    assert!(result.iter().all(|&t| t == 90.0));

    // starting times beyond the week are wrapped as well
    let mut draws = SequenceSource::new(vec![0]);
    assert_eq!(simulation.random_travel_time(sunday.seconds_of_week() + f64::from(SECONDS_PER_WEEK), &mut draws), 90.0);
}

#[test]
fn replayed_draws_give_identical_travel_times() {
    let data = spread_speeds();
    let simulation = Simulation::new(&data.route, &data.profiles);
    let draws: Vec<usize> = (0..40).map(|i| (i * 37) % 100).collect();
    let start = DepartureTime::new(4, 16, 45).unwrap().seconds_of_week();

    let first = simulation.random_travel_time(start, &mut SequenceSource::new(draws.clone()));
    let second = simulation.random_travel_time(start, &mut SequenceSource::new(draws));
    assert_eq!(first, second);
    assert!(first > 0.0);
}

#[test]
fn seeded_runs_are_reproducible() {
    let data = spread_speeds();
    let departure = DepartureTime::new(1, 7, 50).unwrap();

    for rng in [RngBackend::Std, RngBackend::Small] {
        let config = SimulationConfig {
            seed: 1234,
            rng,
            num_threads: Some(3),
            chunk_size: 16,
            pin_threads: false,
        };
        let a = Simulation::with_config(&data.route, &data.profiles, config.clone()).unwrap();
        let b = Simulation::with_config(&data.route, &data.profiles, SimulationConfig { num_threads: Some(1), ..config }).unwrap();
        assert_eq!(a.run_monte_carlo_simulation(200, departure, false), b.run_monte_carlo_simulation(200, departure, false));
    }
}

#[test]
fn statistics_of_simulated_travel_times() {
    let data = spread_speeds();
    let simulation = Simulation::new(&data.route, &data.profiles);
    let mut travel_times = simulation.run_monte_carlo_simulation(1000, DepartureTime::new(2, 12, 0).unwrap(), false);
    assert_eq!(travel_times.len(), 1000);

    let fastest = 6500.0 / (90.0 / 3.6);
    let slowest = 6500.0 / (20.0 / 3.6);
    assert!(travel_times.iter().all(|&t| t >= fastest - 1e-3 && t <= slowest + 1e-3));

    let stats = SummaryStatistics::new(&mut travel_times, &DEFAULT_PERCENTILES).unwrap();
    assert!(stats.mean > fastest && stats.mean < slowest);
    assert!(stats.variation_coefficient.unwrap() > 0.0);
    let values: Vec<f64> = stats.percentiles.iter().map(|&(_, value)| value).collect();
    assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn nearest_rank_percentile() {
    let mut samples = vec![4.0, 1.0, 5.0, 3.0, 2.0];
    let stats = SummaryStatistics::new(&mut samples, &[0.5]).unwrap();
    assert_eq!(stats.percentile(0.5), Some(3.0));
}

#[test]
fn autotuning_reuses_feature_samples() {
    let data = spread_speeds();
    let simulation = Simulation::new(&data.route, &data.profiles);
    let context = AutotuningContext {
        feature_samples: 100,
        percentiles: DEFAULT_PERCENTILES.to_vec(),
    };
    let departure = DepartureTime::new(0, 9, 30).unwrap();

    let more = context.run(&simulation, &mut FixedSampleCount(250), departure).unwrap();
    assert_eq!(more.requested_samples, 250);
    assert_eq!(more.travel_times.len(), 250);
    assert_eq!(more.stats.num_samples, 250);
    assert!(more.unpredictability.unwrap() > 0.0);

    let fewer = context.run(&simulation, &mut FixedSampleCount(30), departure).unwrap();
    assert_eq!(fewer.requested_samples, 30);
    assert_eq!(fewer.travel_times.len(), 100);
    assert_eq!(fewer.stats.percentiles.len(), DEFAULT_PERCENTILES.len());
}

#[test]
fn profiling_collects_one_series_per_percentile() {
    let data = spread_speeds();
    let simulation = Simulation::new(&data.route, &data.profiles);
    let context = ProfilingContext {
        repetitions: 5,
        feature_samples: 20,
        percentiles: DEFAULT_PERCENTILES.to_vec(),
    };

    let result = context.run(&simulation, 50, DepartureTime::new(5, 18, 0).unwrap()).unwrap();
    assert_eq!(result.series.len(), DEFAULT_PERCENTILES.len());
    for ((p, values), expected) in result.series.iter().zip(DEFAULT_PERCENTILES) {
        assert_eq!(*p, expected);
        assert_eq!(values.len(), 5);
    }
    assert!(result.error.unwrap() >= 0.0);
    assert!(result.unpredictability.unwrap() > 0.0);
}
