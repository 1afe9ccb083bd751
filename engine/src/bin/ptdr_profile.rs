// Profiling run for design space exploration.
// Repeats the single departure simulation PTDR_PROFILE_REPETITIONS times and reports
// error, unpredictability, time and throughput of the chosen configuration.

#[macro_use]
extern crate ptdr;
use ptdr::{
    algo::{monte_carlo::Simulation, statistics::DEFAULT_PERCENTILES},
    cli::{print_usage, Args, CliErr},
    config,
    experiments::{profiling::ProfilingContext, setup},
    report::*,
};
use std::{env, error::Error, process};

fn main() -> Result<(), Box<dyn Error>> {
    let args = match Args::parse(env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            eprintln!("{}", err);
            print_usage();
            process::exit(1);
        }
    };
    let departure = args.departure.ok_or(CliErr("Profiling needs a start time, -a is not supported"))?;

    let _reporter = enable_reporting("ptdr_profile");
    report!("num_samples", args.samples);

    let data = setup(&args.edges, &args.profiles)?;

    let context = ProfilingContext {
        repetitions: config::profile_repetitions()?,
        feature_samples: config::feature_samples()?,
        percentiles: DEFAULT_PERCENTILES.to_vec(),
    };
    report!("repetitions", context.repetitions);
    report!("feature_samples", context.feature_samples);

    let config = config::simulation_config()?;
    report!("seed", config.seed);
    report!("rng", config.rng.to_string());
    let simulation = Simulation::with_config(&data.route, &data.profiles, config)?;
    report!("num_threads", simulation.num_threads());

    let result = report_time_with_key("profiling", "profiling_running_time_ms", || context.run(&simulation, args.samples, departure))?;

    eprintln!("error: {:?}  unpredictability: {:?}", result.error, result.unpredictability);
    eprintln!("time per repetition: {:?}  throughput: {} segments/s", result.time_per_repetition, result.throughput);
    report!("error", result.error);
    report!("unpredictability", result.unpredictability);
    report!("time_per_repetition_us", result.time_per_repetition.as_secs_f64() * 1_000_000.0);
    report!("throughput", result.throughput);
    report!("draw_pool_extensions", simulation.draw_pool_extensions());

    let mut percentiles = push_collection_context("percentiles".to_string());
    for (p, values) in &result.series {
        let _item = percentiles.push_collection_item();
        report!("percentile", p);
        report!("values", values);
    }

    Ok(())
}
