// Single departure query with a sample count chosen from the unpredictability of the route.
// Takes the same arguments as `ptdr`, `-n` is the sample count for routes beyond the configured bands.

#[macro_use]
extern crate ptdr;
use ptdr::{
    algo::{monte_carlo::Simulation, statistics::DEFAULT_PERCENTILES},
    cli::{print_usage, Args, CliErr},
    config,
    experiments::{autotuning::*, setup},
    export::write_single_to_file,
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
    let departure = args.departure.ok_or(CliErr("Autotuning needs a start time, -a is not supported"))?;

    let _reporter = enable_reporting("ptdr_autotuning");
    eprintln!("Start: {}", departure);

    let data = setup(&args.edges, &args.profiles)?;

    let context = AutotuningContext {
        feature_samples: config::feature_samples()?,
        percentiles: DEFAULT_PERCENTILES.to_vec(),
    };
    let bands = config::sample_bands()?.unwrap_or_else(|| DEFAULT_SAMPLE_BANDS.to_vec());
    report!("feature_samples", context.feature_samples);
    report!("sample_bands", bands);
    let mut tuner = CoefficientBands::new(bands, args.samples);

    let simulation = Simulation::with_config(&data.route, &data.profiles, config::simulation_config()?)?;
    report!("num_threads", simulation.num_threads());

    let result = report_time_with_key("autotuned simulation", "simulation_running_time_ms", || context.run(&simulation, &mut tuner, departure))?;

    eprintln!("Used samples: {}", result.travel_times.len());
    eprintln!("{}", result.stats);
    report!("unpredictability", result.unpredictability);
    report!("requested_samples", result.requested_samples);
    report!("used_samples", result.travel_times.len());
    report!("statistics", result.stats);

    report_time_with_key("writing result", "write_running_time_ms", || write_single_to_file(&result.travel_times, &args.output))?;

    Ok(())
}
