// Travel time distribution along a route.
// Run `ptdr --help` for the arguments.

#[macro_use]
extern crate ptdr;
use ptdr::{
    algo::{
        monte_carlo::Simulation,
        statistics::{SummaryStatistics, DEFAULT_PERCENTILES},
    },
    cli::{print_usage, Args},
    config,
    experiments::setup,
    export::*,
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

    let _reporter = enable_reporting("ptdr");
    report!("num_samples", args.samples);
    report!("all_intervals", args.all_intervals);
    if let Some(departure) = args.departure {
        report!("departure", { "day": departure.day(), "hour": departure.hour(), "minute": departure.minute() });
        eprintln!("Start: {}", departure);
    }

    let data = setup(&args.edges, &args.profiles)?;
    let intervals = data.profiles.intervals();

    let config = config::simulation_config()?;
    report!("seed", config.seed);
    report!("rng", config.rng.to_string());
    report!("chunk_size", config.chunk_size);
    let simulation = Simulation::with_config(&data.route, &data.profiles, config)?;
    report!("num_threads", simulation.num_threads());

    let departure = args.departure.unwrap_or_default();
    let travel_times = report_time_with_key("simulation", "simulation_running_time_ms", || {
        simulation.run_monte_carlo_simulation(args.samples, departure, args.all_intervals)
    });
    report!("draw_pool_extensions", simulation.draw_pool_extensions());

    if args.optimal {
        let optimal = simulation.compute_optimal_travel_time(departure, args.all_intervals);
        if !args.all_intervals {
            eprintln!("Optimal travel time {}s", optimal[0]);
            report!("optimal_travel_time_s", optimal[0]);
        }
        write_optimal_to_file(&optimal, args.all_intervals.then(|| intervals), &args.optimal_output())?;
    }

    if args.all_intervals {
        report_time_with_key("writing result", "write_running_time_ms", || {
            write_all_intervals_to_file(&travel_times, args.samples, intervals, &args.output)
        })?;
    } else {
        let mut sorted = travel_times.clone();
        let stats = SummaryStatistics::new(&mut sorted, &DEFAULT_PERCENTILES)?;
        eprintln!("{}", stats);
        report!("statistics", stats);
        report_time_with_key("writing result", "write_running_time_ms", || write_single_to_file(&travel_times, &args.output))?;
    }

    Ok(())
}
