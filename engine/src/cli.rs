//! Utility module for command line interfaces

use crate::datastr::time::DepartureTime;
use std::{error::Error, fmt, fmt::Display, path::PathBuf, str::FromStr};

/// An error struct to wrap simple static error messages
#[derive(Debug, PartialEq, Eq)]
pub struct CliErr(pub &'static str);

impl Display for CliErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Error for CliErr {}

pub const USAGE: &str = "\
Usage: ptdr -n [number of samples] -e [edges_file.csv] -p [profiles directory] -o [output_file.csv] (-l, -a) -d [start day] -h [start hour] -m [start minute]
\t Arguments:
\t\t -n: number of Monte Carlo samples to execute
\t\t -e: Edges file (CSV)
\t\t -p: Directory with speed profiles
\t\t -o: Output file (CSV)
\t\t -d: Start day (0-6)
\t\t -h: Start hour (0-23)
\t\t -m: Start minute (0-59)
\t Flags:
\t\t -l: Compute optimal travel time
\t\t -a: Compute for all week intervals (ignores start times)";

pub fn print_usage() {
    eprintln!("{}", USAGE);
}

/// Parse the value following a flag.
pub fn parse_arg_required<T: FromStr>(args: &mut impl Iterator<Item = String>, field_name: &str) -> Result<T, CliErr> {
    match args.next() {
        Some(value) => value.parse().map_err(|_| {
            eprintln!("Invalid value {:?} for `{}`", value, field_name);
            CliErr("Invalid argument!")
        }),
        None => {
            eprintln!("Missing value for argument `{}`", field_name);
            Err(CliErr("Missing arguments!"))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub samples: usize,
    pub edges: PathBuf,
    pub profiles: PathBuf,
    pub output: PathBuf,
    /// `None` in all intervals mode
    pub departure: Option<DepartureTime>,
    pub optimal: bool,
    pub all_intervals: bool,
}

impl Args {
    /// Parse everything after the program name.
    /// `Ok(None)` when help was requested.
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Option<Args>, CliErr> {
        let mut args = args.into_iter();
        let (mut samples, mut edges, mut profiles, mut output) = (None, None, None, None);
        let (mut day, mut hour, mut minute) = (None, None, None);
        let (mut optimal, mut all_intervals) = (false, false);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-n" => samples = Some(parse_arg_required(&mut args, "number of samples")?),
                "-e" => edges = Some(parse_arg_required::<PathBuf>(&mut args, "edges file")?),
                "-p" => profiles = Some(parse_arg_required::<PathBuf>(&mut args, "profiles directory")?),
                "-o" => output = Some(parse_arg_required::<PathBuf>(&mut args, "output file")?),
                "-d" => day = Some(parse_arg_required(&mut args, "start day")?),
                "-h" => hour = Some(parse_arg_required(&mut args, "start hour")?),
                "-m" => minute = Some(parse_arg_required(&mut args, "start minute")?),
                "-l" => optimal = true,
                "-a" => all_intervals = true,
                "--help" => return Ok(None),
                _ => {
                    eprintln!("Unknown argument {:?}", arg);
                    return Err(CliErr("Invalid arguments!"));
                }
            }
        }

        let (samples, edges, profiles, output) = match (samples, edges, profiles, output) {
            (Some(samples), Some(edges), Some(profiles), Some(output)) => (samples, edges, profiles, output),
            _ => return Err(CliErr("Invalid argument count.")),
        };

        let departure = match (day, hour, minute) {
            _ if all_intervals => None,
            (Some(day), Some(hour), Some(minute)) => Some(DepartureTime::new(day, hour, minute).map_err(|err| {
                eprintln!("{}", err);
                CliErr("Invalid start time.")
            })?),
            _ => return Err(CliErr("Invalid start time.")),
        };

        Ok(Some(Args {
            samples,
            edges,
            profiles,
            output,
            departure,
            optimal,
            all_intervals,
        }))
    }

    /// Where optimal travel times go
    pub fn optimal_output(&self) -> PathBuf {
        let mut path = self.output.clone().into_os_string();
        path.push(".optimal");
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Option<Args>, CliErr> {
        Args::parse(line.split_whitespace().map(String::from))
    }

    #[test]
    fn single_departure() {
        let args = parse("-n 100 -e edges.csv -p profiles -o out.csv -d 2 -h 7 -m 30 -l").unwrap().unwrap();
        assert_eq!(args.samples, 100);
        assert_eq!(args.departure, Some(DepartureTime::new(2, 7, 30).unwrap()));
        assert!(args.optimal);
        assert!(!args.all_intervals);
        assert_eq!(args.optimal_output(), PathBuf::from("out.csv.optimal"));
    }

    #[test]
    fn all_intervals_ignores_start_time() {
        let args = parse("-a -n 10 -e e -p p -o o -d 9").unwrap().unwrap();
        assert!(args.all_intervals);
        assert_eq!(args.departure, None);
    }

    #[test]
    fn rejects_incomplete_arguments() {
        assert_eq!(parse("-n 10 -e e -p p -o o -d 1 -h 2"), Err(CliErr("Invalid start time.")));
        assert_eq!(parse("-n 10 -e e -p p -o o -d 7 -h 2 -m 0"), Err(CliErr("Invalid start time.")));
        assert_eq!(parse("-n 10 -e e -p p -a"), Err(CliErr("Invalid argument count.")));
        assert_eq!(parse("-n ten -e e -p p -o o -a"), Err(CliErr("Invalid argument!")));
        assert_eq!(parse("-n 10 -e e -p p -o o -a -x"), Err(CliErr("Invalid arguments!")));
        assert_eq!(parse("-n 10 -e"), Err(CliErr("Missing arguments!")));
        assert_eq!(parse("--help"), Ok(None));
    }
}
