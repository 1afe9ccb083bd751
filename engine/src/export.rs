//! Writing simulation results as `;` separated text files.

use crate::datastr::time::{Intervals, DAYS_PER_WEEK};
use std::{
    fs::File,
    io::{BufWriter, Result, Write},
    path::Path,
};

fn to_file(filename: &Path, write: impl FnOnce(&mut BufWriter<File>) -> Result<()>) -> Result<()> {
    let mut file = BufWriter::new(File::create(filename)?);
    write(&mut file)?;
    file.flush()
}

/// One value per line.
pub fn write_single(out: &mut impl Write, result: &[f64]) -> Result<()> {
    for value in result {
        writeln!(out, "{}", value)?;
    }
    Ok(())
}

/// Header `day;interval;1;...;samples`, then one row of samples per (day, interval).
pub fn write_all_intervals(out: &mut impl Write, result: &[f64], samples: usize, intervals: Intervals) -> Result<()> {
    let per_day = intervals.per_day();
    assert_eq!(result.len(), DAYS_PER_WEEK as usize * per_day * samples);

    write!(out, "day;interval")?;
    for sample in 1..=samples {
        write!(out, ";{}", sample)?;
    }
    writeln!(out)?;

    for (week_interval, row) in result.chunks(samples.max(1)).enumerate() {
        let (day, interval) = intervals.day_and_interval(week_interval);
        write!(out, "{};{}", day, interval)?;
        for value in row {
            write!(out, ";{}", value)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// A single value, or with `intervals` given, header `day;interval;optimal` and one row per (day, interval).
pub fn write_optimal(out: &mut impl Write, result: &[f64], intervals: Option<Intervals>) -> Result<()> {
    match intervals {
        Some(intervals) => {
            assert_eq!(result.len(), intervals.per_week());
            writeln!(out, "day;interval;optimal")?;
            for (week_interval, value) in result.iter().enumerate() {
                let (day, interval) = intervals.day_and_interval(week_interval);
                writeln!(out, "{};{};{}", day, interval, value)?;
            }
            Ok(())
        }
        None => write_single(out, result),
    }
}

pub fn write_single_to_file(result: &[f64], filename: &Path) -> Result<()> {
    to_file(filename, |out| write_single(out, result))
}

pub fn write_all_intervals_to_file(result: &[f64], samples: usize, intervals: Intervals, filename: &Path) -> Result<()> {
    to_file(filename, |out| write_all_intervals(out, result, samples, intervals))
}

pub fn write_optimal_to_file(result: &[f64], intervals: Option<Intervals>, filename: &Path) -> Result<()> {
    to_file(filename, |out| write_optimal(out, result, intervals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_intervals_layout() {
        let intervals = Intervals::new(43_200).unwrap();
        let result: Vec<f64> = (0..28).map(f64::from).collect();
        let mut out = Vec::new();
        write_all_intervals(&mut out, &result, 2, intervals).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 15);
        assert_eq!(lines[0], "day;interval;1;2");
        assert_eq!(lines[1], "0;0;0;1");
        assert_eq!(lines[2], "0;1;2;3");
        assert_eq!(lines[3], "1;0;4;5");
        assert_eq!(lines[14], "6;1;26;27");
    }

    #[test]
    fn single_and_optimal() {
        let mut out = Vec::new();
        write_single(&mut out, &[1.5, 20.0]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1.5\n20\n");

        let intervals = Intervals::new(86_400).unwrap();
        let mut out = Vec::new();
        write_optimal(&mut out, &[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0], Some(intervals)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("day;interval;optimal\n0;0;10\n1;0;11\n"));
        assert!(text.ends_with("6;0;16\n"));
    }
}
