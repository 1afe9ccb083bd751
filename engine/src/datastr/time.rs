//! Time of week arithmetic.
//!
//! All speed profiles are periodic with a period of one week.
//! Points in time are represented as (fractional) seconds since monday 00:00.
//! The week is split into days and each day into intervals of equal length,
//! during which a segments speed distribution is considered stationary.

use std::{error::Error, fmt};

/// Simulated time in seconds.
pub type Seconds = f64;

pub const SECONDS_PER_MINUTE: u32 = 60;
pub const SECONDS_PER_HOUR: u32 = 3600;
pub const SECONDS_PER_DAY: u32 = 86_400;
pub const DAYS_PER_WEEK: u32 = 7;
/// The wraparound value of all profiles.
pub const SECONDS_PER_WEEK: u32 = DAYS_PER_WEEK * SECONDS_PER_DAY;

/// Day names as used in profile files, index is the day number.
pub const DAY_NAMES: [&str; DAYS_PER_WEEK as usize] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

/// Day number (0 = monday) for a day name.
pub fn day_from_name(name: &str) -> Option<u32> {
    DAY_NAMES.iter().position(|&day| day == name).map(|day| day as u32)
}

/// Reduce a point in time into `[0, SECONDS_PER_WEEK)`.
/// The week is cyclic, so any number of full weeks is dropped.
#[inline]
pub fn wrap_week(seconds: Seconds) -> Seconds {
    let wrapped = seconds.rem_euclid(f64::from(SECONDS_PER_WEEK));
    // rem_euclid may round up to the modulus itself for tiny negative inputs
    if wrapped >= f64::from(SECONDS_PER_WEEK) {
        0.0
    } else {
        wrapped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidDepartureTime {
    Day(u32),
    Hour(u32),
    Minute(u32),
}

impl fmt::Display for InvalidDepartureTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InvalidDepartureTime::Day(day) => write!(f, "invalid start day {} (expected 0-6)", day),
            InvalidDepartureTime::Hour(hour) => write!(f, "invalid start hour {} (expected 0-23)", hour),
            InvalidDepartureTime::Minute(minute) => write!(f, "invalid start minute {} (expected 0-59)", minute),
        }
    }
}

impl Error for InvalidDepartureTime {}

/// Departure day of week (0 = monday) and time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepartureTime {
    day: u32,
    hour: u32,
    minute: u32,
}

impl DepartureTime {
    pub fn new(day: u32, hour: u32, minute: u32) -> Result<DepartureTime, InvalidDepartureTime> {
        if day >= DAYS_PER_WEEK {
            return Err(InvalidDepartureTime::Day(day));
        }
        if hour >= 24 {
            return Err(InvalidDepartureTime::Hour(hour));
        }
        if minute >= 60 {
            return Err(InvalidDepartureTime::Minute(minute));
        }
        Ok(DepartureTime { day, hour, minute })
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn seconds_of_week(&self) -> Seconds {
        f64::from(self.day * SECONDS_PER_DAY + self.hour * SECONDS_PER_HOUR + self.minute * SECONDS_PER_MINUTE)
    }
}

impl Default for DepartureTime {
    fn default() -> Self {
        DepartureTime { day: 0, hour: 0, minute: 0 }
    }
}

impl fmt::Display for DepartureTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at {:02}:{:02}", DAY_NAMES[self.day as usize], self.hour, self.minute)
    }
}

/// The global subdivision of days into time intervals.
/// The interval length divides a day without remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    seconds: u32,
}

impl Intervals {
    /// `None` if the length is zero or does not divide a day.
    pub fn new(seconds: u32) -> Option<Intervals> {
        if seconds == 0 || SECONDS_PER_DAY % seconds != 0 {
            None
        } else {
            Some(Intervals { seconds })
        }
    }

    /// Derive the interval length from the time of day of two consecutive profile rows.
    /// Rows within the same hour are minutes apart, otherwise whole hours.
    pub fn infer(first: (u32, u32), second: (u32, u32)) -> Option<Intervals> {
        let ((first_hour, first_minute), (second_hour, second_minute)) = (first, second);
        let seconds = if first_hour == second_hour {
            second_minute.checked_sub(first_minute)? * SECONDS_PER_MINUTE
        } else {
            second_hour.checked_sub(first_hour)? * SECONDS_PER_HOUR
        };
        Intervals::new(seconds)
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn per_day(&self) -> usize {
        (SECONDS_PER_DAY / self.seconds) as usize
    }

    pub fn per_week(&self) -> usize {
        self.per_day() * DAYS_PER_WEEK as usize
    }

    /// Index of the interval within the week containing the given point in time.
    /// Expects `seconds` to be within `[0, SECONDS_PER_WEEK)`.
    #[inline]
    pub fn interval_of(&self, seconds: Seconds) -> usize {
        debug_assert!(seconds >= 0.0 && seconds < f64::from(SECONDS_PER_WEEK), "{} outside of week", seconds);
        (seconds / f64::from(self.seconds)) as usize
    }

    /// Start of the interval with the given index within the week
    pub fn start_of(&self, week_interval: usize) -> Seconds {
        week_interval as f64 * f64::from(self.seconds)
    }

    /// Index within the week of the interval which contains the given time of day on the given day.
    pub fn week_interval(&self, day: u32, hour: u32, minute: u32) -> usize {
        ((hour * SECONDS_PER_HOUR + minute * SECONDS_PER_MINUTE) / self.seconds) as usize + day as usize * self.per_day()
    }

    /// Split a week interval index into day and interval of that day.
    pub fn day_and_interval(&self, week_interval: usize) -> (usize, usize) {
        (week_interval / self.per_day(), week_interval % self.per_day())
    }

    /// Start times of all intervals of the week in ascending order, that is by (day, interval).
    pub fn week_starts(&self) -> impl Iterator<Item = Seconds> + '_ {
        (0..self.per_week()).map(move |interval| self.start_of(interval))
    }
}
