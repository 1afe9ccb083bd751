//! Loading routes and speed profiles.
//!
//! The loader is split at the file format: a `ProfileDataSource` delivers raw segment records
//! and profile rows, `load_from_source` validates them and builds the `Route` and the `ProfileStore`.
//! `csv_source::CsvSource` reads the usual segment list file and profile directory.
//!
//! Fatal conditions are `LoadError`s. Everything else is a `LoadWarning`,
//! printed to stderr and collected into the returned `LoadDiagnostics`.

use crate::datastr::{
    profile::{is_installable, ProfileStore},
    route::{kmh_to_ms, Route, Segment},
    time::{day_from_name, Intervals, DAY_NAMES},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    error::Error,
    fmt, io,
    path::Path,
};

pub mod buckets;
pub mod csv_source;

use buckets::{assign_row, RowIssue, SpeedProbability, MAX_VELOCITY_KMH};
pub use csv_source::CsvSource;

/// One row of the segment list.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRecord {
    pub id: String,
    /// in meters
    pub length: f64,
    /// in km/h
    pub freeflow_kmh: f64,
}

/// One (day, time) row of a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRow {
    pub day: String,
    pub hour: u32,
    pub minute: u32,
    pub pairs: Vec<SpeedProbability>,
}

/// Access to raw route data.
///
/// `Profile` is a handle to the profile of one segment, e.g. a path.
/// Profiles are only read for segments which are actually part of the route.
pub trait ProfileDataSource {
    type Profile;

    fn segments(&self, diagnostics: &mut LoadDiagnostics) -> Result<Vec<SegmentRecord>, LoadError>;
    /// All available profiles by segment id
    fn profiles(&self, diagnostics: &mut LoadDiagnostics) -> Result<BTreeMap<String, Self::Profile>, LoadError>;
    fn profile_rows(&self, profile: &Self::Profile, diagnostics: &mut LoadDiagnostics) -> Result<Vec<ProfileRow>, LoadError>;
}

#[derive(Debug)]
pub enum LoadError {
    Io { context: String, source: io::Error },
    Csv { context: String, source: csv::Error },
    Pattern(glob::PatternError),
    NoProfiles,
    NoSegments,
    /// No profile has two rows to derive the interval length from
    NoIntervalInformation,
    InvalidInterval { segment: String, first: (u32, u32), second: (u32, u32) },
}

impl LoadError {
    pub fn io(context: impl Into<String>, source: io::Error) -> LoadError {
        LoadError::Io { context: context.into(), source }
    }

    pub fn csv(context: impl Into<String>, source: csv::Error) -> LoadError {
        LoadError::Csv { context: context.into(), source }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoadError::Io { context, source } => write!(f, "could not read {}: {}", context, source),
            LoadError::Csv { context, source } => write!(f, "could not parse {}: {}", context, source),
            LoadError::Pattern(err) => write!(f, "invalid profile directory: {}", err),
            LoadError::NoProfiles => write!(f, "no profiles found in profile directory"),
            LoadError::NoSegments => write!(f, "no segment of the route has a usable profile"),
            LoadError::NoIntervalInformation => write!(f, "no profile has two rows to derive the interval length from"),
            LoadError::InvalidInterval { segment, first, second } => write!(
                f,
                "cannot derive interval length from rows {:02}:{:02} and {:02}:{:02} of profile {}",
                first.0, first.1, second.0, second.1, segment
            ),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Csv { source, .. } => Some(source),
            LoadError::Pattern(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        LoadError::io("input", err)
    }
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        LoadError::csv("input", err)
    }
}

impl From<glob::PatternError> for LoadError {
    fn from(err: glob::PatternError) -> Self {
        LoadError::Pattern(err)
    }
}

/// Non fatal findings while loading.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadWarning {
    InvalidSegmentRow { line: u64, reason: String },
    MissingProfile { segment: String },
    UnusedProfile { segment: String },
    UnreadableProfile { segment: String, reason: String },
    UnreadableDirectoryEntry { reason: String },
    InvalidProfileRow { segment: String, line: u64, reason: String },
    UnknownDay { segment: String, day: String },
    ProfileRow { segment: String, day: usize, interval: usize, issue: RowIssue },
    IntervalMismatch { segment: String, seconds: Option<u32>, expected: u32 },
    DuplicateProfile { segment: String, used: String, ignored: String },
}

impl LoadWarning {
    pub fn kind(&self) -> &'static str {
        match self {
            LoadWarning::InvalidSegmentRow { .. } => "invalid_segment_row",
            LoadWarning::MissingProfile { .. } => "missing_profile",
            LoadWarning::UnusedProfile { .. } => "unused_profile",
            LoadWarning::UnreadableProfile { .. } => "unreadable_profile",
            LoadWarning::UnreadableDirectoryEntry { .. } => "unreadable_directory_entry",
            LoadWarning::InvalidProfileRow { .. } => "invalid_profile_row",
            LoadWarning::UnknownDay { .. } => "unknown_day",
            LoadWarning::ProfileRow { issue, .. } => match issue {
                RowIssue::InvalidVelocity(_) => "invalid_velocity",
                RowIssue::InvalidProbability(_) => "invalid_probability",
                RowIssue::ProbabilitySum(_) => "probability_sum",
                RowIssue::IncreaseResolution(_) => "increase_resolution",
                RowIssue::Overflow(_) => "bucket_overflow",
                RowIssue::Incomplete(_) => "incomplete_row",
                RowIssue::NoValidData => "freeflow_fallback",
            },
            LoadWarning::IntervalMismatch { .. } => "interval_mismatch",
            LoadWarning::DuplicateProfile { .. } => "duplicate_profile",
        }
    }
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoadWarning::InvalidSegmentRow { line, reason } => write!(f, "segment row {}: {}", line, reason),
            LoadWarning::MissingProfile { segment } => write!(f, "profile for segment {} not found in profile directory", segment),
            LoadWarning::UnusedProfile { segment } => write!(f, "profile {} belongs to no segment of the route", segment),
            LoadWarning::UnreadableProfile { segment, reason } => write!(f, "skipping segment {}, profile unreadable: {}", segment, reason),
            LoadWarning::UnreadableDirectoryEntry { reason } => write!(f, "skipping profile directory entry: {}", reason),
            LoadWarning::InvalidProfileRow { segment, line, reason } => write!(f, "profile {} row {}: {}", segment, line, reason),
            LoadWarning::UnknownDay { segment, day } => write!(f, "profile {}: unknown day of week {:?}", segment, day),
            LoadWarning::ProfileRow { segment, day, interval, issue } => {
                write!(f, "profile {} {} interval {}: {}", segment, DAY_NAMES[*day], interval, issue)
            }
            LoadWarning::IntervalMismatch { segment, seconds, expected } => match seconds {
                Some(seconds) => write!(f, "profile {} has {}s intervals, using {}s", segment, seconds, expected),
                None => write!(f, "profile {} has no valid interval length, using {}s", segment, expected),
            },
            LoadWarning::DuplicateProfile { segment, used, ignored } => {
                write!(f, "several profiles for segment {}, using {} and ignoring {}", segment, used, ignored)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct LoadDiagnostics {
    warnings: Vec<LoadWarning>,
}

impl LoadDiagnostics {
    pub fn new() -> LoadDiagnostics {
        Self::default()
    }

    pub fn warn(&mut self, warning: LoadWarning) {
        eprintln!("WARNING: {}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Number of warnings per kind
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for warning in &self.warnings {
            *counts.entry(warning.kind()).or_insert(0) += 1;
        }
        counts
    }
}

/// A loaded route with one profile per segment, in route order.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub route: Route,
    pub profiles: ProfileStore,
}

/// Load the route from a segment list file and a directory of profile files.
pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(segments_file: P, profile_dir: Q) -> Result<(Dataset, LoadDiagnostics), LoadError> {
    load_from_source(&CsvSource::new(segments_file.as_ref(), profile_dir.as_ref()))
}

pub fn load_from_source<S: ProfileDataSource>(source: &S) -> Result<(Dataset, LoadDiagnostics), LoadError> {
    let mut diagnostics = LoadDiagnostics::new();

    let mut profiles = source.profiles(&mut diagnostics)?;
    if profiles.is_empty() {
        return Err(LoadError::NoProfiles);
    }
    let records = source.segments(&mut diagnostics)?;

    let mut used = BTreeSet::new();
    let mut matched = Vec::new();
    for (line, record) in records.into_iter().enumerate() {
        if let Err(reason) = validate_segment(&record) {
            diagnostics.warn(LoadWarning::InvalidSegmentRow { line: line as u64 + 1, reason });
            continue;
        }
        let profile = match profiles.get(&record.id) {
            Some(profile) => profile,
            None => {
                diagnostics.warn(LoadWarning::MissingProfile { segment: record.id });
                continue;
            }
        };
        match source.profile_rows(profile, &mut diagnostics) {
            Ok(rows) => {
                used.insert(record.id.clone());
                matched.push((record, rows));
            }
            Err(err) => diagnostics.warn(LoadWarning::UnreadableProfile {
                segment: record.id,
                reason: err.to_string(),
            }),
        }
    }

    profiles.retain(|id, _| !used.contains(id));
    for segment in profiles.into_keys() {
        diagnostics.warn(LoadWarning::UnusedProfile { segment });
    }

    if matched.is_empty() {
        return Err(LoadError::NoSegments);
    }

    let intervals = infer_intervals(&matched, &mut diagnostics)?;
    let mut store = ProfileStore::new(intervals);
    let mut segments = Vec::with_capacity(matched.len());

    for (record, rows) in matched {
        let freeflow_speed = kmh_to_ms(record.freeflow_kmh);
        let mut profile = store.new_profile(freeflow_speed);

        for (line, row) in rows.iter().enumerate() {
            let day = match day_from_name(&row.day) {
                Some(day) => day,
                None => {
                    diagnostics.warn(LoadWarning::UnknownDay {
                        segment: record.id.clone(),
                        day: row.day.clone(),
                    });
                    continue;
                }
            };
            if row.hour >= 24 || row.minute >= 60 {
                diagnostics.warn(LoadWarning::InvalidProfileRow {
                    segment: record.id.clone(),
                    line: line as u64 + 1,
                    reason: format!("invalid time {:02}:{:02}", row.hour, row.minute),
                });
                continue;
            }

            let week_interval = intervals.week_interval(day, row.hour, row.minute);
            let assignment = assign_row(&mut profile, week_interval, &row.pairs, freeflow_speed);
            let (day, interval) = intervals.day_and_interval(week_interval);
            for issue in assignment.issues {
                diagnostics.warn(LoadWarning::ProfileRow {
                    segment: record.id.clone(),
                    day,
                    interval,
                    issue,
                });
            }
        }

        store.push(profile);
        segments.push(Segment::new(record.id, record.length, freeflow_speed));
    }

    report!("num_segments", segments.len());
    report!("interval_seconds", intervals.seconds());
    report!("load_warnings", diagnostics.counts());

    Ok((
        Dataset {
            route: Route::new(segments),
            profiles: store,
        },
        diagnostics,
    ))
}

fn validate_segment(record: &SegmentRecord) -> Result<(), String> {
    if !(record.length.is_finite() && record.length > 0.0) {
        return Err(format!("invalid length {} for segment {}", record.length, record.id));
    }
    if !(record.freeflow_kmh > 0.0 && record.freeflow_kmh <= MAX_VELOCITY_KMH && is_installable(kmh_to_ms(record.freeflow_kmh))) {
        return Err(format!("invalid freeflow speed {} km/h for segment {}", record.freeflow_kmh, record.id));
    }
    Ok(())
}

/// The interval length comes from the first profile with at least two rows.
/// Later profiles with a different spacing are indexed with the same length anyway.
fn infer_intervals(matched: &[(SegmentRecord, Vec<ProfileRow>)], diagnostics: &mut LoadDiagnostics) -> Result<Intervals, LoadError> {
    let mut intervals: Option<Intervals> = None;

    for (record, rows) in matched {
        let (first, second) = match rows.as_slice() {
            [first, second, ..] => ((first.hour, first.minute), (second.hour, second.minute)),
            _ => continue,
        };
        let inferred = Intervals::infer(first, second);

        match (intervals, inferred) {
            (None, Some(inferred)) => intervals = Some(inferred),
            (None, None) => {
                return Err(LoadError::InvalidInterval {
                    segment: record.id.clone(),
                    first,
                    second,
                })
            }
            (Some(global), inferred) if inferred != Some(global) => diagnostics.warn(LoadWarning::IntervalMismatch {
                segment: record.id.clone(),
                seconds: inferred.map(|i| i.seconds()),
                expected: global.seconds(),
            }),
            _ => (),
        }
    }

    intervals.ok_or(LoadError::NoIntervalInformation)
}

/// Route data held in memory, mostly useful for tests and generated routes.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub segments: Vec<SegmentRecord>,
    pub profiles: BTreeMap<String, Vec<ProfileRow>>,
}

impl ProfileDataSource for MemorySource {
    type Profile = Vec<ProfileRow>;

    fn segments(&self, _: &mut LoadDiagnostics) -> Result<Vec<SegmentRecord>, LoadError> {
        Ok(self.segments.clone())
    }

    fn profiles(&self, _: &mut LoadDiagnostics) -> Result<BTreeMap<String, Self::Profile>, LoadError> {
        Ok(self.profiles.clone())
    }

    fn profile_rows(&self, profile: &Self::Profile, _: &mut LoadDiagnostics) -> Result<Vec<ProfileRow>, LoadError> {
        Ok(profile.clone())
    }
}
