use super::*;
use csv::{ReaderBuilder, StringRecord};
use glob::{glob, Pattern};
use std::{
    collections::btree_map::Entry,
    fs::File,
    path::{Path, PathBuf},
};

/// Separates the segment id from the rest of a profile file name
pub const PROFILE_FILE_NAME_SEP: char = '_';
pub const SEGMENT_DELIMITER: u8 = b';';
pub const PROFILE_DELIMITER: u8 = b'|';
/// Marks a missing velocity or probability in a profile row
pub const MISSING_VALUE: &str = "NaN";

/// Segment list file with rows `id;length [m];freeflow speed [km/h]` after one header row
/// and a directory with one `|` separated profile file per segment.
#[derive(Debug)]
pub struct CsvSource<'a> {
    segments_file: &'a Path,
    profile_dir: &'a Path,
}

impl<'a> CsvSource<'a> {
    pub fn new(segments_file: &'a Path, profile_dir: &'a Path) -> CsvSource<'a> {
        CsvSource { segments_file, profile_dir }
    }
}

fn reader(path: &Path, delimiter: u8, has_headers: bool) -> Result<csv::Reader<File>, LoadError> {
    let file = File::open(path).map_err(|err| LoadError::io(path.display().to_string(), err))?;
    Ok(ReaderBuilder::new()
        .has_headers(has_headers)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .quoting(false)
        .double_quote(false)
        .escape(None)
        .from_reader(file))
}

fn line_of(record: &StringRecord, fallback: usize) -> u64 {
    record.position().map(|pos| pos.line()).unwrap_or(fallback as u64 + 1)
}

/// The segment id is the file name up to the first separator.
pub fn segment_id_of(path: &Path) -> Option<&str> {
    path.file_name()?.to_str()?.split(PROFILE_FILE_NAME_SEP).next().filter(|id| !id.is_empty())
}

impl<'a> ProfileDataSource for CsvSource<'a> {
    type Profile = PathBuf;

    fn segments(&self, diagnostics: &mut LoadDiagnostics) -> Result<Vec<SegmentRecord>, LoadError> {
        let mut reader = reader(self.segments_file, SEGMENT_DELIMITER, true)?;
        let context = || self.segments_file.display().to_string();
        let mut segments = Vec::new();

        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(|err| LoadError::csv(context(), err))?;
            let line = line_of(&record, i + 1);

            if record.len() != 3 {
                diagnostics.warn(LoadWarning::InvalidSegmentRow {
                    line,
                    reason: format!("invalid column count {}", record.len()),
                });
                continue;
            }
            let length = record[1].parse::<f64>();
            let freeflow = record[2].parse::<f64>();
            match (length, freeflow) {
                (Ok(length), Ok(freeflow_kmh)) => segments.push(SegmentRecord {
                    id: record[0].to_string(),
                    length,
                    freeflow_kmh,
                }),
                _ => diagnostics.warn(LoadWarning::InvalidSegmentRow {
                    line,
                    reason: format!("could not parse {:?} as length and {:?} as freeflow speed", &record[1], &record[2]),
                }),
            }
        }

        Ok(segments)
    }

    fn profiles(&self, diagnostics: &mut LoadDiagnostics) -> Result<BTreeMap<String, PathBuf>, LoadError> {
        if !self.profile_dir.is_dir() {
            return Err(LoadError::io(
                self.profile_dir.display().to_string(),
                io::Error::new(io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        // the directory itself may contain glob meta characters
        let pattern = Path::new(&Pattern::escape(&self.profile_dir.to_string_lossy())).join("*");
        let mut profiles: BTreeMap<String, PathBuf> = BTreeMap::new();

        for entry in glob(&pattern.to_string_lossy())? {
            match entry {
                Ok(path) => {
                    if !path.is_file() {
                        continue;
                    }
                    match segment_id_of(&path) {
                        Some(id) => match profiles.entry(id.to_string()) {
                            Entry::Occupied(used) => diagnostics.warn(LoadWarning::DuplicateProfile {
                                segment: id.to_string(),
                                used: used.get().display().to_string(),
                                ignored: path.display().to_string(),
                            }),
                            Entry::Vacant(slot) => {
                                slot.insert(path.clone());
                            }
                        },
                        None => diagnostics.warn(LoadWarning::UnreadableDirectoryEntry {
                            reason: format!("no segment id in file name {}", path.display()),
                        }),
                    }
                }
                Err(e) => diagnostics.warn(LoadWarning::UnreadableDirectoryEntry { reason: e.to_string() }),
            }
        }

        Ok(profiles)
    }

    fn profile_rows(&self, path: &PathBuf, diagnostics: &mut LoadDiagnostics) -> Result<Vec<ProfileRow>, LoadError> {
        let mut reader = reader(path, PROFILE_DELIMITER, false)?;
        let segment = segment_id_of(path).unwrap_or_default();
        let mut rows = Vec::new();

        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(|err| LoadError::csv(path.display().to_string(), err))?;
            let line = line_of(&record, i);

            match parse_profile_row(&record) {
                Ok(row) => rows.push(row),
                Err(reason) => diagnostics.warn(LoadWarning::InvalidProfileRow {
                    segment: segment.to_string(),
                    line,
                    reason,
                }),
            }
        }

        Ok(rows)
    }
}

fn parse_profile_row(record: &StringRecord) -> Result<ProfileRow, String> {
    if record.len() < 3 {
        return Err(format!("invalid column count {}", record.len()));
    }
    let hour = record[1].parse().map_err(|_| format!("could not parse {:?} as hour", &record[1]))?;
    let minute = record[2].parse().map_err(|_| format!("could not parse {:?} as minute", &record[2]))?;

    let num_pairs = (record.len() - 3) / 2;
    let mut pairs = Vec::with_capacity(num_pairs);
    for i in 0..num_pairs {
        let velocity = &record[3 + 2 * i];
        let probability = &record[4 + 2 * i];
        if velocity == MISSING_VALUE || probability == MISSING_VALUE {
            pairs.push(None);
            continue;
        }
        let velocity = velocity.parse().map_err(|_| format!("could not parse {:?} as velocity", velocity))?;
        let probability = probability.parse().map_err(|_| format!("could not parse {:?} as probability", probability))?;
        pairs.push(Some((velocity, probability)));
    }

    Ok(ProfileRow {
        day: record[0].to_string(),
        hour,
        minute,
        pairs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_and_missing_values() {
        let record = StringRecord::from(vec!["Friday", "17", "45", "50.5", "0.25", "NaN", "NaN", "80", "0.75"]);
        let row = parse_profile_row(&record).unwrap();
        assert_eq!(row.day, "Friday");
        assert_eq!((row.hour, row.minute), (17, 45));
        assert_eq!(row.pairs, vec![Some((50.5, 0.25)), None, Some((80.0, 0.75))]);
    }

    #[test]
    fn rejects_broken_rows() {
        assert!(parse_profile_row(&StringRecord::from(vec!["Friday", "17"])).is_err());
        assert!(parse_profile_row(&StringRecord::from(vec!["Friday", "x", "0", "50", "1"])).is_err());
        assert!(parse_profile_row(&StringRecord::from(vec!["Friday", "1", "0", "fast", "1"])).is_err());
    }

    #[test]
    fn segment_id_from_file_name() {
        assert_eq!(segment_id_of(Path::new("/data/profiles/114+04567_2019.csv")), Some("114+04567"));
        assert_eq!(segment_id_of(Path::new("plain")), Some("plain"));
        assert_eq!(segment_id_of(Path::new("_leading")), None);
    }
}
