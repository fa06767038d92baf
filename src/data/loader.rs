use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use serde::Serialize;
use thiserror::Error;

use super::model::{Dataset, StatsAccumulator};
use super::parser::{parse_fields, ParseError, RejectReason};

const READ_BUFFER_SIZE: usize = 1 << 16;

/// UTF-8 byte order mark, dropped from the start of the first line.
const BOM: char = '\u{FEFF}';

// ---------------------------------------------------------------------------
// Errors and reports
// ---------------------------------------------------------------------------

/// Failures that stop a load. A missing source is not one of them.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("opening {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("reading {} at line {line}: {source}", path.display())]
    Read {
        path: PathBuf,
        line: usize,
        source: io::Error,
    },
}

/// What a load saw, for operators. `load` itself only returns the dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    /// `false` when the source did not exist and an empty dataset was produced.
    pub source_found: bool,
    pub lines_read: usize,
    pub blank_lines: usize,
    pub accepted: usize,
    pub rejected: BTreeMap<RejectReason, usize>,
    pub cities: usize,
}

impl LoadReport {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

// ---------------------------------------------------------------------------
// Rejection sinks
// ---------------------------------------------------------------------------

/// Receives every rejected line. Injected into the loader so parsing stays
/// free of side effects.
pub trait RejectSink {
    fn reject(&mut self, error: ParseError);
}

/// Emits one `warn!` per rejected line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl RejectSink for LogSink {
    fn reject(&mut self, error: ParseError) {
        warn!("skipping {error}");
    }
}

/// Collects rejections in order.
impl RejectSink for Vec<ParseError> {
    fn reject(&mut self, error: ParseError) {
        self.push(error);
    }
}

/// Discards rejections.
impl RejectSink for () {
    fn reject(&mut self, _error: ParseError) {}
}

impl<S: RejectSink + ?Sized> RejectSink for &mut S {
    fn reject(&mut self, error: ParseError) {
        (**self).reject(error);
    }
}

/// Forwards each rejection to both sinks.
#[derive(Debug, Default)]
pub struct Tee<A, B>(pub A, pub B);

impl<A: RejectSink, B: RejectSink> RejectSink for Tee<A, B> {
    fn reject(&mut self, error: ParseError) {
        self.1.reject(error.clone());
        self.0.reject(error);
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a measurements file into a [`Dataset`].
///
/// Never fails: a missing file is logged at error level and yields an empty
/// dataset, as does an I/O failure while reading. Rejected lines are logged
/// as warnings and skipped.
pub fn load(path: &Path) -> Dataset {
    match try_load(path, &mut LogSink) {
        Ok((dataset, _)) => dataset,
        Err(err) => {
            error!("CRITICAL: {err}; serving an empty dataset");
            Dataset::default()
        }
    }
}

/// Load with an explicit rejection sink, returning the dataset and a report.
///
/// A missing source is `Ok` with an empty dataset and
/// `report.source_found == false`. Other open or read failures are `Err`.
pub fn try_load<S: RejectSink>(
    path: &Path,
    sink: &mut S,
) -> Result<(Dataset, LoadReport), LoadError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            error!("CRITICAL: data file {} not found", path.display());
            return Ok((Dataset::default(), LoadReport::default()));
        }
        Err(source) => {
            return Err(LoadError::Open {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    debug!("loading {}", path.display());
    let reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let (dataset, report) = load_from_reader(reader, sink).map_err(|(line, source)| {
        LoadError::Read {
            path: path.to_path_buf(),
            line,
            source,
        }
    })?;

    info!(
        "loaded {} cities from {} ({} lines, {} accepted, {} rejected)",
        report.cities,
        path.display(),
        report.lines_read,
        report.accepted,
        report.rejected_total(),
    );
    Ok((dataset, report))
}

/// Stream lines from any buffered reader, one line in memory at a time.
///
/// Lines that are not valid UTF-8 are rejected like any other malformed
/// line. A leading byte order mark is ignored. On an I/O error the failing one-indexed line number is returned
/// alongside the error.
pub fn load_from_reader<R: BufRead, S: RejectSink>(
    mut reader: R,
    sink: &mut S,
) -> Result<(Dataset, LoadReport), (usize, io::Error)> {
    let mut cities: HashMap<String, StatsAccumulator> = HashMap::new();
    let mut report = LoadReport {
        source_found: true,
        ..LoadReport::default()
    };
    let mut buf: Vec<u8> = Vec::with_capacity(128);
    let mut line_number = 0usize;

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| (line_number + 1, e))?;
        if n == 0 {
            break;
        }
        line_number += 1;
        report.lines_read += 1;

        let outcome = match std::str::from_utf8(&buf) {
            Ok(line) if line_number == 1 => {
                parse_fields(line.strip_prefix(BOM).unwrap_or(line), line_number)
            }
            Ok(line) => parse_fields(line, line_number),
            Err(_) => Err(ParseError::InvalidEncoding {
                line: line_number,
                text: String::from_utf8_lossy(&buf).trim().to_string(),
            }),
        };

        match outcome {
            Ok(Some((name, value))) => {
                report.accepted += 1;
                match cities.get_mut(name) {
                    Some(acc) => acc.push(value),
                    None => {
                        let mut acc = StatsAccumulator::new();
                        acc.push(value);
                        cities.insert(name.to_string(), acc);
                    }
                }
            }
            Ok(None) => report.blank_lines += 1,
            Err(err) => {
                *report.rejected.entry(err.reason()).or_default() += 1;
                sink.reject(err);
            }
        }
    }

    let dataset = Dataset::from_accumulators(cities);
    report.cities = dataset.len();
    Ok((dataset, report))
}
