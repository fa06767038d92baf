use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::data::loader::{try_load, LogSink};
use crate::data::model::{CityListing, CityReport, Statistics};
use crate::data::query::{self, QueryError};
use crate::state::DatasetCache;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "weather-stats", version, about = "Per-city temperature statistics")]
pub struct Cli {
    /// Measurements file, one `Name;Value` record per line.
    #[arg(long, env = "WEATHER_STATS_DATA", default_value = "measurements.txt", global = true)]
    pub data: PathBuf,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List all cities, optionally filtered by a case-insensitive substring.
    Cities {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Show statistics for one city (exact name).
    City {
        name: String,
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Print the service health payload.
    Health,
    /// Load the file and print what was accepted and rejected.
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Csv,
    Table,
}

/// How a command ended, for the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    NotFound,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run one command against the data file, writing results to `out`.
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<Outcome> {
    let cache = DatasetCache::new(&cli.data);

    match &cli.command {
        Command::Cities { search, format } => {
            let dataset = cache.dataset();
            let listing = query::list(&dataset, search.as_deref());
            write_listing(out, &listing, *format)?;
        }
        Command::City { name, format } => {
            let dataset = cache.dataset();
            match query::get(&dataset, name) {
                Ok(report) => write_report(out, &report, *format)?,
                Err(err @ QueryError::CityNotFound(_)) => {
                    eprintln!("{err}");
                    return Ok(Outcome::NotFound);
                }
            }
        }
        Command::Health => {
            serde_json::to_writer(&mut *out, &query::health())?;
            writeln!(out)?;
        }
        Command::Check => {
            let (_, report) = try_load(&cli.data, &mut LogSink)
                .with_context(|| format!("checking {}", cli.data.display()))?;
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
    }
    Ok(Outcome::Success)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CsvRow<'a> {
    city: &'a str,
    min: Option<f64>,
    max: Option<f64>,
    mean: Option<f64>,
    count: u64,
}

impl<'a> CsvRow<'a> {
    fn new(city: &'a str, stats: &Statistics) -> Self {
        CsvRow {
            city,
            min: stats.min,
            max: stats.max,
            mean: stats.mean,
            count: stats.count,
        }
    }
}

fn write_rows<'a, W, I>(out: &mut W, rows: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = (&'a str, &'a Statistics)>,
{
    let mut writer = csv::Writer::from_writer(out);
    for (city, stats) in rows {
        writer.serialize(CsvRow::new(city, stats))?;
    }
    writer.flush().context("flushing CSV output")?;
    Ok(())
}

fn write_listing<W: Write>(out: &mut W, listing: &CityListing<'_>, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            serde_json::to_writer(&mut *out, listing)?;
            writeln!(out)?;
        }
        Format::Csv => write_rows(out, listing.cities.iter().map(|(k, v)| (*k, *v)))?,
        Format::Table => {
            for (city, stats) in &listing.cities {
                writeln!(out, "{city:<32} {stats}")?;
            }
            writeln!(out, "{} cities", listing.total_cities)?;
        }
    }
    Ok(())
}

fn write_report<W: Write>(out: &mut W, report: &CityReport<'_>, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            serde_json::to_writer(&mut *out, report)?;
            writeln!(out)?;
        }
        Format::Csv => write_rows(out, [(report.city, report.statistics)])?,
        Format::Table => writeln!(out, "{:<32} {}", report.city, report.statistics)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_file(tag: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "weather-stats-app-{}-{tag}.txt",
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    fn run_args(args: &[&str]) -> (Outcome, String) {
        let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
        let mut out = Vec::new();
        let outcome = run(&cli, &mut out).unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    #[test]
    fn parses_global_data_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["weather-stats", "cities", "--data", "x.txt", "-s", "bel"]).unwrap();
        assert_eq!(cli.data, PathBuf::from("x.txt"));
        match cli.command {
            Command::Cities { search, format } => {
                assert_eq!(search.as_deref(), Some("bel"));
                assert_eq!(format, Format::Json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cities_json_filters_by_search() {
        let path = temp_file("cities", "Belgrade;10.0\nBelgrade;20.0\nHamburg;5.0\n");
        let data = path.to_str().unwrap();
        let (outcome, out) = run_args(&["weather-stats", "--data", data, "cities", "--search", "BEL"]);
        assert_eq!(outcome, Outcome::Success);

        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["total_cities"], 1);
        assert_eq!(json["cities"]["Belgrade"]["mean"], 15.0);
        assert!(json["cities"].get("Hamburg").is_none());
        fs::remove_file(path).ok();
    }

    #[test]
    fn city_csv_has_header_and_row() {
        let path = temp_file("city-csv", "Oslo;-1.5\nOslo;2.5\n");
        let data = path.to_str().unwrap();
        let (_, out) = run_args(&["weather-stats", "--data", data, "city", "Oslo", "-f", "csv"]);
        assert_eq!(out, "city,min,max,mean,count\nOslo,-1.5,2.5,0.5,2\n");
        fs::remove_file(path).ok();
    }

    #[test]
    fn unknown_city_is_not_found() {
        let path = temp_file("missing-city", "Oslo;1.0\n");
        let data = path.to_str().unwrap();
        let (outcome, out) = run_args(&["weather-stats", "--data", data, "city", "Atlantis"]);
        assert_eq!(outcome, Outcome::NotFound);
        assert!(out.is_empty());
        fs::remove_file(path).ok();
    }

    #[test]
    fn table_lists_cities_and_total() {
        let path = temp_file("table", "Oslo;1.0\nBergen;2.0\n");
        let data = path.to_str().unwrap();
        let (_, out) = run_args(&["weather-stats", "--data", data, "cities", "-f", "table"]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Bergen"));
        assert!(lines[0].ends_with("2.0/2.0/2.0 (n=1)"));
        assert_eq!(lines[2], "2 cities");
        fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_lists_nothing() {
        let (outcome, out) = run_args(&["weather-stats", "--data", "/nonexistent/m.txt", "cities"]);
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(out.trim(), r#"{"cities":{},"total_cities":0}"#);
    }

    #[test]
    fn check_reports_rejections() {
        let path = temp_file("check", "Oslo;1.0\nOslo;x\nbad line\n");
        let data = path.to_str().unwrap();
        let (_, out) = run_args(&["weather-stats", "--data", data, "check"]);
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["source_found"], true);
        assert_eq!(json["accepted"], 1);
        assert_eq!(json["rejected"]["invalid_value"], 1);
        assert_eq!(json["rejected"]["wrong_separator_count"], 1);
        fs::remove_file(path).ok();
    }

    #[test]
    fn health_prints_payload() {
        let (_, out) = run_args(&["weather-stats", "health"]);
        assert_eq!(out, "{\"status\":\"healthy\",\"service\":\"weather-api\"}\n");
    }
}
