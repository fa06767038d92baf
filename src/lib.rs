//! Per-city temperature statistics over `Name;Value` measurement files.
//!
//! The [`data`] layer parses and aggregates a source into an immutable
//! [`Dataset`](data::model::Dataset); [`state::DatasetCache`] owns the current
//! snapshot; [`app`] is the command-line front end.

pub mod app;
pub mod data;
pub mod state;

pub use data::loader::{load, try_load, LoadError, LoadReport, LogSink, RejectSink};
pub use data::model::{CityListing, CityReport, Dataset, Health, Record, Statistics, StatsAccumulator};
pub use data::parser::{parse, parse_line, ParseError, RejectReason};
pub use data::query::{get, health, list, QueryError};
pub use state::DatasetCache;
