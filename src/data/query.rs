use std::collections::BTreeMap;

use thiserror::Error;

use super::model::{CityListing, CityReport, Dataset, Health};

/// Lookup failures surfaced to callers. Not-found is an expected outcome and
/// is not logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("city {0:?} not found")]
    CityNotFound(String),
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Return every city whose name contains `query`, ignoring case.
///
/// A missing or empty query matches everything. Any other query, whitespace
/// included, is matched as given. `total_cities` counts the matches, not the
/// dataset.
pub fn list<'a>(dataset: &'a Dataset, query: Option<&str>) -> CityListing<'a> {
    let needle = query.filter(|q| !q.is_empty()).map(str::to_lowercase);

    let cities: BTreeMap<_, _> = dataset
        .iter()
        .filter(|(name, _)| match &needle {
            Some(needle) => name.to_lowercase().contains(needle.as_str()),
            None => true,
        })
        .collect();

    CityListing {
        total_cities: cities.len(),
        cities,
    }
}

// ---------------------------------------------------------------------------
// Single lookup
// ---------------------------------------------------------------------------

/// Exact, case-sensitive lookup of one city.
pub fn get<'a>(dataset: &'a Dataset, name: &str) -> Result<CityReport<'a>, QueryError> {
    dataset
        .get_key_value(name)
        .map(|(city, statistics)| CityReport { city, statistics })
        .ok_or_else(|| QueryError::CityNotFound(name.to_string()))
}

pub fn health() -> Health {
    Health {
        status: "healthy",
        service: "weather-api",
    }
}
