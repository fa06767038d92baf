use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Record – one validated line of the source
// ---------------------------------------------------------------------------

/// A single observation, produced by the parser only after the line passed
/// the separator, name and value checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// City name, trimmed, casing untouched.
    pub name: String,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// Statistics – the four-field aggregate for one city
// ---------------------------------------------------------------------------

/// Aggregate for one city. All optional fields are `None` exactly when
/// `count == 0`; they serialise as JSON `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Arithmetic mean rounded to one decimal, see [`round_mean`].
    pub mean: Option<f64>,
    pub count: u64,
}

impl Statistics {
    /// Statistics over zero observations.
    pub const fn empty() -> Self {
        Statistics {
            min: None,
            max: None,
            mean: None,
            count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Two-pass computation over a fully collected slice of values.
    ///
    /// Numerically identical to feeding the same values, in the same order,
    /// through a [`StatsAccumulator`].
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Statistics::empty();
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let sum: f64 = values.iter().fold(0.0, |acc, v| acc + v);
        Statistics {
            min: Some(min),
            max: Some(max),
            mean: Some(round_mean(sum / values.len() as f64, min, max)),
            count: values.len() as u64,
        }
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Statistics::empty()
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.mean, self.max) {
            (Some(min), Some(mean), Some(max)) => {
                write!(f, "{min:.1}/{mean:.1}/{max:.1} (n={})", self.count)
            }
            _ => write!(f, "<no data>"),
        }
    }
}

/// Round a mean to one decimal place, half away from zero (`f64::round`),
/// then clamp it into `[min, max]`.
///
/// Rounding operates on the binary value of `mean * 10`: `0.25` becomes `0.3`
/// and `-0.25` becomes `-0.3`. The clamp keeps `min <= mean <= max`
/// when the inputs carry more precision than one decimal; the clamped value
/// is still within 0.05 of the exact mean.
pub fn round_mean(mean: f64, min: f64, max: f64) -> f64 {
    ((mean * 10.0).round() / 10.0).clamp(min, max)
}

// ---------------------------------------------------------------------------
// StatsAccumulator – one-pass running aggregate
// ---------------------------------------------------------------------------

/// Running min / max / sum / count for one city. Holds no raw values, so the
/// loader's memory is bounded by the number of distinct cities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsAccumulator {
    min: f64,
    max: f64,
    sum: f64,
    count: u64,
}

impl Default for StatsAccumulator {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            count: 0,
        }
    }
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.count += 1;
    }

    pub fn finish(&self) -> Statistics {
        if self.count == 0 {
            return Statistics::empty();
        }
        Statistics {
            min: Some(self.min),
            max: Some(self.max),
            mean: Some(round_mean(self.sum / self.count as f64, self.min, self.max)),
            count: self.count,
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete per-city mapping produced by one load
// ---------------------------------------------------------------------------

/// City name → statistics. Built once per load and never mutated afterwards;
/// a reload produces a fresh `Dataset`. Keys are kept sorted so listings are
/// deterministic and two loads of the same source compare equal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Dataset {
    cities: BTreeMap<String, Statistics>,
}

impl Dataset {
    /// Finalise per-city accumulators.
    pub fn from_accumulators<I>(accumulators: I) -> Self
    where
        I: IntoIterator<Item = (String, StatsAccumulator)>,
    {
        let cities = accumulators
            .into_iter()
            .map(|(name, acc)| (name, acc.finish()))
            .collect();
        Dataset { cities }
    }

    /// Number of cities.
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    /// Whether no city was loaded.
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Statistics> {
        self.cities.get(name)
    }

    /// Exact lookup returning the stored key alongside its statistics.
    pub fn get_key_value(&self, name: &str) -> Option<(&str, &Statistics)> {
        self.cities.get_key_value(name).map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate cities in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Statistics)> {
        self.cities.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ---------------------------------------------------------------------------
// Query responses
// ---------------------------------------------------------------------------

/// Result of a full listing: matching cities plus how many matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityListing<'a> {
    pub cities: BTreeMap<&'a str, &'a Statistics>,
    /// Number of matching cities, not the dataset size.
    pub total_cities: usize,
}

/// Result of a single-city lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityReport<'a> {
    pub city: &'a str,
    pub statistics: &'a Statistics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub service: &'static str,
}
